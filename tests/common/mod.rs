//! Shared fixtures for the HTTP integration tests: an in-memory store, a gist
//! API double that records revisions, and session helpers.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use actix_web::web;
use async_trait::async_trait;

use gist_registry::config::Config;
use gist_registry::db::Stores;
use gist_registry::handlers::AppState;
use gist_registry::models::{PackageFile, User};
use gist_registry::services::gist::{
    Gist, GistApi, GistError, GistFile, GistHistoryEntry, GistRequest,
};
use gist_registry::services::github::GitHubUser;
use gist_registry::services::memory::MemoryStore;
use gist_registry::services::package::PackageRepository;
use gist_registry::services::token::create_session_token;
use gist_registry::services::user::UserRepository;

pub const SESSION_SECRET: &str = "integration_test_secret";

/// Builds the app under test with every production route.
macro_rules! test_app {
    ($ctx:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state())
                .configure(gist_registry::handlers::configure_routes),
        )
        .await
    };
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        github_client_id: "test_client_id".to_string(),
        github_client_secret: "test_client_secret".to_string(),
        github_callback_url: "http://localhost:3000/auth/github/callback".to_string(),
        github_api_url: "http://127.0.0.1:1".to_string(),
        session_secret: SESSION_SECRET.to_string(),
        session_expiry_secs: 3600,
        host: "127.0.0.1".to_string(),
        port: 3000,
        rate_limit_burst: 30,
        rate_limit_replenish_secs: 1,
    }
}

#[derive(Debug, Clone)]
struct Revision {
    sha: String,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct MockGistState {
    gists: HashMap<String, Vec<Revision>>,
    raw: HashMap<String, String>,
    counter: u32,
    creates: usize,
    updates: usize,
    fail_writes: Option<String>,
    truncate_reads: bool,
    yield_writes: bool,
}

/// In-process gist API: every write produces a new revision, reads return
/// the files as they were at the requested revision.
#[derive(Debug, Clone, Default)]
pub struct MockGistClient {
    state: Arc<Mutex<MockGistState>>,
}

impl MockGistClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockGistState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn creates(&self) -> usize {
        self.lock().creates
    }

    pub fn updates(&self) -> usize {
        self.lock().updates
    }

    pub fn revision_count(&self, gist_id: &str) -> usize {
        self.lock().gists.get(gist_id).map_or(0, Vec::len)
    }

    /// Makes every following create/update fail with a 422 and `message`.
    pub fn fail_writes(&self, message: &str) {
        self.lock().fail_writes = Some(message.to_string());
    }

    /// Makes reads report every file as truncated, serving content via raw_url.
    pub fn truncate_reads(&self) {
        self.lock().truncate_reads = true;
    }

    /// Makes every following create/update yield to the runtime once before
    /// writing, so concurrent publishes interleave at the gist write.
    pub fn yield_before_writes(&self) {
        self.lock().yield_writes = true;
    }

    async fn pause_if_yielding(&self) {
        let yield_first = self.lock().yield_writes;
        if yield_first {
            tokio::task::yield_now().await;
        }
    }

    fn write(&self, gist_id: Option<&str>, request: &GistRequest) -> Result<Gist, GistError> {
        let mut state = self.lock();
        if let Some(message) = &state.fail_writes {
            return Err(GistError::Api {
                status: 422,
                message: message.clone(),
            });
        }

        state.counter += 1;
        let sha = format!("sha{:04}", state.counter);
        let id = match gist_id {
            Some(id) => {
                if !state.gists.contains_key(id) {
                    return Err(GistError::Api {
                        status: 404,
                        message: "Not Found".to_string(),
                    });
                }
                state.updates += 1;
                id.to_string()
            }
            None => {
                state.creates += 1;
                let id = format!("gist{:04}", state.counter);
                state.gists.insert(id.clone(), Vec::new());
                id
            }
        };

        let files: BTreeMap<String, String> = request
            .files
            .iter()
            .map(|(name, file)| (name.clone(), file.content.clone()))
            .collect();

        let revisions = state.gists.entry(id.clone()).or_default();
        revisions.insert(
            0,
            Revision {
                sha: sha.clone(),
                files: files.clone(),
            },
        );
        let history = revisions
            .iter()
            .map(|r| GistHistoryEntry {
                version: r.sha.clone(),
                committed_at: None,
            })
            .collect();

        Ok(gist(&id, files, history, false))
    }
}

fn gist(
    id: &str,
    files: BTreeMap<String, String>,
    history: Vec<GistHistoryEntry>,
    truncated: bool,
) -> Gist {
    let files = files
        .into_iter()
        .map(|(name, content)| {
            let file = GistFile {
                filename: Some(name.clone()),
                mime_type: None,
                size: Some(content.len() as u64),
                raw_url: Some(format!("mock://raw/{}/{}", id, name)),
                truncated,
                content: if truncated {
                    Some(content.chars().take(1).collect())
                } else {
                    Some(content)
                },
            };
            (name, file)
        })
        .collect();

    Gist {
        id: id.to_string(),
        url: format!("https://api.github.com/gists/{}", id),
        html_url: format!("https://gist.github.com/{}", id),
        git_pull_url: format!("https://gist.github.com/{}.git", id),
        files,
        history,
    }
}

#[async_trait]
impl GistApi for MockGistClient {
    async fn create_gist(
        &self,
        _access_token: &str,
        request: &GistRequest,
    ) -> Result<Gist, GistError> {
        self.pause_if_yielding().await;
        self.write(None, request)
    }

    async fn update_gist(
        &self,
        _access_token: &str,
        gist_id: &str,
        request: &GistRequest,
    ) -> Result<Gist, GistError> {
        self.pause_if_yielding().await;
        self.write(Some(gist_id), request)
    }

    async fn get_gist_revision(
        &self,
        _access_token: &str,
        gist_id: &str,
        sha: &str,
    ) -> Result<Option<Gist>, GistError> {
        let mut state = self.lock();
        let truncated = state.truncate_reads;
        let Some(revision) = state
            .gists
            .get(gist_id)
            .and_then(|revs| revs.iter().find(|r| r.sha == sha))
            .cloned()
        else {
            return Ok(None);
        };

        if truncated {
            for (name, content) in &revision.files {
                state
                    .raw
                    .insert(format!("mock://raw/{}/{}", gist_id, name), content.clone());
            }
        }

        let history = vec![GistHistoryEntry {
            version: revision.sha.clone(),
            committed_at: None,
        }];
        Ok(Some(gist(gist_id, revision.files, history, truncated)))
    }

    async fn fetch_raw(&self, _access_token: &str, raw_url: &str) -> Result<String, GistError> {
        self.lock()
            .raw
            .get(raw_url)
            .cloned()
            .ok_or_else(|| GistError::Api {
                status: 404,
                message: "Not Found".to_string(),
            })
    }
}

/// Store, gist double and config behind one app.
#[derive(Clone)]
pub struct TestContext {
    pub store: MemoryStore,
    pub gists: MockGistClient,
    pub config: Config,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
            gists: MockGistClient::new(),
            config: test_config(),
        }
    }

    pub fn state(&self) -> web::Data<AppState> {
        web::Data::new(AppState::new(
            self.config.clone(),
            reqwest::Client::new(),
            Stores::memory(self.store.clone()),
            Arc::new(self.gists.clone()),
        ))
    }

    /// Registers a GitHub user and returns it with a valid session token.
    pub async fn login(&self, github_id: i64, username: &str) -> (User, String) {
        let github_user = GitHubUser {
            id: github_id,
            login: username.to_string(),
            email: None,
            avatar_url: None,
        };
        let user = self
            .store
            .upsert_from_github(&github_user, &format!("gho_{}", username))
            .await
            .expect("Failed to create user");
        let token = create_session_token(user.id, SESSION_SECRET, 3600)
            .expect("Failed to create session token");
        (user, token)
    }

    /// Creates a package directly in the store.
    pub async fn package(&self, owner: &User, name: &str, files: &[(&str, &str)]) {
        let files = files
            .iter()
            .map(|(name, content)| PackageFile::new(*name, *content))
            .collect();
        self.store
            .save_package(owner.id, name, files)
            .await
            .expect("Failed to save package");
    }
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (
        actix_web::http::header::AUTHORIZATION,
        format!("Bearer {}", token),
    )
}
