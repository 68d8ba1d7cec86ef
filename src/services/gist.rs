//! GitHub Gist API client.
//!
//! Package files are mirrored into one gist per package. The first publish
//! creates the gist, later publishes update it, and every write yields a new
//! revision whose SHA is recorded on the published version.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Package;

#[derive(Debug, Error)]
pub enum GistError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gist API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Invalid response from Gist API: {0}")]
    InvalidResponse(String),
}

/// File content sent when creating or updating a gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GistFileContent {
    pub content: String,
}

/// Body for `POST /gists` and `PATCH /gists/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct GistRequest {
    pub description: String,
    pub public: bool,
    pub files: BTreeMap<String, GistFileContent>,
}

impl GistRequest {
    /// Builds the public gist body mirroring a package's file list.
    pub fn from_package(package: &Package) -> Self {
        let files = package
            .files
            .iter()
            .map(|file| {
                (
                    file.name.clone(),
                    GistFileContent {
                        content: file.content.clone(),
                    },
                )
            })
            .collect();

        Self {
            description: package.name.clone(),
            public: true,
            files,
        }
    }
}

/// A file entry in a gist response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GistFile {
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    pub raw_url: Option<String>,
    pub size: Option<u64>,
}

/// One entry of a gist's revision history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistHistoryEntry {
    pub version: String,
    pub committed_at: Option<String>,
}

/// The subset of a gist resource this service consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gist {
    pub id: String,
    /// API URL of the gist
    pub url: String,
    /// Public page of the gist
    pub html_url: String,
    /// Clone URL
    pub git_pull_url: String,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    #[serde(default)]
    pub history: Vec<GistHistoryEntry>,
}

impl Gist {
    /// SHA of the revision produced by the most recent write.
    pub fn latest_revision(&self) -> Option<&str> {
        self.history.first().map(|entry| entry.version.as_str())
    }
}

/// Gist operations performed with a user's access token.
#[async_trait]
pub trait GistApi: Send + Sync {
    async fn create_gist(&self, access_token: &str, request: &GistRequest)
        -> Result<Gist, GistError>;

    async fn update_gist(
        &self,
        access_token: &str,
        gist_id: &str,
        request: &GistRequest,
    ) -> Result<Gist, GistError>;

    /// Fetches a gist as it was at revision `sha`. `None` if it does not exist.
    async fn get_gist_revision(
        &self,
        access_token: &str,
        gist_id: &str,
        sha: &str,
    ) -> Result<Option<Gist>, GistError>;

    /// Downloads the full content of a file the API reported as truncated.
    async fn fetch_raw(&self, access_token: &str, raw_url: &str) -> Result<String, GistError>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: Option<String>,
}

/// Gist API client backed by reqwest.
#[derive(Clone)]
pub struct GitHubGistClient {
    client: Client,
    api_base: String,
}

impl GitHubGistClient {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn authorized(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .bearer_auth(access_token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn error_from(response: reqwest::Response) -> GistError {
        let status = response.status().as_u16();
        let body: ApiErrorResponse = response
            .json()
            .await
            .unwrap_or(ApiErrorResponse { message: None });
        GistError::Api {
            status,
            message: body.message.unwrap_or_else(|| "Unknown error".to_string()),
        }
    }

    async fn parse_gist(response: reqwest::Response) -> Result<Gist, GistError> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse gist response: {}", e);
            GistError::InvalidResponse(e.to_string())
        })
    }
}

#[async_trait]
impl GistApi for GitHubGistClient {
    async fn create_gist(
        &self,
        access_token: &str,
        request: &GistRequest,
    ) -> Result<Gist, GistError> {
        tracing::info!("Creating gist for {}", request.description);
        let url = format!("{}/gists", self.api_base);
        let response = self
            .authorized(self.client.post(&url), access_token)
            .json(request)
            .send()
            .await?;

        Self::parse_gist(response).await
    }

    async fn update_gist(
        &self,
        access_token: &str,
        gist_id: &str,
        request: &GistRequest,
    ) -> Result<Gist, GistError> {
        tracing::info!("Updating gist {} for {}", gist_id, request.description);
        let url = format!("{}/gists/{}", self.api_base, gist_id);
        let response = self
            .authorized(self.client.patch(&url), access_token)
            .json(request)
            .send()
            .await?;

        Self::parse_gist(response).await
    }

    async fn get_gist_revision(
        &self,
        access_token: &str,
        gist_id: &str,
        sha: &str,
    ) -> Result<Option<Gist>, GistError> {
        let url = format!("{}/gists/{}/{}", self.api_base, gist_id, sha);
        let response = self
            .authorized(self.client.get(&url), access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::parse_gist(response).await.map(Some)
    }

    async fn fetch_raw(&self, access_token: &str, raw_url: &str) -> Result<String, GistError> {
        let response = self
            .client
            .get(raw_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(response.text().await?)
    }
}
