//! In-memory store.
//!
//! Implements both [`UserRepository`] and [`PackageRepository`] on top of a
//! mutex-guarded map. Used by the test suite and when the server runs
//! without `DATABASE_URL`; nothing survives a restart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Package, PackageFile, User, Version};
use crate::services::github::GitHubUser;
use crate::services::package::{
    admit_version, ensure_same_gist, PackageRepository, StoreError, YankOutcome,
};
use crate::services::user::UserRepository;

/// Thread-safe in-memory store shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    users: HashMap<Uuid, User>,
    packages: HashMap<Uuid, Package>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a user as-is.
    pub fn insert_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    /// Inserts a package as-is, versions included.
    pub fn insert_package(&self, package: Package) {
        self.lock().packages.insert(package.id, package);
    }
}

impl MemoryInner {
    fn package_mut(&mut self, owner_id: Uuid, name: &str) -> Option<&mut Package> {
        self.packages
            .values_mut()
            .find(|p| p.owner_id == owner_id && p.name == name)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn upsert_from_github(
        &self,
        github_user: &GitHubUser,
        access_token: &str,
    ) -> Result<User, StoreError> {
        let mut inner = self.lock();

        if let Some(user) = inner
            .users
            .values_mut()
            .find(|u| u.github_id == github_user.id)
        {
            user.username = github_user.login.clone();
            user.email = github_user.email.clone();
            user.avatar_url = github_user.avatar_url.clone();
            user.access_token = access_token.to_string();
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }

        let user = User::new(
            github_user.id,
            github_user.login.clone(),
            github_user.email.clone(),
            github_user.avatar_url.clone(),
            access_token.to_string(),
        );
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PackageRepository for MemoryStore {
    async fn find_package(&self, owner_id: Uuid, name: &str) -> Result<Option<Package>, StoreError> {
        Ok(self.lock().package_mut(owner_id, name).cloned())
    }

    async fn list_packages(&self, owner_id: Uuid) -> Result<Vec<Package>, StoreError> {
        let mut packages: Vec<Package> = self
            .lock()
            .packages
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    async fn save_package(
        &self,
        owner_id: Uuid,
        name: &str,
        files: Vec<PackageFile>,
    ) -> Result<Package, StoreError> {
        let mut inner = self.lock();

        if let Some(package) = inner.package_mut(owner_id, name) {
            package.files = files;
            package.updated_at = Utc::now();
            return Ok(package.clone());
        }

        let package = Package::new(owner_id, name.to_string(), files);
        inner.packages.insert(package.id, package.clone());
        Ok(package)
    }

    async fn append_version(&self, package: &Package, version: &Version) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let stored = inner
            .packages
            .get_mut(&package.id)
            .ok_or(StoreError::PackageMissing(package.id))?;

        ensure_same_gist(stored.gist_id.as_deref(), package)?;
        let existing: Vec<String> = stored.versions.iter().map(|v| v.number.clone()).collect();
        admit_version(&existing, version)?;

        if stored.gist_id.is_none() {
            stored.gist_id = package.gist_id.clone();
        }
        let mut recorded = version.clone();
        recorded.package_id = stored.id;
        stored.versions.push(recorded);
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn yank_version(
        &self,
        owner_id: Uuid,
        name: &str,
        number: &str,
    ) -> Result<YankOutcome, StoreError> {
        let mut inner = self.lock();
        let Some(package) = inner.package_mut(owner_id, name) else {
            return Ok(YankOutcome::PackageMissing);
        };

        Ok(
            match package.versions.iter_mut().find(|v| v.number == number) {
                None => YankOutcome::VersionMissing,
                Some(version) if version.yanked => YankOutcome::AlreadyYanked,
                Some(version) => {
                    version.yanked = true;
                    YankOutcome::Yanked
                }
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn github_user(id: i64, login: &str) -> GitHubUser {
        GitHubUser {
            id,
            login: login.to_string(),
            email: None,
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_user() {
        let store = MemoryStore::new();
        let first = store
            .upsert_from_github(&github_user(1, "octocat"), "token-1")
            .await
            .expect("upsert");
        let second = store
            .upsert_from_github(&github_user(1, "octocat-renamed"), "token-2")
            .await
            .expect("upsert");

        assert_eq!(first.id, second.id);
        assert_eq!(second.username, "octocat-renamed");
        assert_eq!(second.access_token, "token-2");
    }

    #[tokio::test]
    async fn test_find_by_username_is_case_insensitive() {
        let store = MemoryStore::new();
        store
            .upsert_from_github(&github_user(7, "OctoCat"), "t")
            .await
            .expect("upsert");

        let found = store.find_by_username("octocat").await.expect("lookup");
        assert_eq!(found.map(|u| u.github_id), Some(7));
    }

    #[tokio::test]
    async fn test_save_package_replaces_files_and_keeps_versions() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut package = store
            .save_package(owner, "pkg", vec![PackageFile::new("a.txt", "a")])
            .await
            .expect("save");
        package.gist_id = Some("gist-1".to_string());
        let version = Version::new(package.id, "1.0.0".to_string(), "sha-1".to_string());
        store.append_version(&package, &version).await.expect("append");

        let saved = store
            .save_package(owner, "pkg", vec![PackageFile::new("b.txt", "b")])
            .await
            .expect("save");

        assert_eq!(saved.id, package.id);
        assert_eq!(saved.files, vec![PackageFile::new("b.txt", "b")]);
        assert_eq!(saved.versions.len(), 1);
        assert_eq!(saved.gist_id.as_deref(), Some("gist-1"));
    }

    #[tokio::test]
    async fn test_append_rejects_version_from_other_gist() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let package = store.save_package(owner, "pkg", Vec::new()).await.expect("save");

        let mut first = package.clone();
        first.gist_id = Some("winner".to_string());
        let v1 = Version::new(package.id, "1.0.0".to_string(), "a".to_string());
        store.append_version(&first, &v1).await.expect("append");

        let mut second = package.clone();
        second.gist_id = Some("loser".to_string());
        let v2 = Version::new(package.id, "2.0.0".to_string(), "b".to_string());
        let result = store.append_version(&second, &v2).await;
        assert!(matches!(result, Err(StoreError::GistMismatch { .. })));

        let stored = store.find_package(owner, "pkg").await.expect("find").expect("exists");
        assert_eq!(stored.gist_id.as_deref(), Some("winner"));
        assert_eq!(stored.versions.len(), 1);
    }

    #[tokio::test]
    async fn test_yank_twice() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let mut package = store.save_package(owner, "pkg", Vec::new()).await.expect("save");
        package.gist_id = Some("g".to_string());
        let v1 = Version::new(package.id, "1.0.0".to_string(), "a".to_string());
        store.append_version(&package, &v1).await.expect("append");

        assert_eq!(
            store.yank_version(owner, "pkg", "1.0.0").await.expect("yank"),
            YankOutcome::Yanked
        );
        assert_eq!(
            store.yank_version(owner, "pkg", "1.0.0").await.expect("yank"),
            YankOutcome::AlreadyYanked
        );
        assert_eq!(
            store.yank_version(owner, "pkg", "9.9.9").await.expect("yank"),
            YankOutcome::VersionMissing
        );
        assert_eq!(
            store.yank_version(owner, "missing", "1.0.0").await.expect("yank"),
            YankOutcome::PackageMissing
        );
    }
}
