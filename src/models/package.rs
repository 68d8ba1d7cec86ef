//! Package and version models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single named file of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    pub name: String,
    pub content: String,
}

impl PackageFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A published version of a package, pinned to one gist revision.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Version {
    pub id: Uuid,

    pub package_id: Uuid,

    /// Normalized semantic version string
    pub number: String,

    /// Gist revision SHA captured when the version was published
    pub sha: String,

    /// Withdrawn versions keep their record and gist revision
    pub yanked: bool,

    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(package_id: Uuid, number: String, sha: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_id,
            number,
            sha,
            yanked: false,
            created_at: Utc::now(),
        }
    }
}

/// A package owned by a user, mirrored into a single gist.
///
/// `gist_id` stays `None` until the first successful publish and is never
/// replaced afterwards. `versions` is kept in insertion order, which is also
/// ascending version order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub files: Vec<PackageFile>,
    pub gist_id: Option<String>,
    pub versions: Vec<Version>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Package {
    pub fn new(owner_id: Uuid, name: String, files: Vec<PackageFile>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            files,
            gist_id: None,
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a version by its normalized number.
    pub fn find_version(&self, number: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.number == number)
    }

    /// The most recently published version, yanked or not.
    pub fn latest_version(&self) -> Option<&Version> {
        self.versions.last()
    }

    pub fn version_numbers(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(|v| v.number.as_str())
    }
}
