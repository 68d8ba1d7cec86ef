//! Registry workflows composed from the validator, the package repository
//! and the gist client.
//!
//! Publishing runs as a fixed sequence of steps, each consuming the output of
//! the previous one and short-circuiting on the first failure:
//!
//! ```text
//! validate version -> load package -> check unique/greatest
//!     -> write gist (create | update) -> append version -> respond
//! ```
//!
//! Every failure before the gist write leaves no trace. A failure after it
//! leaves the gist one revision ahead of the stored history; retrying the
//! publish writes the gist again and records the version against the new
//! revision.
//!
//! Concurrent publishes to one package meet in
//! [`PackageRepository::append_version`], which serializes them. The loser of
//! a race on the same number gets [`StoreError::Conflict`]; the loser of two
//! racing first publishes, each of which created its own gist, gets
//! [`StoreError::GistMismatch`] and its gist is left orphaned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Package, Version};
use crate::services::gist::{Gist, GistApi, GistError, GistRequest};
use crate::services::package::{CandidateReport, PackageRepository, StoreError};
use crate::services::version::{parse_version, VersionError};

/// Typed failure of the publish workflow.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Invalid version number")]
    InvalidVersion(#[from] VersionError),

    #[error("Package does not exist")]
    PackageNotFound,

    #[error("Version is a duplicate")]
    Duplicate,

    #[error("Version is less than latest")]
    NotGreatest,

    #[error("Gist write failed: {0}")]
    Gist(#[from] GistError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Response body of a successful publish.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedVersion {
    pub version: String,
    /// Public page of the package's gist
    pub gist_url: String,
    /// Clone URL of the package's gist
    pub git_url: String,
    pub created_at: DateTime<Utc>,
}

/// Failure to resolve a file of a published version.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Package does not exist")]
    PackageNotFound,

    #[error("Version does not exist")]
    VersionNotFound,

    #[error("File does not exist")]
    FileNotFound,

    #[error("Gist read failed: {0}")]
    Gist(#[from] GistError),

    #[error("Storage failed: {0}")]
    Store(#[from] StoreError),
}

/// Identifies one file of one published version.
#[derive(Debug, Clone, Copy)]
pub struct FileRef<'a> {
    pub owner_id: Uuid,
    pub package: &'a str,
    pub version: &'a str,
    pub filename: &'a str,
}

/// Turns a repository report into the package to publish, or the reason not to.
fn check_standing(report: CandidateReport) -> Result<Package, PublishError> {
    let package = report.package.ok_or(PublishError::PackageNotFound)?;
    if !report.unique {
        return Err(PublishError::Duplicate);
    }
    if !report.greatest {
        return Err(PublishError::NotGreatest);
    }
    Ok(package)
}

/// Creates the package's gist on first publish, updates it afterwards.
///
/// The branch depends only on whether a gist id is stored.
async fn write_gist(
    gists: &dyn GistApi,
    package: &Package,
    access_token: &str,
) -> Result<Gist, GistError> {
    let request = GistRequest::from_package(package);
    match &package.gist_id {
        None => gists.create_gist(access_token, &request).await,
        Some(gist_id) => gists.update_gist(access_token, gist_id, &request).await,
    }
}

/// Pins a new version of `package` to the gist's latest revision.
fn attach_gist_to_new_version(
    mut package: Package,
    candidate: &semver::Version,
    gist: &Gist,
) -> Result<(Package, Version), PublishError> {
    let sha = gist.latest_revision().ok_or_else(|| {
        GistError::InvalidResponse(format!("gist {} has no revision history", gist.id))
    })?;

    if package.gist_id.is_none() {
        package.gist_id = Some(gist.id.clone());
    }

    let version = Version::new(package.id, candidate.to_string(), sha.to_string());
    package.versions.push(version.clone());
    Ok((package, version))
}

/// Publishes version `number` of `owner_id`'s package `package_name`.
pub async fn publish_version(
    packages: &dyn PackageRepository,
    gists: &dyn GistApi,
    owner_id: Uuid,
    package_name: &str,
    number: &str,
    access_token: &str,
) -> Result<PublishedVersion, PublishError> {
    let candidate = parse_version(number)?;

    let report = packages
        .is_version_unique_and_greatest(owner_id, package_name, &candidate)
        .await?;
    let package = check_standing(report)?;

    let gist = write_gist(gists, &package, access_token).await.map_err(|e| {
        tracing::error!("Gist write for package {} failed: {}", package.id, e);
        e
    })?;

    let (package, version) = attach_gist_to_new_version(package, &candidate, &gist)?;
    packages.append_version(&package, &version).await.map_err(|e| {
        tracing::error!(
            "Gist {} is at {} but version {} of package {} was not recorded: {}",
            gist.id,
            version.sha,
            version.number,
            package.id,
            e
        );
        e
    })?;

    tracing::info!(
        "Published {} {} at gist revision {}",
        package.name,
        version.number,
        version.sha
    );

    Ok(PublishedVersion {
        version: version.number,
        gist_url: gist.html_url,
        git_url: gist.git_pull_url,
        created_at: version.created_at,
    })
}

/// Resolves the content of one file of a published version.
///
/// Yanked versions stay readable. A malformed version number cannot name a
/// stored version and resolves as [`LookupError::VersionNotFound`].
pub async fn find_file_contents(
    packages: &dyn PackageRepository,
    gists: &dyn GistApi,
    file: FileRef<'_>,
    access_token: &str,
) -> Result<String, LookupError> {
    let package = packages
        .find_package(file.owner_id, file.package)
        .await?
        .ok_or(LookupError::PackageNotFound)?;

    let number = parse_version(file.version)
        .map_err(|_| LookupError::VersionNotFound)?
        .to_string();
    let version = package
        .find_version(&number)
        .ok_or(LookupError::VersionNotFound)?;

    let gist_id = package.gist_id.as_deref().ok_or_else(|| {
        tracing::error!("Package {} has versions but no gist", package.id);
        LookupError::VersionNotFound
    })?;

    let gist = gists
        .get_gist_revision(access_token, gist_id, &version.sha)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Gist {} revision {} is gone", gist_id, version.sha);
            LookupError::FileNotFound
        })?;

    let gist_file = gist
        .files
        .get(file.filename)
        .ok_or(LookupError::FileNotFound)?;

    match (&gist_file.content, &gist_file.raw_url) {
        (Some(content), _) if !gist_file.truncated => Ok(content.clone()),
        (_, Some(raw_url)) => Ok(gists.fetch_raw(access_token, raw_url).await?),
        (Some(content), None) => Ok(content.clone()),
        (None, None) => Err(LookupError::FileNotFound),
    }
}
