//! Package persistence.
//!
//! [`PackageRepository`] is the storage seam used by the handlers and the
//! publish workflow. [`PgPackageRepository`] is the PostgreSQL implementation;
//! [`crate::services::memory::MemoryStore`] is the in-process one.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Package, PackageFile, Version};
use crate::services::version::{check_candidate, parse_version};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A version with the same number already exists
    #[error("Version {0} is a duplicate")]
    Conflict(String),

    /// The version is not greater than the latest recorded version
    #[error("Version {0} is less than latest")]
    OutOfOrder(String),

    #[error("Package {0} does not exist")]
    PackageMissing(Uuid),

    /// The version was written to a gist the package is not mirrored in
    #[error("Package {package_id} is mirrored in gist {stored}, not {written}")]
    GistMismatch {
        package_id: Uuid,
        stored: String,
        written: String,
    },
}

/// Result of checking a candidate version against a stored package.
#[derive(Debug, Clone)]
pub struct CandidateReport {
    pub unique: bool,
    pub greatest: bool,
    /// `None` when the package does not exist
    pub package: Option<Package>,
}

/// Result of yanking a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YankOutcome {
    Yanked,
    AlreadyYanked,
    PackageMissing,
    VersionMissing,
}

/// Decides whether `version` may be appended to a package whose recorded
/// version numbers are `existing`.
pub fn admit_version(existing: &[String], version: &Version) -> Result<(), StoreError> {
    let candidate =
        parse_version(&version.number).map_err(|_| StoreError::OutOfOrder(version.number.clone()))?;
    let check = check_candidate(existing.iter().map(String::as_str), &candidate);

    if !check.unique {
        return Err(StoreError::Conflict(version.number.clone()));
    }
    if !check.greatest {
        return Err(StoreError::OutOfOrder(version.number.clone()));
    }

    Ok(())
}

/// Rejects a version pinned to a gist other than the one the package is
/// already mirrored in.
///
/// Two first publishes racing each other both create a gist; only the one
/// whose append commits first owns the package. The other's revision would
/// never be readable through the stored gist id.
pub fn ensure_same_gist(stored: Option<&str>, package: &Package) -> Result<(), StoreError> {
    match (stored, package.gist_id.as_deref()) {
        (Some(stored), written) if written != Some(stored) => Err(StoreError::GistMismatch {
            package_id: package.id,
            stored: stored.to_string(),
            written: written.unwrap_or_default().to_string(),
        }),
        _ => Ok(()),
    }
}

/// Storage operations for packages and their versions.
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Finds a package by owner and name, versions in insertion order.
    async fn find_package(&self, owner_id: Uuid, name: &str) -> Result<Option<Package>, StoreError>;

    /// Lists an owner's packages ordered by name.
    async fn list_packages(&self, owner_id: Uuid) -> Result<Vec<Package>, StoreError>;

    /// Creates the package or replaces the file list of an existing one.
    async fn save_package(
        &self,
        owner_id: Uuid,
        name: &str,
        files: Vec<PackageFile>,
    ) -> Result<Package, StoreError>;

    /// Records `version` on `package`, setting the package's gist id if it has none.
    ///
    /// Implementations re-check uniqueness, ordering and the stored gist id
    /// against committed state atomically with the insert. A version written
    /// to a gist other than the stored one fails with
    /// [`StoreError::GistMismatch`].
    async fn append_version(&self, package: &Package, version: &Version) -> Result<(), StoreError>;

    /// Marks a version as yanked.
    async fn yank_version(
        &self,
        owner_id: Uuid,
        name: &str,
        number: &str,
    ) -> Result<YankOutcome, StoreError>;

    /// Loads the package and reports whether `candidate` is unique and greatest.
    async fn is_version_unique_and_greatest(
        &self,
        owner_id: Uuid,
        name: &str,
        candidate: &semver::Version,
    ) -> Result<CandidateReport, StoreError> {
        let package = self.find_package(owner_id, name).await?;

        Ok(match package {
            Some(package) => {
                let check = check_candidate(package.version_numbers(), candidate);
                CandidateReport {
                    unique: check.unique,
                    greatest: check.greatest,
                    package: Some(package),
                }
            }
            None => CandidateReport {
                unique: false,
                greatest: false,
                package: None,
            },
        })
    }
}

/// PostgreSQL-backed package repository.
#[derive(Clone)]
pub struct PgPackageRepository {
    pool: PgPool,
}

impl PgPackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn package_from_row(row: &PgRow) -> Package {
        let files: Json<Vec<PackageFile>> = row.get("files");
        Package {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            name: row.get("name"),
            files: files.0,
            gist_id: row.get("gist_id"),
            versions: Vec::new(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    async fn load_versions(&self, package_id: Uuid) -> Result<Vec<Version>, sqlx::Error> {
        sqlx::query_as::<_, Version>(
            r#"
            SELECT id, package_id, number, sha, yanked, created_at
            FROM package_versions
            WHERE package_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(package_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl PackageRepository for PgPackageRepository {
    async fn find_package(&self, owner_id: Uuid, name: &str) -> Result<Option<Package>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, name, files, gist_id, created_at, updated_at
            FROM packages
            WHERE owner_id = $1 AND name = $2
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut package = Self::package_from_row(&row);
        package.versions = self.load_versions(package.id).await?;
        Ok(Some(package))
    }

    async fn list_packages(&self, owner_id: Uuid) -> Result<Vec<Package>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, name, files, gist_id, created_at, updated_at
            FROM packages
            WHERE owner_id = $1
            ORDER BY name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        let mut packages = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut package = Self::package_from_row(row);
            package.versions = self.load_versions(package.id).await?;
            packages.push(package);
        }
        Ok(packages)
    }

    async fn save_package(
        &self,
        owner_id: Uuid,
        name: &str,
        files: Vec<PackageFile>,
    ) -> Result<Package, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO packages (owner_id, name, files)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id, name)
            DO UPDATE SET
                files = EXCLUDED.files,
                updated_at = NOW()
            RETURNING id, owner_id, name, files, gist_id, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(Json(&files))
        .fetch_one(&self.pool)
        .await?;

        let mut package = Self::package_from_row(&row);
        package.versions = self.load_versions(package.id).await?;
        Ok(package)
    }

    async fn append_version(&self, package: &Package, version: &Version) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent publishes to the same package
        let stored_gist: Option<Option<String>> =
            sqlx::query_scalar("SELECT gist_id FROM packages WHERE id = $1 FOR UPDATE")
                .bind(package.id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(stored_gist) = stored_gist else {
            return Err(StoreError::PackageMissing(package.id));
        };
        ensure_same_gist(stored_gist.as_deref(), package)?;

        let existing: Vec<String> =
            sqlx::query_scalar("SELECT number FROM package_versions WHERE package_id = $1")
                .bind(package.id)
                .fetch_all(&mut *tx)
                .await?;
        admit_version(&existing, version)?;

        // The gist id is written once and never replaced
        sqlx::query(
            r#"
            UPDATE packages
            SET gist_id = COALESCE(gist_id, $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(package.id)
        .bind(&package.gist_id)
        .execute(&mut *tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO package_versions (id, package_id, number, sha, yanked, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(version.id)
        .bind(package.id)
        .bind(&version.number)
        .bind(&version.sha)
        .bind(version.yanked)
        .bind(version.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            // UNIQUE(package_id, number) backs the in-transaction check
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return Err(StoreError::Conflict(version.number.clone()));
                }
            }
            return Err(e.into());
        }

        tx.commit().await?;
        Ok(())
    }

    async fn yank_version(
        &self,
        owner_id: Uuid,
        name: &str,
        number: &str,
    ) -> Result<YankOutcome, StoreError> {
        let package_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM packages WHERE owner_id = $1 AND name = $2")
                .bind(owner_id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        let Some(package_id) = package_id else {
            return Ok(YankOutcome::PackageMissing);
        };

        let updated = sqlx::query(
            r#"
            UPDATE package_versions
            SET yanked = TRUE
            WHERE package_id = $1 AND number = $2 AND yanked = FALSE
            "#,
        )
        .bind(package_id)
        .bind(number)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() > 0 {
            return Ok(YankOutcome::Yanked);
        }

        let exists: Option<bool> = sqlx::query_scalar(
            "SELECT yanked FROM package_versions WHERE package_id = $1 AND number = $2",
        )
        .bind(package_id)
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match exists {
            Some(_) => YankOutcome::AlreadyYanked,
            None => YankOutcome::VersionMissing,
        })
    }
}
