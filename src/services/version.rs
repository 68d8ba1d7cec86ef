//! Version number grammar and ordering.
//!
//! Accepted versions are Semantic Versioning 2.0.0 strings with exactly three
//! numeric components and an optional pre-release suffix (`1.2.3`,
//! `2.0.0-rc.1`). Build metadata is rejected because it takes no part in
//! precedence, so two versions differing only in build metadata would be
//! indistinguishable for ordering. Comparison follows semver precedence:
//! component-wise numeric, with a pre-release sorting below its release.

use thiserror::Error;

/// Errors produced while validating a version string.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Invalid version number '{input}': {source}")]
    Malformed {
        input: String,
        #[source]
        source: semver::Error,
    },

    #[error("Build metadata is not allowed in version '{0}'")]
    BuildMetadata(String),
}

/// Outcome of comparing a candidate against a package's existing versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionCheck {
    /// No existing version has the same number
    pub unique: bool,
    /// The candidate is strictly greater than every existing version
    pub greatest: bool,
}

impl VersionCheck {
    pub fn accepted(&self) -> bool {
        self.unique && self.greatest
    }
}

/// Parses a version string according to the registry grammar.
pub fn parse_version(number: &str) -> Result<semver::Version, VersionError> {
    let version = semver::Version::parse(number).map_err(|source| VersionError::Malformed {
        input: number.to_string(),
        source,
    })?;

    if !version.build.is_empty() {
        return Err(VersionError::BuildMetadata(number.to_string()));
    }

    Ok(version)
}

/// Returns true if `number` is a well-formed version.
pub fn is_valid(number: &str) -> bool {
    parse_version(number).is_ok()
}

/// Checks `candidate` for uniqueness and ordering against `existing`.
///
/// Stored numbers that fail to parse are skipped with a warning; they can
/// only appear if rows were written outside this service.
pub fn check_candidate<'a, I>(existing: I, candidate: &semver::Version) -> VersionCheck
where
    I: IntoIterator<Item = &'a str>,
{
    let mut unique = true;
    let mut greatest = true;

    for number in existing {
        let current = match semver::Version::parse(number) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Skipping unparsable stored version '{}': {}", number, e);
                continue;
            }
        };

        if current == *candidate {
            unique = false;
        }
        if current >= *candidate {
            greatest = false;
        }
    }

    VersionCheck { unique, greatest }
}
