//! Services module - business logic and external service integrations.
//!
//! This module contains:
//! - `version`: Version number grammar and ordering checks
//! - `gist`: GitHub Gist API client
//! - `package`: Package persistence
//! - `user`: User persistence
//! - `memory`: In-memory implementation of both repositories
//! - `registry`: Publish and file lookup workflows
//! - `github`: GitHub OAuth client for authentication
//! - `token`: Session JWT handling

pub mod gist;
pub mod github;
pub mod memory;
pub mod package;
pub mod registry;
pub mod token;
pub mod user;
pub mod version;

// Re-export commonly used types for convenience
pub use gist::{Gist, GistApi, GistError, GitHubGistClient};
pub use github::{GitHubOAuthConfig, GitHubUser, GithubError};
pub use memory::MemoryStore;
pub use package::{PackageRepository, PgPackageRepository, StoreError, YankOutcome};
pub use registry::{LookupError, PublishError, PublishedVersion};
pub use token::Claims;
pub use user::{PgUserRepository, UserRepository};
