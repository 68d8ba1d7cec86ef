//! gist-registry - a package registry whose files live in GitHub Gists
//!
//! Authenticated users register packages, publish strictly increasing
//! semantic versions of them, fetch individual files of any published
//! version, and yank versions they no longer want used. Each package is
//! mirrored into one gist; every version pins one gist revision.
//!
//! # Modules
//!
//! - [`config`] - Application configuration from environment variables
//! - [`db`] - Database pool, migrations and store selection
//! - [`error`] - Unified error handling
//! - [`models`] - User, Package and Version records
//! - [`services`] - Version rules, gist client, repositories and the publish workflow
//! - [`handlers`] - HTTP route handlers
//! - [`middleware`] - Session authentication and rate limiting
//!
//! # Quick Start
//!
//! ```ignore
//! use gist_registry::{AppState, Config};
//! use gist_registry::db::connect_stores;
//! use gist_registry::handlers::configure_routes;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

// Re-export commonly used types at the crate root
pub use config::{Config, ConfigError};
pub use db::{connect_stores, create_pool, run_migrations, Stores};
pub use error::{AppError, AppResult};
pub use handlers::auth::AppState;
pub use models::{Package, PackageFile, User, Version};
pub use services::{
    Claims, GistApi, GistError, GitHubOAuthConfig, GitHubUser, GithubError, LookupError,
    PublishError, PublishedVersion,
};
