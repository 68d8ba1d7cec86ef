//! Data models for the gist-registry application.
//!
//! - [`User`] - A GitHub-authenticated user
//! - [`Package`] - A named, owned set of files mirrored into a gist
//! - [`Version`] - A published version pinned to a gist revision

pub mod package;
pub mod user;

pub use package::{Package, PackageFile, Version};
pub use user::User;
