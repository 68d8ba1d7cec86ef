//! Middleware for the gist registry.
//!
//! This module contains:
//! - `auth` - Session authentication (AuthenticatedUser extractor)
//! - `rate_limit` - Rate limiting middleware using Governor

pub mod auth;
pub mod rate_limit;

// Re-export commonly used types
pub use auth::{AuthError, AuthenticatedUser};
pub use rate_limit::{create_rate_limiter, rate_limiter_config, RateLimiter, RateLimiterConfig};
