//! User model for GitHub OAuth authenticated users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents a user authenticated via GitHub OAuth.
///
/// Users are upserted on every successful OAuth callback and are identified
/// by their unique GitHub ID. The stored access token is the capability used
/// for gist reads and writes on the user's behalf.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique identifier for the user (UUID v4)
    pub id: Uuid,

    /// GitHub's unique user ID
    pub github_id: i64,

    /// GitHub username
    pub username: String,

    /// User's email address (optional, may not be public on GitHub)
    pub email: Option<String>,

    /// URL to the user's GitHub avatar
    pub avatar_url: Option<String>,

    /// GitHub OAuth access token. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub access_token: String,

    /// Timestamp when the user record was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the user record was last updated
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new User instance.
    ///
    /// Postgres fills `id` and the timestamps itself; the in-memory store
    /// and tests use this constructor.
    pub fn new(
        github_id: i64,
        username: String,
        email: Option<String>,
        avatar_url: Option<String>,
        access_token: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            github_id,
            username,
            email,
            avatar_url,
            access_token,
            created_at: now,
            updated_at: now,
        }
    }
}
