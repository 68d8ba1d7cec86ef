//! User persistence.
//!
//! Users are keyed by their GitHub ID and upserted on every OAuth login so
//! that the stored access token is always the most recent one.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::user::User;
use crate::services::github::GitHubUser;
use crate::services::package::StoreError;

/// Storage operations for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by their internal UUID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Finds a user by GitHub login.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Creates or updates the user for a GitHub identity, storing `access_token`.
    async fn upsert_from_github(
        &self,
        github_user: &GitHubUser,
        access_token: &str,
    ) -> Result<User, StoreError>;
}

/// PostgreSQL-backed user repository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        github_id: r.get("github_id"),
        username: r.get("username"),
        email: r.get("email"),
        avatar_url: r.get("avatar_url"),
        access_token: r.get("access_token"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, github_id, username, email, avatar_url, access_token, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        // GitHub logins are case-insensitive
        let row = sqlx::query(
            r#"
            SELECT id, github_id, username, email, avatar_url, access_token, created_at, updated_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn upsert_from_github(
        &self,
        github_user: &GitHubUser,
        access_token: &str,
    ) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (github_id, username, email, avatar_url, access_token)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (github_id)
            DO UPDATE SET
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                avatar_url = EXCLUDED.avatar_url,
                access_token = EXCLUDED.access_token,
                updated_at = NOW()
            RETURNING id, github_id, username, email, avatar_url, access_token, created_at, updated_at
            "#,
        )
        .bind(github_user.id)
        .bind(&github_user.login)
        .bind(&github_user.email)
        .bind(&github_user.avatar_url)
        .bind(access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }
}
