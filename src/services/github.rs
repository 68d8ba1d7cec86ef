//! GitHub OAuth service for authentication.
//!
//! This module provides functionality for:
//! - Generating GitHub OAuth authorization URLs
//! - Exchanging authorization codes for access tokens
//! - Fetching GitHub user information

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

/// OAuth scopes requested from GitHub. `gist` is needed to publish.
pub const OAUTH_SCOPES: &str = "gist read:user";

/// Configuration for GitHub OAuth.
#[derive(Debug, Clone)]
pub struct GitHubOAuthConfig {
    /// GitHub OAuth App Client ID
    pub client_id: String,
    /// GitHub OAuth App Client Secret
    pub client_secret: String,
    /// Callback URL registered with GitHub
    pub redirect_uri: String,
}

impl From<&Config> for GitHubOAuthConfig {
    fn from(config: &Config) -> Self {
        Self {
            client_id: config.github_client_id.clone(),
            client_secret: config.github_client_secret.clone(),
            redirect_uri: config.github_callback_url.clone(),
        }
    }
}

/// GitHub user information returned from the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    /// GitHub's unique user ID
    pub id: i64,
    /// GitHub username (login)
    pub login: String,
    /// User's email address (may be None if private)
    pub email: Option<String>,
    /// URL to the user's avatar image
    pub avatar_url: Option<String>,
}

/// Errors that can occur during GitHub OAuth operations.
#[derive(Debug, Error)]
pub enum GithubError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse response from GitHub
    #[error("Invalid response from GitHub")]
    InvalidResponse,

    /// GitHub API returned an error
    #[error("GitHub API error: {0}")]
    ApiError(String),
}

/// Generates the GitHub OAuth authorization URL.
///
/// # Example
///
/// ```
/// use gist_registry::services::github::{GitHubOAuthConfig, get_authorize_url};
///
/// let config = GitHubOAuthConfig {
///     client_id: "your_client_id".to_string(),
///     client_secret: "your_client_secret".to_string(),
///     redirect_uri: "https://example.com/callback".to_string(),
/// };
///
/// let url = get_authorize_url(&config, "random_state_123");
/// assert!(url.contains("client_id=your_client_id"));
/// assert!(url.contains("state=random_state_123"));
/// ```
pub fn get_authorize_url(config: &GitHubOAuthConfig, state: &str) -> String {
    format!(
        "https://github.com/login/oauth/authorize?client_id={}&redirect_uri={}&scope={}&state={}",
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(OAUTH_SCOPES),
        urlencoding::encode(state)
    )
}

/// Exchanges an authorization code for an access token.
///
/// # Errors
///
/// Returns `GithubError::RequestFailed` if the HTTP request fails
/// Returns `GithubError::InvalidResponse` if the response carries no token
/// Returns `GithubError::ApiError` if GitHub returns an error response
pub async fn exchange_code(
    client: &reqwest::Client,
    config: &GitHubOAuthConfig,
    code: &str,
) -> Result<String, GithubError> {
    #[derive(Serialize)]
    struct TokenRequest<'a> {
        client_id: &'a str,
        client_secret: &'a str,
        code: &'a str,
        redirect_uri: &'a str,
    }

    #[derive(Deserialize)]
    struct TokenResponseWithError {
        access_token: Option<String>,
        error: Option<String>,
        error_description: Option<String>,
    }

    let response = client
        .post("https://github.com/login/oauth/access_token")
        .header("Accept", "application/json")
        .json(&TokenRequest {
            client_id: &config.client_id,
            client_secret: &config.client_secret,
            code,
            redirect_uri: &config.redirect_uri,
        })
        .send()
        .await?;

    let token_response: TokenResponseWithError = response.json().await?;

    if let Some(error) = token_response.error {
        let description = token_response
            .error_description
            .unwrap_or_else(|| error.clone());
        return Err(GithubError::ApiError(description));
    }

    token_response
        .access_token
        .ok_or(GithubError::InvalidResponse)
}

/// Fetches the authenticated user's information from the GitHub API at `api_base`.
pub async fn get_user(
    client: &reqwest::Client,
    api_base: &str,
    access_token: &str,
) -> Result<GitHubUser, GithubError> {
    let response = client
        .get(format!("{}/user", api_base))
        .bearer_auth(access_token)
        .header("Accept", "application/vnd.github+json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(GithubError::ApiError(format!(
            "GitHub API returned {}: {}",
            status, body
        )));
    }

    let user: GitHubUser = response.json().await.map_err(|_| GithubError::InvalidResponse)?;
    Ok(user)
}
