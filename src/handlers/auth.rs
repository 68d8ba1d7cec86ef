//! Authentication handlers for the GitHub OAuth flow.
//!
//! This module provides the following endpoints:
//! - `GET /auth/github` - Initiates GitHub OAuth flow (supports `return_to`)
//! - `GET /auth/github/callback` - Handles OAuth callback from GitHub
//! - `POST /auth/logout` - Clears the session cookie
//! - `GET /` - Returns the authenticated user

use actix_web::{cookie::Cookie, http::header, web, HttpRequest, HttpResponse};
use rand::RngCore;
use serde::Deserialize;
use std::sync::Arc;
use time::Duration as TimeDuration;

use crate::config::Config;
use crate::db::Stores;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::services::gist::GistApi;
use crate::services::github::{exchange_code, get_authorize_url, get_user, GitHubOAuthConfig};
use crate::services::package::PackageRepository;
use crate::services::token::create_session_token;
use crate::services::user::UserRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Config,
    /// HTTP client for GitHub OAuth calls
    pub http_client: reqwest::Client,
    pub users: Arc<dyn UserRepository>,
    pub packages: Arc<dyn PackageRepository>,
    pub gists: Arc<dyn GistApi>,
}

impl AppState {
    pub fn new(
        config: Config,
        http_client: reqwest::Client,
        stores: Stores,
        gists: Arc<dyn GistApi>,
    ) -> Self {
        Self {
            config,
            http_client,
            users: stores.users,
            packages: stores.packages,
            gists,
        }
    }
}

/// Query parameters for the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code from GitHub
    pub code: String,
    /// State parameter for CSRF protection
    pub state: String,
}

/// Query parameters for GitHub redirect with optional return_to.
#[derive(Debug, Deserialize)]
pub struct GitHubRedirectQuery {
    /// Path to land on after login; only relative paths are honored
    pub return_to: Option<String>,
}

/// Name of the cookie used to store OAuth state.
const OAUTH_STATE_COOKIE: &str = "oauth_state";
/// Name of the cookie used to store return URL.
const RETURN_TO_COOKIE: &str = "return_to";
/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "gist_registry_session";

/// Generates a random hex-encoded state string for CSRF protection.
fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Accepts `return_to` only when it is a path on this host.
fn safe_return_to(return_to: &str) -> Option<&str> {
    let is_relative = return_to.starts_with('/')
        && !return_to.starts_with("//")
        && !return_to.contains('\\');
    is_relative.then_some(return_to)
}

fn expired_cookie(name: &str) -> Cookie<'_> {
    Cookie::build(name, "")
        .path("/")
        .max_age(TimeDuration::seconds(0))
        .finish()
}

/// Initiates the GitHub OAuth flow by redirecting to GitHub's authorization page.
///
/// # Process
/// 1. Generates a random state string for CSRF protection
/// 2. Stores the state in an httponly cookie
/// 3. If a relative return_to is provided, stores it for the post-auth redirect
/// 4. Redirects the user to GitHub's authorization URL
pub async fn github_redirect(
    query: web::Query<GitHubRedirectQuery>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let state = generate_state();

    let github_config = GitHubOAuthConfig::from(&data.config);
    let authorize_url = get_authorize_url(&github_config, &state);

    let is_production = data.config.is_production();

    let state_cookie = Cookie::build(OAUTH_STATE_COOKIE, state)
        .path("/")
        .http_only(true)
        .secure(is_production)
        .max_age(TimeDuration::minutes(10))
        .finish();

    let mut response_builder = HttpResponse::Found();
    response_builder.append_header((header::SET_COOKIE, state_cookie.to_string()));

    if let Some(return_to) = query.return_to.as_deref().and_then(safe_return_to) {
        let return_to_cookie = Cookie::build(RETURN_TO_COOKIE, return_to.to_string())
            .path("/")
            .http_only(true)
            .secure(is_production)
            .max_age(TimeDuration::minutes(10))
            .finish();
        response_builder.append_header((header::SET_COOKIE, return_to_cookie.to_string()));
    }

    response_builder
        .append_header((header::LOCATION, authorize_url))
        .finish()
}

/// Handles the OAuth callback from GitHub.
///
/// # Process
/// 1. Validates the state parameter against the cookie (CSRF protection)
/// 2. Exchanges the authorization code for a GitHub access token
/// 3. Fetches the user's GitHub profile
/// 4. Creates or updates the user, storing the access token for gist calls
/// 5. Sets the session cookie and redirects to `return_to` or `/`
pub async fn github_callback(
    query: web::Query<CallbackQuery>,
    req: HttpRequest,
    data: web::Data<AppState>,
) -> HttpResponse {
    // Verify state matches cookie (CSRF protection)
    let cookie_state = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string());

    match cookie_state {
        Some(expected_state) if expected_state == query.state => {}
        Some(_) => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Invalid state parameter"}));
        }
        None => {
            return HttpResponse::BadRequest()
                .json(serde_json::json!({"error": "Missing state cookie"}));
        }
    }

    let return_to = req
        .cookie(RETURN_TO_COOKIE)
        .and_then(|c| safe_return_to(c.value()).map(str::to_string))
        .unwrap_or_else(|| "/".to_string());

    let github_config = GitHubOAuthConfig::from(&data.config);

    let github_access_token =
        match exchange_code(&data.http_client, &github_config, &query.code).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Failed to exchange code: {:?}", e);
                return HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Failed to authenticate with GitHub"}));
            }
        };

    let github_user = match get_user(
        &data.http_client,
        &data.config.github_api_url,
        &github_access_token,
    )
    .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to fetch GitHub user: {:?}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Failed to fetch user profile"}));
        }
    };

    let user = match data
        .users
        .upsert_from_github(&github_user, &github_access_token)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("Failed to create/update user: {:?}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Failed to save user"}));
        }
    };

    let session_token = match create_session_token(
        user.id,
        &data.config.session_secret,
        data.config.session_expiry_secs,
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to sign session token: {:?}", e);
            return HttpResponse::InternalServerError()
                .json(serde_json::json!({"error": "Token processing error"}));
        }
    };

    tracing::info!("User {} logged in", user.username);

    let session_cookie = Cookie::build(SESSION_COOKIE, session_token)
        .path("/")
        .http_only(true)
        .secure(data.config.is_production())
        .max_age(TimeDuration::seconds(data.config.session_expiry_secs))
        .finish();

    HttpResponse::Found()
        .append_header((header::SET_COOKIE, expired_cookie(OAUTH_STATE_COOKIE).to_string()))
        .append_header((header::SET_COOKIE, expired_cookie(RETURN_TO_COOKIE).to_string()))
        .append_header((header::SET_COOKIE, session_cookie.to_string()))
        .append_header((header::LOCATION, return_to))
        .finish()
}

/// Clears the session cookie. Session tokens are stateless, so a copied
/// bearer token stays valid until it expires.
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .append_header((header::SET_COOKIE, expired_cookie(SESSION_COOKIE).to_string()))
        .json(serde_json::json!({"status": "logged out"}))
}

/// Returns the authenticated user's record.
pub async fn current_user(auth: AuthenticatedUser) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(auth.user))
}
