//! Session authentication extractor.
//!
//! `AuthenticatedUser` resolves the caller's session token, taken from the
//! session cookie or an `Authorization: Bearer` header, to a stored user. The
//! handler receives the user as an ordinary argument; nothing is attached to
//! the request.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

use crate::handlers::auth::{AppState, SESSION_COOKIE};
use crate::models::User;
use crate::services::token::decode_session_token;

/// Represents an authenticated user extracted from a valid session.
///
/// # Example
///
/// ```ignore
/// use crate::middleware::auth::AuthenticatedUser;
///
/// async fn protected_route(auth: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}", auth.user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

impl AuthenticatedUser {
    /// GitHub access token of the caller, used for gist operations
    pub fn access_token(&self) -> &str {
        &self.user.access_token
    }

    /// Whether the caller is the user named by a `:username` path segment.
    pub fn is(&self, username: &str) -> bool {
        self.user.username.eq_ignore_ascii_case(username)
    }
}

/// Error type for authentication failures.
#[derive(Debug)]
pub enum AuthError {
    /// No session cookie or Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader,
    /// Token validation failed
    InvalidToken,
    /// User ID in token is not a valid UUID
    InvalidUserId,
    /// Token is valid but its user no longer exists
    UnknownUser,
    /// User lookup failed
    Lookup,
    /// App state not found
    MissingAppState,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Missing authorization token"),
            AuthError::InvalidHeader => write!(f, "Invalid authorization header format"),
            AuthError::InvalidToken => write!(f, "Invalid or expired token"),
            AuthError::InvalidUserId => write!(f, "Invalid user ID in token"),
            AuthError::UnknownUser => write!(f, "Unknown user"),
            AuthError::Lookup | AuthError::MissingAppState => write!(f, "Internal server error"),
        }
    }
}

impl actix_web::ResponseError for AuthError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidHeader
            | AuthError::InvalidToken
            | AuthError::InvalidUserId
            | AuthError::UnknownUser => actix_web::http::StatusCode::UNAUTHORIZED,
            AuthError::Lookup | AuthError::MissingAppState => {
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        let body = serde_json::json!({
            "error": self.to_string()
        });
        actix_web::HttpResponse::build(self.status_code()).json(body)
    }
}

/// Pulls the raw session token out of the request.
///
/// The Authorization header wins over the cookie when both are present.
fn session_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(value) = req.headers().get(header::AUTHORIZATION) {
        let value = value.to_str().map_err(|_| AuthError::InvalidHeader)?;
        return match value.strip_prefix("Bearer ") {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(AuthError::InvalidHeader),
        };
    }

    req.cookie(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AuthError::MissingToken)
}

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = session_token(req);
        let app_state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token?;
            let app_state = app_state.ok_or(AuthError::MissingAppState)?;

            let claims = decode_session_token(&token, &app_state.config.session_secret)
                .map_err(|_| AuthError::InvalidToken)?;
            let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;

            let user = app_state
                .users
                .find_by_id(user_id)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to load session user {}: {}", user_id, e);
                    AuthError::Lookup
                })?
                .ok_or(AuthError::UnknownUser)?;

            Ok(AuthenticatedUser { user })
        })
    }
}
