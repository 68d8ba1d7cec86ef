//! Session tokens.
//!
//! A session is a JWT signed with `SESSION_SECRET` whose subject is the
//! user's internal UUID. It travels either in the session cookie set by the
//! OAuth callback or as an `Authorization: Bearer` header.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure for session tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - the user ID as a string
    pub sub: String,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issued at time as Unix timestamp
    pub iat: i64,
}

/// Creates a signed session token for a user.
///
/// # Example
///
/// ```
/// use gist_registry::services::token::{create_session_token, decode_session_token};
/// use uuid::Uuid;
///
/// let user_id = Uuid::new_v4();
/// let token = create_session_token(user_id, "my_secret", 3600).expect("Failed to create token");
/// let claims = decode_session_token(&token, "my_secret").expect("Failed to decode token");
/// assert_eq!(claims.sub, user_id.to_string());
/// ```
pub fn create_session_token(
    user_id: Uuid,
    secret: &str,
    expiry_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + expiry_secs,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Decodes and validates a session token (signature and expiry).
pub fn decode_session_token(
    token: &str,
    secret: &str,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}
