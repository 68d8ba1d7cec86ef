use std::env;
use thiserror::Error;

/// Default GitHub REST API base.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Debug, Clone)]
pub struct Config {
    // Persistence (in-memory store when absent)
    pub database_url: Option<String>,
    // GitHub OAuth app
    pub github_client_id: String,
    pub github_client_secret: String,
    pub github_callback_url: String,
    // GitHub REST API base, overridable for tests and GitHub Enterprise
    pub github_api_url: String,
    // Session signing
    pub session_secret: String,
    pub session_expiry_secs: i64,
    pub host: String,
    pub port: u16,
    // Per-IP rate limiting
    pub rate_limit_burst: u32,
    pub rate_limit_replenish_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

fn required(var: &str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::MissingVar(var.to_string()))
}

fn parsed_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env::var(var)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                var: var.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Tests control the environment themselves
        if env::var("GIST_REGISTRY_TEST_MODE").is_err() {
            dotenvy::dotenv().ok();
        }

        let github_client_id = required("GITHUB_CLIENT_ID")?;
        let github_client_secret = required("GITHUB_CLIENT_SECRET")?;
        let github_callback_url = required("GITHUB_CALLBACK_URL")?;
        let session_secret = required("SESSION_SECRET")?;

        if session_secret.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "SESSION_SECRET".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let github_api_url = env::var("GITHUB_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string());

        let session_expiry_secs = parsed_or("SESSION_EXPIRY_SECS", 7 * 24 * 60 * 60)?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed_or("PORT", 3000u16)?;

        let rate_limit_burst = parsed_or("RATE_LIMIT_BURST", 30u32)?;
        let rate_limit_replenish_secs = parsed_or("RATE_LIMIT_REPLENISH_SECS", 1u64)?;

        if rate_limit_burst == 0 || rate_limit_replenish_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "RATE_LIMIT_BURST/RATE_LIMIT_REPLENISH_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Config {
            database_url,
            github_client_id,
            github_client_secret,
            github_callback_url,
            github_api_url,
            session_secret,
            session_expiry_secs,
            host,
            port,
            rate_limit_burst,
            rate_limit_replenish_secs,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cookies get the `Secure` flag when the OAuth callback is served over https.
    pub fn is_production(&self) -> bool {
        self.github_callback_url.starts_with("https://")
    }
}
