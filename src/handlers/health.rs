//! Liveness endpoint for the gist registry.
//!
//! `GET /health` answers without touching the store or GitHub, so it stays
//! green while the database or the Gist API is degraded.

use actix_web::{HttpResponse, Responder};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Crate version of the running binary
    pub version: &'static str,
}

impl HealthResponse {
    fn healthy() -> Self {
        Self {
            status: "healthy",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse::healthy())
}
