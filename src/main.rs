//! gist-registry - Main application entry point
//!
//! Serves the package registry API: GitHub login, package management, and
//! publishing versions whose files live in GitHub Gists.

use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gist_registry::config::Config;
use gist_registry::db::connect_stores;
use gist_registry::handlers::{configure_routes, AppState};
use gist_registry::middleware::{create_rate_limiter, rate_limiter_config};
use gist_registry::services::GitHubGistClient;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gist_registry=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loading configuration...");

    // Load configuration from environment variables
    let config = Config::from_env().expect("Failed to load configuration");
    let server_addr = config.server_addr();

    let stores = connect_stores(&config)
        .await
        .expect("Failed to initialize storage");

    // One client for OAuth and Gist calls; GitHub requires a user agent
    let http_client = reqwest::Client::builder()
        .user_agent("gist-registry")
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client");

    let gists = Arc::new(GitHubGistClient::new(
        http_client.clone(),
        config.github_api_url.clone(),
    ));

    let rate_limits = rate_limiter_config(config.rate_limit_burst, config.rate_limit_replenish_secs)
        .expect("Failed to build rate limiter configuration");

    // Create shared application state
    let app_state = web::Data::new(AppState::new(config, http_client, stores, gists));

    tracing::info!("Starting server at http://{}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Request logging
            .wrap(Logger::default())
            // Distributed tracing
            .wrap(tracing_actix_web::TracingLogger::default())
            // Rate limiting
            .wrap(create_rate_limiter(&rate_limits))
            .configure(configure_routes)
    })
    .bind(&server_addr)?
    .run()
    .await
}
