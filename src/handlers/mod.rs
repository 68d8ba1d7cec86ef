//! HTTP handlers for the gist registry.
//!
//! This module contains all the route handlers:
//! - `auth` - GitHub OAuth login, logout and the current user
//! - `health` - Health check endpoint
//! - `packages` - Package listing, display and file management
//! - `versions` - Publishing, file serving and yanking

use actix_web::web;

pub mod auth;
pub mod health;
pub mod packages;
pub mod versions;

// Re-export commonly used types
pub use auth::{
    current_user, github_callback, github_redirect, logout, AppState, CallbackQuery,
    GitHubRedirectQuery,
};
pub use health::{health_check, HealthResponse};
pub use packages::{list_packages, save_package, show_package, PackagesResponse, SavePackageRequest};
pub use versions::{publish_release, serve_file, yank_release};

/// Registers every route. Fixed paths come before the `/{username}` catch-alls,
/// and the publish route before the file route it shares a shape with.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/github", web::get().to(github_redirect))
                .route("/github/callback", web::get().to(github_callback))
                .route("/logout", web::post().to(logout)),
        )
        .route("/", web::get().to(current_user))
        .route("/{username}", web::get().to(list_packages))
        .service(
            web::resource("/{username}/{package}")
                .route(web::get().to(show_package))
                .route(web::put().to(save_package)),
        )
        .route(
            "/{username}/{package}/releases/{version}",
            web::post().to(publish_release),
        )
        .route(
            "/{username}/{package}/{version}",
            web::delete().to(yank_release),
        )
        .route(
            "/{username}/{package}/{version}/{file}",
            web::get().to(serve_file),
        );
}
