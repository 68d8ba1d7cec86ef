//! Package management handlers.
//!
//! - `GET /{username}` - Lists a user's packages
//! - `GET /{username}/{package}` - Shows one package with its versions
//! - `PUT /{username}/{package}` - Creates a package or replaces its files

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Package, PackageFile, User};

/// Request body for saving a package.
#[derive(Debug, Deserialize)]
pub struct SavePackageRequest {
    pub files: Vec<PackageFile>,
}

/// Response for listing packages.
#[derive(Debug, Serialize)]
pub struct PackagesResponse {
    pub packages: Vec<Package>,
}

/// Resolves the owner named by a `:username` path segment.
pub(crate) async fn find_owner(data: &AppState, username: &str) -> AppResult<User> {
    data.users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Rejects callers that are not the `:username` owner.
pub(crate) fn require_owner(auth: &AuthenticatedUser, username: &str) -> AppResult<()> {
    if auth.is(username) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the package owner can modify it".to_string(),
        ))
    }
}

fn validate_package_name(name: &str) -> AppResult<()> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid package name".to_string()))
    }
}

/// Checks a file list before it is stored. Gists reject empty files.
fn validate_files(files: &[PackageFile]) -> AppResult<()> {
    if files.is_empty() {
        return Err(AppError::BadRequest(
            "A package needs at least one file".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for file in files {
        if file.name.trim().is_empty() || file.name.contains('/') {
            return Err(AppError::BadRequest(format!(
                "Invalid file name '{}'",
                file.name
            )));
        }
        if !seen.insert(file.name.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Duplicate file name '{}'",
                file.name
            )));
        }
        if file.content.is_empty() {
            return Err(AppError::BadRequest(format!(
                "File '{}' is empty",
                file.name
            )));
        }
    }

    Ok(())
}

/// Lists the packages owned by `:username`.
pub async fn list_packages(
    _auth: AuthenticatedUser,
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let owner = find_owner(&data, &path).await?;
    let packages = data.packages.list_packages(owner.id).await?;

    Ok(HttpResponse::Ok().json(PackagesResponse { packages }))
}

/// Shows a package with its version history.
pub async fn show_package(
    _auth: AuthenticatedUser,
    path: web::Path<(String, String)>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (username, package_name) = path.into_inner();
    let owner = find_owner(&data, &username).await?;

    let package = data
        .packages
        .find_package(owner.id, &package_name)
        .await?
        .ok_or_else(|| AppError::NotFound("Package does not exist".to_string()))?;

    Ok(HttpResponse::Ok().json(package))
}

/// Creates the package or replaces its file list.
///
/// The new files reach the gist on the next publish; existing versions keep
/// pointing at their own revisions.
pub async fn save_package(
    auth: AuthenticatedUser,
    path: web::Path<(String, String)>,
    body: web::Json<SavePackageRequest>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (username, package_name) = path.into_inner();
    require_owner(&auth, &username)?;
    validate_package_name(&package_name)?;

    let SavePackageRequest { files } = body.into_inner();
    validate_files(&files)?;

    let package = data
        .packages
        .save_package(auth.user.id, &package_name, files)
        .await?;

    tracing::info!(
        "Saved package {}/{} with {} file(s)",
        auth.user.username,
        package.name,
        package.files.len()
    );

    Ok(HttpResponse::Ok().json(package))
}
