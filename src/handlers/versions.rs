//! Version handlers: publish, serve a file, yank.
//!
//! - `POST /{username}/{package}/releases/{version}` - Publishes a version
//! - `GET /{username}/{package}/{version}/{file}` - Serves one file of a version
//! - `DELETE /{username}/{package}/{version}` - Yanks a version

use actix_web::{http::header, web, HttpResponse};

use crate::error::{AppError, AppResult};
use crate::handlers::auth::AppState;
use crate::handlers::packages::{find_owner, require_owner};
use crate::middleware::auth::AuthenticatedUser;
use crate::services::package::YankOutcome;
use crate::services::registry::{find_file_contents, publish_version, FileRef};
use crate::services::version::parse_version;

/// Content-Type for a served file, from its extension.
fn content_type_for(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Publishes the package's current files as a new version.
pub async fn publish_release(
    auth: AuthenticatedUser,
    path: web::Path<(String, String, String)>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (username, package_name, number) = path.into_inner();
    require_owner(&auth, &username)?;

    let published = publish_version(
        data.packages.as_ref(),
        data.gists.as_ref(),
        auth.user.id,
        &package_name,
        &number,
        auth.access_token(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(published))
}

/// Serves a file's content exactly as stored in the version's gist revision.
pub async fn serve_file(
    auth: AuthenticatedUser,
    path: web::Path<(String, String, String, String)>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (username, package_name, version, filename) = path.into_inner();
    let owner = find_owner(&data, &username).await?;

    let content = find_file_contents(
        data.packages.as_ref(),
        data.gists.as_ref(),
        FileRef {
            owner_id: owner.id,
            package: &package_name,
            version: &version,
            filename: &filename,
        },
        auth.access_token(),
    )
    .await?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type_for(&filename)))
        .body(content))
}

/// Marks a version as yanked. Repeating the call answers 304.
pub async fn yank_release(
    auth: AuthenticatedUser,
    path: web::Path<(String, String, String)>,
    data: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (username, package_name, number) = path.into_inner();
    require_owner(&auth, &username)?;

    let number = parse_version(&number)
        .map_err(|_| AppError::NotFound("Version does not exist".to_string()))?
        .to_string();

    match data
        .packages
        .yank_version(auth.user.id, &package_name, &number)
        .await?
    {
        YankOutcome::Yanked => {
            tracing::info!("Yanked {}/{} {}", username, package_name, number);
            Ok(HttpResponse::Ok().finish())
        }
        YankOutcome::AlreadyYanked => Ok(HttpResponse::NotModified().finish()),
        YankOutcome::PackageMissing => {
            Err(AppError::NotFound("Package does not exist".to_string()))
        }
        YankOutcome::VersionMissing => {
            Err(AppError::NotFound("Version does not exist".to_string()))
        }
    }
}
