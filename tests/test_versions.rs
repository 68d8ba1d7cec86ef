//! Integration tests for serving files of published versions and yanking.
//!
//! Test coverage includes:
//! - Each version serves the files of its own gist revision
//! - Content-Type follows the file extension
//! - Distinct not-found messages for user, package, version and file
//! - Truncated gist files are fetched in full
//! - Yank is idempotent (200 then 304) and leaves the version servable

#[macro_use]
mod common;

use actix_web::{http::header, http::StatusCode, test};
use common::{bearer, TestContext};
use gist_registry::models::PackageFile;
use gist_registry::services::package::PackageRepository;

async fn read_error(resp: actix_web::dev::ServiceResponse) -> String {
    let body: serde_json::Value = test::read_body_json(resp).await;
    body["error"].as_str().unwrap_or_default().to_string()
}

#[actix_web::test]
async fn test_serve_file_from_each_version() {
    let ctx = TestContext::new();
    let (user, token) = ctx.login(1, "octocat").await;
    ctx.package(&user, "left-pad", &[("index.txt", "console.log(1);")])
        .await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.0.0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    ctx.store
        .save_package(
            user.id,
            "left-pad",
            vec![PackageFile::new("index.txt", "console.log(2);")],
        )
        .await
        .expect("save");

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.1.0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    for (version, expected) in [("1.0.0", "console.log(1);"), ("1.1.0", "console.log(2);")] {
        let req = test::TestRequest::get()
            .uri(&format!("/octocat/left-pad/{}/index.txt", version))
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/plain")
        );
        let body = test::read_body(resp).await;
        assert_eq!(body, expected.as_bytes());
    }
}

#[actix_web::test]
async fn test_serve_file_visible_to_other_authenticated_users() {
    let ctx = TestContext::new();
    let (owner, owner_token) = ctx.login(1, "octocat").await;
    let (_reader, reader_token) = ctx.login(2, "reader").await;
    ctx.package(&owner, "left-pad", &[("package.json", "{}")])
        .await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.0.0")
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/OctoCat/left-pad/1.0.0/package.json")
        .insert_header(bearer(&reader_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
}

#[actix_web::test]
async fn test_serve_file_distinct_not_found_messages() {
    let ctx = TestContext::new();
    let (user, token) = ctx.login(1, "octocat").await;
    ctx.package(&user, "left-pad", &[("index.js", "x")]).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.0.0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let cases = [
        ("/ghost/left-pad/1.0.0/index.js", "User not found"),
        ("/octocat/right-pad/1.0.0/index.js", "Package does not exist"),
        ("/octocat/left-pad/9.9.9/index.js", "Version does not exist"),
        ("/octocat/left-pad/not-a-version/index.js", "Version does not exist"),
        ("/octocat/left-pad/1.0.0/missing.js", "File does not exist"),
    ];

    for (uri, message) in cases {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(read_error(resp).await, message, "{}", uri);
    }
}

#[actix_web::test]
async fn test_serve_file_requires_authentication() {
    let ctx = TestContext::new();
    let app = test_app!(ctx);

    let req = test::TestRequest::get()
        .uri("/octocat/left-pad/1.0.0/index.js")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_serve_truncated_file_in_full() {
    let ctx = TestContext::new();
    let (user, token) = ctx.login(1, "octocat").await;
    ctx.package(&user, "big", &[("data.txt", "a long body of text")])
        .await;
    ctx.gists.truncate_reads();
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/big/releases/0.1.0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/octocat/big/0.1.0/data.txt")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(body, "a long body of text".as_bytes());
}

#[actix_web::test]
async fn test_yank_is_idempotent() {
    let ctx = TestContext::new();
    let (user, token) = ctx.login(1, "octocat").await;
    ctx.package(&user, "left-pad", &[("index.js", "x")]).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.0.0")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri("/octocat/left-pad/1.0.0")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(test::read_body(resp).await.is_empty());

    let req = test::TestRequest::delete()
        .uri("/octocat/left-pad/1.0.0")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

    let package = ctx
        .store
        .find_package(user.id, "left-pad")
        .await
        .expect("lookup")
        .expect("package exists");
    assert_eq!(package.versions.len(), 1);
    assert!(package.versions[0].yanked);

    // Yanked versions stay servable
    let req = test::TestRequest::get()
        .uri("/octocat/left-pad/1.0.0/index.js")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_yank_missing_package_and_version() {
    let ctx = TestContext::new();
    let (user, token) = ctx.login(1, "octocat").await;
    ctx.package(&user, "left-pad", &[("index.js", "x")]).await;
    let app = test_app!(ctx);

    let cases = [
        ("/octocat/right-pad/1.0.0", "Package does not exist"),
        ("/octocat/left-pad/1.0.0", "Version does not exist"),
        ("/octocat/left-pad/garbage", "Version does not exist"),
    ];

    for (uri, message) in cases {
        let req = test::TestRequest::delete()
            .uri(uri)
            .insert_header(bearer(&token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(read_error(resp).await, message, "{}", uri);
    }
}

#[actix_web::test]
async fn test_only_owner_can_yank() {
    let ctx = TestContext::new();
    let (owner, owner_token) = ctx.login(1, "octocat").await;
    let (_other, other_token) = ctx.login(2, "mallory").await;
    ctx.package(&owner, "left-pad", &[("index.js", "x")]).await;
    let app = test_app!(ctx);

    let req = test::TestRequest::post()
        .uri("/octocat/left-pad/releases/1.0.0")
        .insert_header(bearer(&owner_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri("/octocat/left-pad/1.0.0")
        .insert_header(bearer(&other_token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let package = ctx
        .store
        .find_package(owner.id, "left-pad")
        .await
        .expect("lookup")
        .expect("package exists");
    assert!(!package.versions[0].yanked);
}
