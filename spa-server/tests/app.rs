use std::fs;
use std::sync::Arc;

use serde_json::json;
use spa_api::{action_fn, ActionRegistry, ActionResponse, GetVersion};
use spa_core::{AppConfig, BuildInfo, ServerTimeouts, SpaConfig};
use spa_security::{OidcSettings, TokenValidator};
use spa_server::app::{assemble, build_app, build_info};
use spa_static::FsProvider;
use spa_test::{TestApp, TestJwt};
use tempfile::TempDir;

fn info() -> BuildInfo {
    BuildInfo::new("9.9.9", "2024-01-01T00:00:00Z", "rustc test")
}

fn app() -> (TempDir, TestApp, TestJwt) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("static/js")).unwrap();
    fs::write(dir.path().join("index.html.gz"), b"INDEX").unwrap();
    fs::write(dir.path().join("static/js/main.js.gz"), b"MAIN").unwrap();

    let jwt = TestJwt::new();
    let validator = TokenValidator::new_with_static_key(
        jwt.decoding_key(),
        OidcSettings::new(jwt.issuer(), jwt.audience()),
    );
    let registry = ActionRegistry::builder()
        .register(GetVersion)
        .register(action_fn("explode", false, |_| async {
            if true {
                panic!("action exploded");
            }
            Ok(ActionResponse::json(()))
        }))
        .register(action_fn("whoami", true, |ctx| async move {
            Ok(ActionResponse::json(json!({
                "username": ctx.claims.map(|c| c.username),
            })))
        }))
        .build()
        .unwrap();

    let router = assemble(
        registry,
        validator,
        info(),
        Arc::new(FsProvider::new(dir.path())),
        &ServerTimeouts::default(),
    );
    (dir, TestApp::new(router), jwt)
}

#[tokio::test]
async fn api_and_static_branches() {
    let (_dir, app, _) = app();
    app.post("/api")
        .json(&json!({"action": "get_version"}))
        .send()
        .await
        .assert_ok()
        .assert_json_path("version", "9.9.9")
        .assert_json_path("go_version", "rustc test");

    let resp = app
        .get("/dashboard/settings")
        .send()
        .await
        .assert_ok()
        .assert_header("content-type", "text/html");
    assert_eq!(resp.text(), "INDEX");
}

#[tokio::test]
async fn api_responses_compressed_when_accepted() {
    let (_dir, app, _) = app();
    let resp = app
        .post("/api")
        .header("accept-encoding", "gzip")
        .json(&json!({"action": "get_version"}))
        .send()
        .await
        .assert_ok()
        .assert_header("content-encoding", "gzip");
    assert_eq!(&resp.body[..2], &[0x1f, 0x8b]);
}

#[tokio::test]
async fn static_responses_not_recompressed() {
    let (_dir, app, _) = app();
    let resp = app
        .get("/static/js/main.js")
        .header("accept-encoding", "gzip, deflate")
        .send()
        .await
        .assert_ok()
        .assert_header("content-encoding", "gzip");
    assert_eq!(resp.text(), "MAIN");
}

#[tokio::test]
async fn panic_in_action_is_recovered() {
    let (_dir, app, _) = app();
    app.post("/api")
        .json(&json!({"action": "explode"}))
        .send()
        .await
        .assert_internal_error()
        .assert_error("Internal Server Error");

    // the service keeps answering
    app.post("/api")
        .json(&json!({"action": "get_version"}))
        .send()
        .await
        .assert_ok();
}

#[tokio::test]
async fn authenticated_action_through_pipeline() {
    let (_dir, app, jwt) = app();
    app.post("/api")
        .header("x-forwarded-for", "203.0.113.5")
        .bearer(&jwt.token())
        .json(&json!({"action": "whoami"}))
        .send()
        .await
        .assert_ok()
        .assert_json_path("username", "test-user");
}

#[tokio::test]
async fn api_subpath_is_not_found() {
    let (_dir, app, _) = app();
    app.get("/api/users")
        .send()
        .await
        .assert_not_found()
        .assert_error("Not Found");
}

#[tokio::test]
async fn api_rejects_other_methods() {
    let (_dir, app, _) = app();
    app.put("/api")
        .json(&json!({"action": "get_version"}))
        .send()
        .await
        .assert_method_not_allowed()
        .assert_error("method is not allowed");
}

#[tokio::test]
async fn static_rejects_post() {
    let (_dir, app, _) = app();
    app.post("/index.html")
        .body("x")
        .send()
        .await
        .assert_method_not_allowed();
}

#[tokio::test]
async fn build_app_from_config_uses_embedded_assets() {
    let config = AppConfig::from_config(&SpaConfig::empty()).unwrap();
    let app = TestApp::new(build_app(&config, info()).unwrap());
    let resp = app
        .get("/")
        .send()
        .await
        .assert_ok()
        .assert_header("content-encoding", "gzip");
    assert_eq!(&resp.body[..2], &[0x1f, 0x8b]);

    app.post("/api")
        .json(&json!({"action": "get_version"}))
        .send()
        .await
        .assert_ok()
        .assert_json_path("version", "9.9.9");
}

#[tokio::test]
async fn build_app_with_missing_local_path_is_not_found() {
    let mut raw = SpaConfig::empty();
    raw.set("static.local_path", "/nonexistent");
    let config = AppConfig::from_config(&raw).unwrap();
    let app = TestApp::new(build_app(&config, info()).unwrap());
    app.get("/")
        .send()
        .await
        .assert_not_found();
}

#[tokio::test]
async fn baked_build_metadata_reported() {
    let config = AppConfig::from_config(&SpaConfig::empty()).unwrap();
    let app = TestApp::new(build_app(&config, build_info()).unwrap());
    let non_empty = |v: &serde_json::Value| v.as_str().is_some_and(|s| !s.is_empty());
    app.get("/api")
        .query(&[("data", r#"{"action":"get_version"}"#)])
        .send()
        .await
        .assert_ok()
        .assert_json_path("version", env!("CARGO_PKG_VERSION"))
        .assert_json_path_fn("build_time", non_empty)
        .assert_json_path_fn("go_version", non_empty);
}
