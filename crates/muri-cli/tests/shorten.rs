use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_shorten_prints_short_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/default/shorten"))
        .and(body_json(
            serde_json::json!({ "link": "https://example.com/some/long/page" }),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "shortUrl": "a1b2c3" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("muri")
        .env("MURI_HOME", home.path())
        .env("MURI_BASE_URL", server.uri())
        .env("MURI_BLOCK_REAL_API", "1")
        .args(["shorten", "example.com/some/long/page"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/r/a1b2c3"));
}

#[tokio::test]
async fn test_shorten_surfaces_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/default/shorten"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({ "message": "invalid link" })),
        )
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("muri")
        .env("MURI_HOME", home.path())
        .env("MURI_BASE_URL", server.uri())
        .env("MURI_BLOCK_REAL_API", "1")
        .args(["shorten", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid link"));
}

#[tokio::test]
async fn test_shorten_rejects_garbage_without_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    cargo_bin_cmd!("muri")
        .env("MURI_HOME", home.path())
        .env("MURI_BASE_URL", server.uri())
        .env("MURI_BLOCK_REAL_API", "1")
        .args(["shorten", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("valid URL"));
}
