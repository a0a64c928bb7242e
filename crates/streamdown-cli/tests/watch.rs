//! Integration tests for consuming an HTTP event stream.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{SSE_HELLO, sse_response, text_sse};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_home() -> TempDir {
    TempDir::new().expect("create temp streamdown home")
}

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn test_watch_renders_stream() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/analysis/42/stream"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_response(&text_sse("Streaming **works**\n- one\n- two")))
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("streamdown")
        .env("STREAMDOWN_HOME", home.path())
        .args(["watch", &format!("{}/analysis/42/stream", mock_server.uri())])
        .assert()
        .success()
        .stdout("Streaming works\n• one\n• two\n");
}

#[tokio::test]
async fn test_watch_sends_bearer_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stream"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(sse_response(SSE_HELLO))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("streamdown")
        .env("STREAMDOWN_HOME", home.path())
        .env("STREAMDOWN_TOKEN", "test-token")
        .args(["watch", &format!("{}/stream", mock_server.uri())])
        .assert()
        .success()
        .stdout("Hello world!\n");
}

#[tokio::test]
async fn test_watch_bad_status_is_transport_failure() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("streamdown")
        .env("STREAMDOWN_HOME", home.path())
        .args(["watch", &format!("{}/stream", mock_server.uri())])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Analysis service returned 503"))
        .stderr(predicate::str::contains("maintenance"));
}
