//! Integration tests for the authenticated request client's retry policy.

mod helpers;

use std::time::Duration;

use serde_json::json;
use sturdy_core::error::ErrorKind;

use helpers::{GOOD_TOKEN, TestServer};

#[tokio::test]
async fn test_valid_token_is_a_single_call() {
    let server = TestServer::spawn(true, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some(GOOD_TOKEN)).unwrap();

    let body = api.get("/judge/results").await.unwrap();
    assert_eq!(body["verdict"], json!("AC"));
    assert_eq!(server.api_call_count(), 1);
    assert_eq!(server.refresh_call_count(), 0);
}

#[tokio::test]
async fn test_401_with_successful_refresh_retries_exactly_once() {
    let server = TestServer::spawn(true, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some("stale-token")).unwrap();

    let body = api.get("/judge/results").await.unwrap();
    assert_eq!(body["verdict"], json!("AC"));

    // Original call + one retry, one refresh in between.
    assert_eq!(server.api_call_count(), 2);
    assert_eq!(server.refresh_call_count(), 1);
    assert_eq!(auth.access_token().as_deref(), Some(GOOD_TOKEN));
}

#[tokio::test]
async fn test_401_with_failed_refresh_clears_credentials() {
    let server = TestServer::spawn(false, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some("stale-token")).unwrap();

    let err = api.get("/judge/results").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Authentication);
    assert!(err.message.contains("Authentication expired"));

    // No retry happened, and the stored token is gone.
    assert_eq!(server.api_call_count(), 1);
    assert_eq!(server.refresh_call_count(), 1);
    assert_eq!(auth.access_token(), None);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    // A slow refresh endpoint widens the in-flight window so both requests
    // observe the same pending exchange.
    let server = TestServer::spawn(true, Duration::from_millis(200)).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some("stale-token")).unwrap();

    let (a, b) = tokio::join!(api.get("/judge/results"), api.get("/judge/results"));
    assert_eq!(a.unwrap()["verdict"], json!("AC"));
    assert_eq!(b.unwrap()["verdict"], json!("AC"));

    assert_eq!(server.refresh_call_count(), 1);
    // Two originals + two retries.
    assert_eq!(server.api_call_count(), 4);
}

#[tokio::test]
async fn test_plain_text_numeric_body_coerces_to_number() {
    let server = TestServer::spawn(true, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some(GOOD_TOKEN)).unwrap();

    let body = api.get("/next-id").await.unwrap();
    assert_eq!(body, json!(1234));
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let server = TestServer::spawn(true, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some(GOOD_TOKEN)).unwrap();

    let err = api.get("/missing").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Http);
    assert_eq!(err.message, "Problem not found");
}

#[tokio::test]
async fn test_upload_follows_the_same_retry_contract() {
    let server = TestServer::spawn(true, Duration::ZERO).await;
    let dir = tempfile::tempdir().unwrap();
    let (auth, api) = server.client(&dir);

    auth.set_access_token(Some("stale-token")).unwrap();

    let form = codesturdy::UploadForm::new()
        .text("problemId", "42")
        .file(codesturdy::FilePart {
            field: "solution".to_string(),
            file_name: "main.py".to_string(),
            mime: "text/x-python".to_string(),
            bytes: b"print(1)".to_vec(),
        });

    let body = api.upload("/submissions", &form).await.unwrap();
    assert_eq!(body["submissionId"], json!(512));
    assert_eq!(server.api_call_count(), 2);
    assert_eq!(server.refresh_call_count(), 1);
}
