/// WebDAV source tests against a mock content store
mod common;

use common::jpeg_bytes;
use std::time::Duration;
use thumbnail_service::error::SourceError;
use thumbnail_service::services::thumbnail::{ImageSource, WebDavSource};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CREDENTIAL: &str = "Bearer secret-token";

async fn source_for(server: &MockServer) -> WebDavSource {
    let base = Url::parse(&format!("{}/remote.php/webdav/", server.uri())).unwrap();
    WebDavSource::new(base, Duration::from_secs(5)).unwrap()
}

async fn respond_with(status: u16) -> Result<image::DynamicImage, SourceError> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote.php/webdav/Photos/a.jpg"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    source_for(&server)
        .await
        .fetch("/Photos/a.jpg", CREDENTIAL)
        .await
}

#[tokio::test]
async fn test_fetch_decodes_image_and_forwards_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote.php/webdav/Photos/a.jpg"))
        .and(header("authorization", CREDENTIAL))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes(40).to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let img = source_for(&server)
        .await
        .fetch("/Photos/a.jpg", CREDENTIAL)
        .await
        .unwrap();

    assert_eq!((img.width(), img.height()), (40, 40));
}

#[tokio::test]
async fn test_not_found() {
    let err = respond_with(404).await.unwrap_err();
    assert_eq!(err, SourceError::NotFound("/Photos/a.jpg".to_string()));
}

#[tokio::test]
async fn test_unauthorized_and_forbidden() {
    for status in [401, 403] {
        let err = respond_with(status).await.unwrap_err();
        assert!(matches!(err, SourceError::Unauthorized(_)), "status {status}");
    }
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let err = respond_with(500).await.unwrap_err();
    assert!(matches!(err, SourceError::Unreachable(msg) if msg.contains("500")));
}

#[tokio::test]
async fn test_non_image_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/remote.php/webdav/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>sign in</html>"))
        .mount(&server)
        .await;

    let err = source_for(&server)
        .await
        .fetch("a.jpg", CREDENTIAL)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Malformed(_)));
}

#[tokio::test]
async fn test_missing_credential_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = source_for(&server)
        .await
        .fetch("/a.jpg", "  ")
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Unauthorized(_)));
}

#[tokio::test]
async fn test_unreachable_host() {
    let server = MockServer::start().await;
    let source = source_for(&server).await;
    drop(server);

    let err = source.fetch("/a.jpg", CREDENTIAL).await.unwrap_err();
    assert!(matches!(err, SourceError::Unreachable(_)));
}
