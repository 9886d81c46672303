//! Image sources
//!
//! An [`ImageSource`] fetches and decodes the original image for a path in
//! the remote content store, authenticating with the caller's credential.

use crate::error::SourceError;
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches source images from the remote content store
#[async_trait]
pub trait ImageSource: Send + Sync + 'static {
    /// Download and decode the image at `path` using `credential`
    async fn fetch(&self, path: &str, credential: &str) -> Result<DynamicImage, SourceError>;

    fn name(&self) -> &'static str;
}

/// Decode fetched bytes on the blocking pool
pub async fn decode(path: &str, data: Bytes) -> Result<DynamicImage, SourceError> {
    let path_owned = path.to_string();
    tokio::task::spawn_blocking(move || {
        image::load_from_memory(&data).map_err(|e| {
            SourceError::Malformed(format!("could not decode the image \"{path_owned}\": {e}"))
        })
    })
    .await
    .map_err(|e| SourceError::Malformed(format!("decode task for \"{path}\" panicked: {e}")))?
}

/// WebDAV backed source. Files are read with a plain `GET` below `base_url`.
#[derive(Debug, Clone)]
pub struct WebDavSource {
    base_url: Url,
    http_client: Client,
}

impl WebDavSource {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, SourceError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unreachable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` path joined with `file`
    pub fn url_for(&self, file: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            file.trim_start_matches('/')
        );
        url.set_path(&joined);
        url
    }
}

#[async_trait]
impl ImageSource for WebDavSource {
    async fn fetch(&self, path: &str, credential: &str) -> Result<DynamicImage, SourceError> {
        if credential.trim().is_empty() {
            return Err(SourceError::Unauthorized(format!(
                "{path}: authorization is missing"
            )));
        }

        let url = self.url_for(path);
        debug!(path = %path, url = %url, "Downloading source image");

        let response = self
            .http_client
            .get(url)
            .header(header::AUTHORIZATION, credential)
            .send()
            .await
            .map_err(|e| SourceError::Unreachable(format!("could not get the image \"{path}\": {e}")))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(SourceError::NotFound(path.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Unauthorized(path.to_string()))
            }
            status => {
                return Err(SourceError::Unreachable(format!(
                    "could not get the image \"{path}\": request returned with status {status}"
                )))
            }
        }

        let data = response.bytes().await.map_err(|e| {
            SourceError::Unreachable(format!("failed to read the image \"{path}\": {e}"))
        })?;

        debug!(path = %path, size = data.len(), "Downloaded source image");
        decode(path, data).await
    }

    fn name(&self) -> &'static str {
        "webdav"
    }
}
