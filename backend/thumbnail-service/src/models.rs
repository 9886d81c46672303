/// Data models for thumbnail-service
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use validator::Validate;

/// One thumbnail request. Built per call and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ThumbnailRequest {
    /// File identifier in the remote content store
    pub path: String,
    pub width: u32,
    pub height: u32,
    /// Output format token, e.g. `png`
    pub format: String,
    /// Version tag of the source content
    pub etag: String,
    /// Forwarded to the image source as-is
    pub credential: String,
}

impl ThumbnailRequest {
    pub fn new(
        path: impl Into<String>,
        width: u32,
        height: u32,
        format: impl Into<String>,
        etag: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            format: format.into(),
            etag: etag.into(),
            credential: credential.into(),
        }
    }
}

// credential stays out of logs
impl fmt::Debug for ThumbnailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailRequest")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("etag", &self.etag)
            .finish_non_exhaustive()
    }
}

/// Encoded thumbnail ready to be served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub data: Bytes,
    pub mime_type: &'static str,
}

/// Query string of `GET /api/v1/thumbnails`
#[derive(Debug, Deserialize, Validate)]
pub struct ThumbnailQuery {
    #[validate(length(min = 1, message = "path is required"))]
    pub path: String,
    #[serde(default)]
    pub etag: String,
    #[validate(range(min = 1, message = "width must be positive"))]
    pub width: u32,
    #[validate(range(min = 1, message = "height must be positive"))]
    pub height: u32,
    #[validate(length(min = 1, message = "format is required"))]
    pub format: String,
}

impl ThumbnailQuery {
    pub fn into_request(self, credential: String) -> ThumbnailRequest {
        ThumbnailRequest {
            path: self.path,
            width: self.width,
            height: self.height,
            format: self.format,
            etag: self.etag,
            credential,
        }
    }
}
