/// Error types for Thumbnail Service
///
/// Every failure of the retrieval-and-generation pipeline is one of the
/// variants below. Errors are `Clone` because a single generation result is
/// handed to every request that coalesced onto it.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use thiserror::Error;

/// Result type for thumbnail-service operations
pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Pipeline error taxonomy
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ThumbnailError {
    /// No encoder is registered for the requested format token
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Request fields are missing or out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Source unauthorized: {0}")]
    SourceUnauthorized(String),

    #[error("Source unreachable: {0}")]
    SourceUnreachable(String),

    /// Fetched bytes are not a decodable image
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// Resize or encode failed
    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    /// Storage backend Get or Put failed
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Generation task was lost before producing a result
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ThumbnailError {
    /// Short machine-readable kind, used in responses and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::InvalidRequest(_) => "invalid_request",
            Self::SourceNotFound(_) => "source_not_found",
            Self::SourceUnauthorized(_) => "source_unauthorized",
            Self::SourceUnreachable(_) => "source_unreachable",
            Self::DecodeFailure(_) => "decode_failure",
            Self::EncodeFailure(_) => "encode_failure",
            Self::StorageFailure(_) => "storage_failure",
            Self::Internal(_) => "internal",
        }
    }
}

/// Failure modes of an [`ImageSource`](crate::services::thumbnail::ImageSource)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("unauthorized to read {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    Malformed(String),
}

impl From<SourceError> for ThumbnailError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(msg) => ThumbnailError::SourceNotFound(msg),
            SourceError::Unauthorized(msg) => ThumbnailError::SourceUnauthorized(msg),
            SourceError::Unreachable(msg) => ThumbnailError::SourceUnreachable(msg),
            SourceError::Malformed(msg) => ThumbnailError::DecodeFailure(msg),
        }
    }
}

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<StorageError> for ThumbnailError {
    fn from(err: StorageError) -> Self {
        ThumbnailError::StorageFailure(err.to_string())
    }
}

/// Startup configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid resolution '{0}', expected WIDTHxHEIGHT")]
    InvalidResolution(String),

    #[error("No thumbnail resolutions configured")]
    NoResolutions,

    #[error("Unknown storage backend '{0}'")]
    UnknownStorage(String),

    #[error("Unknown resize mode '{0}'")]
    UnknownResizeMode(String),

    #[error("Invalid WebDAV base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl ResponseError for ThumbnailError {
    fn status_code(&self) -> StatusCode {
        match self {
            ThumbnailError::UnsupportedFormat(_) | ThumbnailError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ThumbnailError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            ThumbnailError::SourceUnauthorized(_) => StatusCode::UNAUTHORIZED,
            ThumbnailError::SourceUnreachable(_) => StatusCode::BAD_GATEWAY,
            ThumbnailError::DecodeFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ThumbnailError::EncodeFailure(_)
            | ThumbnailError::StorageFailure(_)
            | ThumbnailError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}
