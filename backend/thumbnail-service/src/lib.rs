//! Thumbnail Service
//!
//! Serves resized previews of images held in the remote content store.
//! Thumbnails are generated on first request, cached under a key derived
//! from the source path, ETag, resolution and format, and served from the
//! cache afterwards.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod services;

// Public re-exports
pub use config::Config;
pub use error::{Result, ThumbnailError};
pub use models::{Thumbnail, ThumbnailRequest};
pub use services::ThumbnailManager;
