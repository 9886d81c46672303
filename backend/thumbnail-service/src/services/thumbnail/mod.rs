//! Thumbnail retrieval and generation
//!
//! This module provides:
//! - Resolution selection against the configured candidate set
//! - Encoder registry for the supported output formats
//! - Image sources for fetching originals from the content store
//! - Storage backends addressed by deterministic cache keys
//! - Manager coordinating cache lookups and coalesced generation

pub mod encoder;
pub mod manager;
pub mod processor;
pub mod resolution;
pub mod source;
pub mod storage;

pub use encoder::{Encoder, EncoderRegistry, GifEncoder, JpegEncoder, PngEncoder};
pub use manager::ThumbnailManager;
pub use processor::{ResizeMode, ThumbnailConfig, ThumbnailProcessor};
pub use resolution::{Resolution, Resolutions};
pub use source::{ImageSource, WebDavSource};
pub use storage::{CacheKey, FileSystemStorage, InMemoryStorage, KeyAttributes, Storage};
