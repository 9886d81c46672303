//! Thumbnail processor - resizes decoded images and encodes them
//!
//! Takes a decoded source image, resizes it to exactly the target resolution
//! and encodes it with the requested encoder.
//!
//! Uses `spawn_blocking` for CPU-intensive operations to avoid blocking the async runtime.

use super::encoder::Encoder;
use super::resolution::Resolution;
use crate::error::{Result, ThumbnailError};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// How the source aspect ratio is reconciled with the target resolution.
/// Both modes produce exactly `width` x `height` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Scale to cover the target, then centre-crop the overflow
    #[default]
    Fill,
    /// Scale each axis independently, ignoring the aspect ratio
    Stretch,
}

impl FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fill" => Ok(Self::Fill),
            "stretch" => Ok(Self::Stretch),
            other => Err(other.to_string()),
        }
    }
}

/// Configuration for thumbnail generation
#[derive(Clone, Debug)]
pub struct ThumbnailConfig {
    pub resize_mode: ResizeMode,
    pub filter: FilterType,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            resize_mode: ResizeMode::Fill,
            filter: FilterType::Lanczos3,
        }
    }
}

/// Thumbnail processor
#[derive(Clone, Debug, Default)]
pub struct ThumbnailProcessor {
    config: ThumbnailConfig,
}

impl ThumbnailProcessor {
    /// Create a new processor with the given configuration
    pub fn new(config: ThumbnailConfig) -> Self {
        Self { config }
    }

    /// Resize `img` to `target` and encode it (blocking version)
    ///
    /// **Note:** This method performs CPU-intensive operations and should not be called
    /// directly from async code. Use `generate_async` instead.
    pub fn generate(
        &self,
        img: &DynamicImage,
        target: Resolution,
        encoder: &dyn Encoder,
    ) -> Result<Bytes> {
        let (orig_w, orig_h) = img.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(ThumbnailError::EncodeFailure(
                "Source image has no pixels".to_string(),
            ));
        }

        let resized = self.resize(img, target);
        let data = encoder.encode(&resized)?;

        debug!(
            original_width = orig_w,
            original_height = orig_h,
            width = target.width,
            height = target.height,
            format = encoder.extension(),
            size = data.len(),
            "Thumbnail generated"
        );

        Ok(Bytes::from(data))
    }

    /// Generate a thumbnail on the blocking thread pool
    pub async fn generate_async(
        self: Arc<Self>,
        img: Arc<DynamicImage>,
        target: Resolution,
        encoder: Arc<dyn Encoder>,
    ) -> Result<Bytes> {
        tokio::task::spawn_blocking(move || self.generate(&img, target, encoder.as_ref()))
            .await
            .map_err(|e| ThumbnailError::Internal(format!("Thumbnail task panicked: {e}")))?
    }

    fn resize(&self, img: &DynamicImage, target: Resolution) -> DynamicImage {
        if img.dimensions() == (target.width, target.height) {
            return img.clone();
        }

        match self.config.resize_mode {
            ResizeMode::Fill => img.resize_to_fill(target.width, target.height, self.config.filter),
            ResizeMode::Stretch => {
                img.resize_exact(target.width, target.height, self.config.filter)
            }
        }
    }
}
