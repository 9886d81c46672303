//! Output encoders
//!
//! Maps a requested format token (`png`, `jpg`, ...) to the encoder producing
//! that format and its MIME type. Lookups happen before any network or
//! storage access so that unsupported formats are rejected cheaply.

use crate::error::{Result, ThumbnailError};
use image::{DynamicImage, ImageOutputFormat};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Encodes a decoded image into one output format
pub trait Encoder: Send + Sync {
    /// Encode `img` into the target format
    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>>;

    /// MIME type of the produced bytes
    fn mime_type(&self) -> &'static str;

    /// Canonical file extension, also used when deriving cache keys
    fn extension(&self) -> &'static str;
}

fn write_image(img: &DynamicImage, format: ImageOutputFormat, name: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| ThumbnailError::EncodeFailure(format!("Failed to encode {name}: {e}")))?;
    Ok(buf)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PngEncoder;

impl Encoder for PngEncoder {
    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        write_image(img, ImageOutputFormat::Png, "PNG")
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JpegEncoder {
    /// JPEG quality (1-100)
    pub quality: u8,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self { quality: 85 }
    }
}

impl Encoder for JpegEncoder {
    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        write_image(&rgb, ImageOutputFormat::Jpeg(self.quality), "JPEG")
    }

    fn mime_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GifEncoder;

impl Encoder for GifEncoder {
    fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
        write_image(&rgba, ImageOutputFormat::Gif, "GIF")
    }

    fn mime_type(&self) -> &'static str {
        "image/gif"
    }

    fn extension(&self) -> &'static str {
        "gif"
    }
}

/// Format token to encoder mapping. Tokens are matched case-insensitively.
#[derive(Clone, Default)]
pub struct EncoderRegistry {
    encoders: HashMap<String, Arc<dyn Encoder>>,
}

impl EncoderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `png`, `jpeg`/`jpg` and `gif`
    pub fn with_defaults(jpeg_quality: u8) -> Self {
        let jpeg: Arc<dyn Encoder> = Arc::new(JpegEncoder {
            quality: jpeg_quality,
        });

        Self::new()
            .register("png", Arc::new(PngEncoder))
            .register("jpeg", jpeg.clone())
            .register("jpg", jpeg)
            .register("gif", Arc::new(GifEncoder))
    }

    /// Register `encoder` under `token`, replacing any previous entry
    pub fn register(mut self, token: &str, encoder: Arc<dyn Encoder>) -> Self {
        self.encoders.insert(token.to_ascii_lowercase(), encoder);
        self
    }

    /// Look up the encoder for a format token
    pub fn encoder_for(&self, token: &str) -> Result<Arc<dyn Encoder>> {
        self.encoders
            .get(&token.trim().to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ThumbnailError::UnsupportedFormat(token.to_string()))
    }

    /// Registered tokens, sorted
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.encoders.keys().map(String::as_str).collect();
        tokens.sort_unstable();
        tokens
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("tokens", &self.tokens())
            .finish()
    }
}
