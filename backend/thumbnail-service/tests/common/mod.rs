//! Test doubles for the thumbnail pipeline
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thumbnail_service::error::{SourceError, StorageError};
use thumbnail_service::services::thumbnail::source::decode;
use thumbnail_service::services::thumbnail::{
    CacheKey, EncoderRegistry, ImageSource, InMemoryStorage, JpegEncoder, PngEncoder, Resolutions,
    Storage, ThumbnailManager, ThumbnailProcessor,
};

/// Encoded JPEG of a solid-colour square
pub fn jpeg_bytes(size: u32) -> Bytes {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(size, size, Rgb([40, 120, 200])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(90))
        .expect("encode test jpeg");
    Bytes::from(buf)
}

/// Source serving fixed bytes (or a fixed error) and counting fetches
pub struct FakeSource {
    response: Result<Bytes, SourceError>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl FakeSource {
    pub fn serving(data: Bytes) -> Self {
        Self {
            response: Ok(data),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: SourceError) -> Self {
        Self {
            response: Err(err),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSource for FakeSource {
    async fn fetch(&self, path: &str, _credential: &str) -> Result<DynamicImage, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.response {
            Ok(data) => decode(path, data.clone()).await,
            Err(e) => Err(e.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// In-memory storage that counts calls and can be told to fail
#[derive(Default)]
pub struct CountingStorage {
    pub entries: InMemoryStorage,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_get: bool,
    fail_put: bool,
}

impl CountingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_get: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for CountingStorage {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_get {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk on fire",
            )));
        }
        self.entries.get(key).await
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "read-only filesystem",
            )));
        }
        self.entries.put(key, data).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Only `png` and `jpeg` registered
pub fn png_jpeg_registry() -> EncoderRegistry {
    EncoderRegistry::new()
        .register("png", Arc::new(PngEncoder))
        .register("jpeg", Arc::new(JpegEncoder::default()))
}

pub fn resolutions() -> Resolutions {
    Resolutions::parse(["64x64", "128x128", "256x256"]).expect("valid resolutions")
}

pub fn manager(storage: Arc<CountingStorage>, source: Arc<FakeSource>) -> ThumbnailManager {
    ThumbnailManager::new(
        storage,
        source,
        png_jpeg_registry(),
        resolutions(),
        ThumbnailProcessor::default(),
    )
}
