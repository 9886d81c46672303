//! Thumbnail manager - cache-first retrieval with generate-on-miss
//!
//! Flow for one request:
//! 1. Resolve the encoder (unsupported formats fail before any I/O)
//! 2. Snap the requested size to a configured resolution
//! 3. Derive the cache key and check storage
//! 4. On a miss, fetch the source, resize, encode and store
//!
//! Step 4 is coalesced per cache key: concurrent requests for the same key
//! share one generation and all receive its result. The generation runs in
//! its own task, so it completes and populates storage even if every caller
//! stops waiting.

use super::encoder::{Encoder, EncoderRegistry};
use super::processor::ThumbnailProcessor;
use super::resolution::{Resolution, Resolutions};
use super::source::ImageSource;
use super::storage::{CacheKey, KeyAttributes, Storage};
use crate::error::{Result, ThumbnailError};
use crate::metrics;
use crate::models::{Thumbnail, ThumbnailRequest};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Awaitable handle on an in-flight generation
type Generation = Shared<BoxFuture<'static, Result<Thumbnail>>>;

/// Request resolved against configuration
struct Plan {
    key: CacheKey,
    resolution: Resolution,
    encoder: Arc<dyn Encoder>,
}

/// Thumbnail manager
#[derive(Clone)]
pub struct ThumbnailManager {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn Storage>,
    source: Arc<dyn ImageSource>,
    encoders: EncoderRegistry,
    resolutions: Resolutions,
    processor: Arc<ThumbnailProcessor>,
    in_flight: Mutex<HashMap<CacheKey, Generation>>,
}

impl ThumbnailManager {
    pub fn new(
        storage: Arc<dyn Storage>,
        source: Arc<dyn ImageSource>,
        encoders: EncoderRegistry,
        resolutions: Resolutions,
        processor: ThumbnailProcessor,
    ) -> Self {
        info!(
            storage = storage.name(),
            source = source.name(),
            formats = ?encoders.tokens(),
            resolutions = resolutions.as_slice().len(),
            "Thumbnail manager initialized"
        );

        Self {
            inner: Arc::new(Inner {
                storage,
                source,
                encoders,
                resolutions,
                processor: Arc::new(processor),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn resolutions(&self) -> &Resolutions {
        &self.inner.resolutions
    }

    /// Cache key a request maps to
    pub fn key_for(&self, request: &ThumbnailRequest) -> Result<CacheKey> {
        self.plan(request).map(|plan| plan.key)
    }

    /// Number of generations currently running
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Return the stored thumbnail for `request`, if any.
    ///
    /// Only reads storage: never fetches or generates. Storage errors are
    /// reported as a miss.
    pub async fn lookup(&self, request: &ThumbnailRequest) -> Result<Option<Thumbnail>> {
        let plan = self.plan(request)?;
        Ok(self.inner.cached(&plan.key, plan.encoder.mime_type()).await)
    }

    /// Return the thumbnail for `request`, generating and storing it on a miss
    pub async fn get_or_generate(&self, request: &ThumbnailRequest) -> Result<Thumbnail> {
        let plan = self.plan(request)?;

        if let Some(thumbnail) = self.inner.cached(&plan.key, plan.encoder.mime_type()).await {
            return Ok(thumbnail);
        }

        self.join_or_start(plan, request).await
    }

    fn plan(&self, request: &ThumbnailRequest) -> Result<Plan> {
        let encoder = self.inner.encoders.encoder_for(&request.format)?;

        if request.path.is_empty() {
            return Err(ThumbnailError::InvalidRequest("path is required".to_string()));
        }
        if request.width == 0 || request.height == 0 {
            return Err(ThumbnailError::InvalidRequest(format!(
                "width and height must be positive, got {}x{}",
                request.width, request.height
            )));
        }

        let resolution = self
            .inner
            .resolutions
            .closest_match(request.width, request.height);

        let key = self.inner.storage.build_key(&KeyAttributes {
            path: &request.path,
            etag: &request.etag,
            resolution,
            format: encoder.extension(),
        });

        Ok(Plan {
            key,
            resolution,
            encoder,
        })
    }

    fn join_or_start(&self, plan: Plan, request: &ThumbnailRequest) -> Generation {
        let mut in_flight = self.inner.in_flight.lock();

        if let Some(existing) = in_flight.get(&plan.key) {
            debug!(key = %plan.key, "Joining in-flight generation");
            metrics::record_coalesced();
            return existing.clone();
        }

        let (tx, rx) = oneshot::channel::<Result<Thumbnail>>();
        let generation: Generation = rx
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(ThumbnailError::Internal(
                        "thumbnail generation ended without a result".to_string(),
                    ))
                })
            })
            .boxed()
            .shared();

        in_flight.insert(plan.key.clone(), generation.clone());
        drop(in_flight);

        let inner = Arc::clone(&self.inner);
        let path = request.path.clone();
        let credential = request.credential.clone();

        tokio::spawn(async move {
            let guard = FlightGuard {
                inner: Arc::clone(&inner),
                key: plan.key.clone(),
            };
            let result = inner.generate(&plan, &path, &credential).await;
            // unregister first so later arrivals go back to storage
            drop(guard);
            let _ = tx.send(result);
        });

        generation
    }
}

impl Inner {
    async fn cached(&self, key: &CacheKey, mime_type: &'static str) -> Option<Thumbnail> {
        match self.storage.get(key).await {
            Ok(Some(data)) => {
                debug!(key = %key, "Thumbnail cache hit");
                metrics::record_cache_hit();
                Some(Thumbnail { data, mime_type })
            }
            Ok(None) => {
                debug!(key = %key, "Thumbnail cache miss");
                metrics::record_cache_miss();
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Thumbnail storage read failed, treating as miss");
                metrics::record_cache_error();
                None
            }
        }
    }

    async fn generate(&self, plan: &Plan, path: &str, credential: &str) -> Result<Thumbnail> {
        let mime_type = plan.encoder.mime_type();

        // a previous generation for this key may have finished since the caller checked
        if let Some(thumbnail) = self.cached(&plan.key, mime_type).await {
            return Ok(thumbnail);
        }

        let start = Instant::now();
        let rendered = self.render(plan, path, credential).await;
        metrics::record_generation(rendered.is_ok(), start.elapsed().as_secs_f64());

        let data = rendered.map_err(|e| {
            warn!(
                path = %path,
                key = %plan.key,
                error = %e,
                kind = e.kind(),
                "Failed to generate thumbnail"
            );
            e
        })?;

        // the bytes are served even if they cannot be cached
        if let Err(e) = self.storage.put(&plan.key, data.clone()).await {
            warn!(key = %plan.key, error = %e, "Failed to store thumbnail");
            metrics::record_store_failure();
        }

        info!(
            path = %path,
            key = %plan.key,
            width = plan.resolution.width,
            height = plan.resolution.height,
            size = data.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Thumbnail generated"
        );

        Ok(Thumbnail { data, mime_type })
    }

    async fn render(&self, plan: &Plan, path: &str, credential: &str) -> Result<Bytes> {
        let img = self.source.fetch(path, credential).await?;

        Arc::clone(&self.processor)
            .generate_async(Arc::new(img), plan.resolution, Arc::clone(&plan.encoder))
            .await
    }
}

/// Removes a key from the in-flight map when its generation ends, including by panic
struct FlightGuard {
    inner: Arc<Inner>,
    key: CacheKey,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight.lock().remove(&self.key);
    }
}

impl fmt::Debug for ThumbnailManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailManager")
            .field("storage", &self.inner.storage.name())
            .field("source", &self.inner.source.name())
            .field("encoders", &self.inner.encoders)
            .field("resolutions", &self.inner.resolutions)
            .finish()
    }
}
