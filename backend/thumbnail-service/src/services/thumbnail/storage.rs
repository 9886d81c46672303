//! Thumbnail storage
//!
//! Content-addressed byte store for generated thumbnails. Keys are derived
//! from the attributes that identify an artifact (source path, ETag,
//! resolution, format), so artifacts are never overwritten with different
//! content: a new ETag simply addresses a new key.

use super::resolution::Resolution;
use crate::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{self, AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

/// Key schema version - increment when changing key formats
pub const KEY_VERSION: u32 = 1;

/// Hex segments longer than this are split into nested directories on disk
const MAX_SEGMENT_LEN: usize = 64;

/// Attributes that identify one stored artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAttributes<'a> {
    pub path: &'a str,
    pub etag: &'a str,
    pub resolution: Resolution,
    /// Canonical format extension, e.g. `png`
    pub format: &'a str,
}

/// Deterministic address of a stored artifact
///
/// Format: `v1/{hex(path)}/{hex(etag)}/{W}x{H}.{format}`
///
/// Path and ETag are hex encoded, so neither can contain a separator and
/// distinct attribute tuples always produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn from_attributes(attrs: &KeyAttributes<'_>) -> Self {
        Self(format!(
            "v{}/{}/{}/{}.{}",
            KEY_VERSION,
            hex::encode(attrs.path.as_bytes()),
            hex::encode(attrs.etag.as_bytes()),
            attrs.resolution,
            hex_safe_format(attrs.format),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative on-disk location of this key, with long hex segments split up
    fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.0.split('/') {
            if segment.is_empty() {
                path.push("_");
                continue;
            }
            if segment.len() <= MAX_SEGMENT_LEN {
                path.push(segment);
                continue;
            }
            // hex segments are ASCII, byte offsets are char boundaries
            let mut rest = segment;
            while rest.len() > MAX_SEGMENT_LEN {
                let (head, tail) = rest.split_at(MAX_SEGMENT_LEN);
                path.push(head);
                rest = tail;
            }
            // a terminator keeps a split segment from aliasing a shorter unsplit one
            path.push(format!("{rest}_"));
        }
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format tokens come from the encoder registry; anything outside `[a-z0-9]`
/// is hex encoded so the key stays a plain relative path.
fn hex_safe_format(format: &str) -> String {
    if !format.is_empty()
        && format
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        format.to_string()
    } else {
        format!("x{}", hex::encode(format.as_bytes()))
    }
}

/// Storage backend for generated thumbnails
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Derive the key for an artifact
    fn build_key(&self, attrs: &KeyAttributes<'_>) -> CacheKey {
        CacheKey::from_attributes(attrs)
    }

    /// Fetch stored bytes, `None` when absent
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StorageError>;

    /// Store bytes under `key`. Writing the same bytes twice is harmless.
    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), StorageError>;

    fn name(&self) -> &'static str;
}

/// Process-local storage, lives as long as the service
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: DashMap<CacheKey, Bytes>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StorageError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), StorageError> {
        self.entries.insert(key.clone(), data);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Storage rooted in a local directory
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

#[async_trait]
impl Storage for FileSystemStorage {
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, StorageError> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let dir = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(key.to_string()))?;
        fs::create_dir_all(dir).await?;

        // write beside the target, then rename so readers never see partial files
        let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &path).await
        };

        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(key = %key, size = data.len(), "Stored thumbnail on disk");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
