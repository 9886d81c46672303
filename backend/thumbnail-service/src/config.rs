/// Configuration management for thumbnail-service
///
/// Loads configuration from `THUMBNAIL_*` environment variables with sensible
/// defaults. Everything is read once at startup and treated as read-only.
use crate::error::ConfigError;
use crate::services::thumbnail::{
    EncoderRegistry, FileSystemStorage, ImageSource, InMemoryStorage, ResizeMode, Resolutions,
    Storage, ThumbnailConfig, ThumbnailManager, ThumbnailProcessor, WebDavSource,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const ENV_PREFIX: &str = "THUMBNAIL_";

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub thumbnail: ThumbnailSettings,
    pub storage: StorageConfig,
    pub webdav: WebDavConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct ThumbnailSettings {
    pub resolutions: Resolutions,
    pub jpeg_quality: u8,
    pub resize_mode: ResizeMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    FileSystem { root: PathBuf },
    Memory,
}

#[derive(Clone, Debug)]
pub struct WebDavConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

/// Environment as read by envy, before validation
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_resolutions")]
    resolutions: Vec<String>,
    #[serde(default = "default_storage")]
    storage: String,
    #[serde(default = "default_filesystem_root")]
    filesystem_root: PathBuf,
    #[serde(default = "default_webdav_base_url")]
    webdav_base_url: String,
    #[serde(default = "default_source_timeout_secs")]
    source_timeout_secs: u64,
    #[serde(default = "default_jpeg_quality")]
    jpeg_quality: u8,
    #[serde(default = "default_resize_mode")]
    resize_mode: String,
    #[serde(default = "default_log_format")]
    log_format: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9185
}

fn default_resolutions() -> Vec<String> {
    ["16x16", "32x32", "64x64", "128x128", "1920x1080", "3840x2160", "7680x4320"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_storage() -> String {
    "filesystem".to_string()
}

fn default_filesystem_root() -> PathBuf {
    PathBuf::from("/var/tmp/thumbnails")
}

fn default_webdav_base_url() -> String {
    "https://localhost:9200/remote.php/webdav/".to_string()
}

fn default_source_timeout_secs() -> u64 {
    30
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_resize_mode() -> String {
    "fill".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let raw: RawConfig = envy::prefixed(ENV_PREFIX).from_env()?;
        Self::from_raw(raw)
    }

    /// Load configuration from explicit `(name, value)` pairs
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RawConfig = envy::prefixed(ENV_PREFIX).from_iter(vars)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let resolutions = Resolutions::parse(&raw.resolutions)?;

        if !(1..=100).contains(&raw.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                field: "THUMBNAIL_JPEG_QUALITY",
                reason: format!("{} is outside 1-100", raw.jpeg_quality),
            });
        }

        let resize_mode: ResizeMode = raw
            .resize_mode
            .parse()
            .map_err(ConfigError::UnknownResizeMode)?;

        let storage = match raw.storage.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => StorageConfig::FileSystem {
                root: raw.filesystem_root,
            },
            "memory" | "inmemory" => StorageConfig::Memory,
            other => return Err(ConfigError::UnknownStorage(other.to_string())),
        };

        let log_format = match raw.log_format.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" | "" => LogFormat::Text,
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "THUMBNAIL_LOG_FORMAT",
                    reason: format!("unknown format '{other}'"),
                })
            }
        };

        if raw.source_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "THUMBNAIL_SOURCE_TIMEOUT_SECS",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            app: AppConfig {
                host: raw.host,
                port: raw.port,
                log_format,
            },
            thumbnail: ThumbnailSettings {
                resolutions,
                jpeg_quality: raw.jpeg_quality,
                resize_mode,
            },
            storage,
            webdav: WebDavConfig {
                base_url: Url::parse(&raw.webdav_base_url)?,
                timeout: Duration::from_secs(raw.source_timeout_secs),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    /// Storage backend selected by configuration
    pub fn build_storage(&self) -> Arc<dyn Storage> {
        match &self.storage {
            StorageConfig::FileSystem { root } => Arc::new(FileSystemStorage::new(root.clone())),
            StorageConfig::Memory => Arc::new(InMemoryStorage::new()),
        }
    }

    /// Image source for the configured content store
    pub fn build_source(&self) -> Result<Arc<dyn ImageSource>, ConfigError> {
        let source = WebDavSource::new(self.webdav.base_url.clone(), self.webdav.timeout)
            .map_err(|e| ConfigError::InvalidValue {
                field: "THUMBNAIL_WEBDAV_BASE_URL",
                reason: e.to_string(),
            })?;
        Ok(Arc::new(source))
    }

    /// Wire the manager from configuration
    pub fn build_manager(&self) -> Result<ThumbnailManager, ConfigError> {
        let processor = ThumbnailProcessor::new(ThumbnailConfig {
            resize_mode: self.thumbnail.resize_mode,
            ..ThumbnailConfig::default()
        });

        Ok(ThumbnailManager::new(
            self.build_storage(),
            self.build_source()?,
            EncoderRegistry::with_defaults(self.thumbnail.jpeg_quality),
            self.thumbnail.resolutions.clone(),
            processor,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::thumbnail::Resolution;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(vec![]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:9185");
        assert_eq!(config.app.log_format, LogFormat::Text);
        assert_eq!(config.thumbnail.resolutions.as_slice().len(), 7);
        assert_eq!(config.thumbnail.jpeg_quality, 85);
        assert_eq!(config.thumbnail.resize_mode, ResizeMode::Fill);
        assert_eq!(
            config.storage,
            StorageConfig::FileSystem {
                root: PathBuf::from("/var/tmp/thumbnails")
            }
        );
        assert_eq!(config.webdav.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(vars(&[
            ("THUMBNAIL_PORT", "8080"),
            ("THUMBNAIL_RESOLUTIONS", "64x64,128x128,256x256"),
            ("THUMBNAIL_STORAGE", "memory"),
            ("THUMBNAIL_WEBDAV_BASE_URL", "http://dav.internal/files/"),
            ("THUMBNAIL_JPEG_QUALITY", "70"),
            ("THUMBNAIL_RESIZE_MODE", "stretch"),
            ("THUMBNAIL_LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert_eq!(config.app.port, 8080);
        assert_eq!(
            config.thumbnail.resolutions.as_slice(),
            &[
                Resolution::new(64, 64),
                Resolution::new(128, 128),
                Resolution::new(256, 256)
            ]
        );
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.webdav.base_url.as_str(), "http://dav.internal/files/");
        assert_eq!(config.thumbnail.jpeg_quality, 70);
        assert_eq!(config.thumbnail.resize_mode, ResizeMode::Stretch);
        assert_eq!(config.app.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_resolution_fails_at_startup() {
        let err = Config::from_vars(vars(&[("THUMBNAIL_RESOLUTIONS", "64x64,big")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidResolution(token) if token == "big"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_vars(vars(&[("THUMBNAIL_STORAGE", "s3")])),
            Err(ConfigError::UnknownStorage(_))
        ));
        assert!(matches!(
            Config::from_vars(vars(&[("THUMBNAIL_JPEG_QUALITY", "0")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_vars(vars(&[("THUMBNAIL_RESIZE_MODE", "letterbox")])),
            Err(ConfigError::UnknownResizeMode(_))
        ));
        assert!(matches!(
            Config::from_vars(vars(&[("THUMBNAIL_WEBDAV_BASE_URL", "not a url")])),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_build_manager_from_memory_config() {
        let config = Config::from_vars(vars(&[
            ("THUMBNAIL_STORAGE", "memory"),
            ("THUMBNAIL_RESOLUTIONS", "32x32"),
        ]))
        .unwrap();

        let manager = config.build_manager().unwrap();
        assert_eq!(manager.resolutions().as_slice(), &[Resolution::new(32, 32)]);
        assert_eq!(manager.in_flight(), 0);
    }
}
