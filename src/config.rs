//! Thumbnail pipeline configuration.
//!
//! Fixed constants for the on-disk cache plus a `ThumbnailConfig` that hosts can
//! load from a TOML file or build in code.

use crate::error::{Result, ThumbnailError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the directory holding cached thumbnails.
pub const CACHE_FOLDER: &str = "thumbnailCache";

/// Aggregate size cap of the disk cache (10 MiB).
pub const DISK_CACHE_SIZE: u64 = 1024 * 1024 * 10;

/// JPEG quality used when persisting thumbnails.
pub const COMPRESS_QUALITY: u8 = 70;

/// Supported image file extensions for local thumbnails.
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Mime type that triggers compositing over the opaque background.
pub const PNG_MIME_TYPE: &str = "image/png";

/// Default number of background generation workers.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Server account used to build preview URLs for remote files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server base URI, e.g. `https://cloud.example.com`.
    pub base_url: String,
    /// Account user id, appended to the files WebDAV root.
    pub user_id: String,
}

impl ServerConfig {
    /// WebDAV root for the account's personal files.
    pub fn files_webdav_url(&self) -> String {
        format!(
            "{}/remote.php/dav/files/{}",
            self.base_url.trim_end_matches('/'),
            self.user_id
        )
    }
}

/// Settings the disk cache is opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub capacity_bytes: u64,
    pub quality: u8,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Directory where thumbnails are persisted.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_disk_cache_size")]
    pub disk_cache_size: u64,
    #[serde(default = "default_compress_quality")]
    pub compress_quality: u8,
    /// Square edge of file thumbnails, in pixels.
    #[serde(default = "default_thumbnail_px")]
    pub thumbnail_px: u32,
    /// Height of space header images; the request asks for twice this.
    #[serde(default = "default_space_thumbnail_px")]
    pub space_thumbnail_px: u32,
    /// Opaque RGB colour transparent PNG thumbnails are flattened onto.
    #[serde(default = "default_background_color")]
    pub background_color: [u8; 3],
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Upper bound for a single decode allocation.
    #[serde(default = "default_max_decode_bytes")]
    pub max_decode_bytes: u64,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sync-thumbnails")
        .join(CACHE_FOLDER)
}

fn default_disk_cache_size() -> u64 {
    DISK_CACHE_SIZE
}

fn default_compress_quality() -> u8 {
    COMPRESS_QUALITY
}

fn default_thumbnail_px() -> u32 {
    80
}

fn default_space_thumbnail_px() -> u32 {
    120
}

fn default_background_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_worker_threads() -> usize {
    DEFAULT_WORKER_THREADS
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_max_decode_bytes() -> u64 {
    256 * 1024 * 1024
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            disk_cache_size: default_disk_cache_size(),
            compress_quality: default_compress_quality(),
            thumbnail_px: default_thumbnail_px(),
            space_thumbnail_px: default_space_thumbnail_px(),
            background_color: default_background_color(),
            worker_threads: default_worker_threads(),
            http_timeout_secs: default_http_timeout_secs(),
            max_decode_bytes: default_max_decode_bytes(),
            server: None,
        }
    }
}

impl ThumbnailConfig {
    /// Loads configuration from a TOML file, or returns defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            ThumbnailError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&contents).map_err(|e| {
            ThumbnailError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file the user asked for by name; a missing file is an error.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ThumbnailError::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        Self::load(path)
    }

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.thumbnail_px == 0 || self.space_thumbnail_px == 0 {
            return Err(ThumbnailError::Config(
                "thumbnail sizes must be non-zero".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(ThumbnailError::Config(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if !(1..=100).contains(&self.compress_quality) {
            return Err(ThumbnailError::Config(format!(
                "compress_quality must be 1-100, got {}",
                self.compress_quality
            )));
        }
        Ok(())
    }

    /// Settings for opening the disk cache.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            dir: self.cache_dir.clone(),
            capacity_bytes: self.disk_cache_size,
            quality: self.compress_quality,
        }
    }
}
