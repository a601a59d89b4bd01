//! Content items thumbnails are generated for, and the keys they are cached under.

use crate::file_utils::sha256_hex;
use std::fmt;
use std::path::PathBuf;

/// Opaque string identifying a cacheable thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A file known to the sync server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Local persistence id, reported back when thumbnails get disabled.
    pub id: i64,
    /// Durable server-side identifier.
    pub remote_id: String,
    pub remote_path: String,
    pub mime_type: String,
    pub etag: String,
    /// Account the file belongs to.
    pub owner: String,
    pub space_id: Option<String>,
    pub needs_thumbnail_update: bool,
}

/// An image on the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub absolute_path: PathBuf,
}

/// A space "special" image (space header/avatar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceImage {
    pub id: String,
    pub webdav_url: String,
    pub etag: String,
    /// Mime type of the file backing the special.
    pub mime_type: String,
}

/// Immutable snapshot of what a slot wants a thumbnail for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    RemoteFile(RemoteFile),
    LocalFile(LocalFile),
    SpaceImage(SpaceImage),
}

impl ContentItem {
    /// Key the thumbnail is cached under.
    ///
    /// Local files are keyed by a hash of their path so the key is filesystem
    /// independent and stable across runs.
    pub fn cache_key(&self) -> CacheKey {
        match self {
            ContentItem::RemoteFile(file) => CacheKey::new(file.remote_id.clone()),
            ContentItem::LocalFile(file) => {
                CacheKey::new(sha256_hex(&file.absolute_path.to_string_lossy()))
            }
            ContentItem::SpaceImage(space) => CacheKey::new(space.id.clone()),
        }
    }

    /// Whether a cached thumbnail must be regenerated before use.
    pub fn needs_update(&self) -> bool {
        match self {
            ContentItem::RemoteFile(file) => file.needs_thumbnail_update,
            ContentItem::LocalFile(_) | ContentItem::SpaceImage(_) => false,
        }
    }

    /// Short label for log lines.
    pub fn describe(&self) -> String {
        match self {
            ContentItem::RemoteFile(file) => format!("remote file {}", file.remote_path),
            ContentItem::LocalFile(file) => format!("local file {}", file.absolute_path.display()),
            ContentItem::SpaceImage(space) => format!("space image {}", space.id),
        }
    }
}

impl From<RemoteFile> for ContentItem {
    fn from(file: RemoteFile) -> Self {
        ContentItem::RemoteFile(file)
    }
}

impl From<LocalFile> for ContentItem {
    fn from(file: LocalFile) -> Self {
        ContentItem::LocalFile(file)
    }
}

impl From<SpaceImage> for ContentItem {
    fn from(space: SpaceImage) -> Self {
        ContentItem::SpaceImage(space)
    }
}
