//! Disk cache for generated thumbnails.
//!
//! Thumbnails are persisted as JPEG files named after a hash of their key and
//! tracked with an LRU index bounded by total bytes on disk. Recency is mirrored
//! into file mtimes so the order survives a restart.

use crate::config::CacheSettings;
use crate::content::CacheKey;
use crate::error::{Result, ThumbnailError};
use crate::file_utils::sha256_hex;
use filetime::FileTime;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use log::{debug, info, warn};
use lru::LruCache;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

const ENTRY_EXTENSION: &str = "jpg";
const TMP_EXTENSION: &str = "tmp";

/// Size-bounded, disk-persisted key to image mapping with LRU eviction.
pub struct DiskImageCache {
    dir: PathBuf,
    capacity: u64,
    quality: u8,
    /// Entry file stem -> size in bytes.
    index: LruCache<String, u64>,
    total_bytes: u64,
}

impl DiskImageCache {
    /// Opens (creating if needed) the cache directory and indexes existing entries.
    pub fn open(settings: &CacheSettings) -> Result<Self> {
        fs::create_dir_all(&settings.dir).map_err(|e| {
            ThumbnailError::StoreUnavailable(format!("{}: {}", settings.dir.display(), e))
        })?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&settings.dir)?.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some(TMP_EXTENSION) => {
                    // Leftover from an interrupted write.
                    if let Err(e) = fs::remove_file(&path) {
                        debug!("Failed to delete stale {}: {}", path.display(), e);
                    }
                }
                Some(ENTRY_EXTENSION) => {
                    let Ok(meta) = entry.metadata() else { continue };
                    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    if meta.is_file() {
                        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                        entries.push((modified, stem.to_string(), meta.len()));
                    }
                }
                _ => {}
            }
        }
        entries.sort();

        let mut cache = Self {
            dir: settings.dir.clone(),
            capacity: settings.capacity_bytes,
            quality: settings.quality,
            index: LruCache::unbounded(),
            total_bytes: 0,
        };
        for (_, stem, size) in entries {
            cache.total_bytes += size;
            cache.index.put(stem, size);
        }
        cache.evict_to_capacity();

        info!(
            "Opened thumbnail cache at {} ({} entries, {} bytes)",
            cache.dir.display(),
            cache.index.len(),
            cache.total_bytes
        );
        Ok(cache)
    }

    /// Retrieves a thumbnail, marking it most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<DynamicImage> {
        let stem = entry_stem(key);
        if self.index.get(&stem).is_none() {
            debug!("Cache MISS: {}", key);
            return None;
        }

        let path = self.entry_path(&stem);
        match image::open(&path) {
            Ok(image) => {
                if let Err(e) = filetime::set_file_mtime(&path, FileTime::now()) {
                    debug!("Failed to touch {}: {}", path.display(), e);
                }
                debug!("Cache HIT: {}", key);
                Some(image)
            }
            Err(e) => {
                warn!("Dropping unreadable cache entry for {}: {}", key, e);
                self.remove_entry(&stem);
                None
            }
        }
    }

    /// Stores a thumbnail, replacing any previous entry for the key, then evicts
    /// least recently used entries until the cache fits its capacity.
    pub fn put(&mut self, key: &CacheKey, image: &DynamicImage) -> Result<()> {
        let stem = entry_stem(key);
        let encoded = self.encode(image)?;
        let size = encoded.len() as u64;

        if size > self.capacity {
            warn!(
                "Thumbnail for {} ({} bytes) exceeds cache capacity, not stored",
                key, size
            );
            self.remove_entry(&stem);
            return Ok(());
        }

        let path = self.entry_path(&stem);
        let tmp_path = path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, &encoded)?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        if let Some(previous) = self.index.put(stem, size) {
            self.total_bytes = self.total_bytes.saturating_sub(previous);
        }
        self.total_bytes += size;
        debug!(
            "Cache PUT: {} ({}x{}, {} bytes)",
            key,
            image.width(),
            image.height(),
            size
        );

        self.evict_to_capacity();
        Ok(())
    }

    /// Removes the entry for a key, if any.
    pub fn remove(&mut self, key: &CacheKey) {
        debug!("Cache REMOVE: {}", key);
        self.remove_entry(&entry_stem(key));
    }

    /// Checks if a key is cached without touching its recency.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.index.contains(&entry_stem(key))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.quality).encode_image(&rgb)?;
        Ok(encoded)
    }

    fn entry_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", stem, ENTRY_EXTENSION))
    }

    fn remove_entry(&mut self, stem: &str) {
        if let Some(size) = self.index.pop(stem) {
            self.total_bytes = self.total_bytes.saturating_sub(size);
        }
        self.delete_file(stem);
    }

    fn evict_to_capacity(&mut self) {
        while self.total_bytes > self.capacity {
            let Some((stem, size)) = self.index.pop_lru() else {
                break;
            };
            self.total_bytes = self.total_bytes.saturating_sub(size);
            self.delete_file(&stem);
            debug!("Cache EVICT: {} ({} bytes)", stem, size);
        }
    }

    fn delete_file(&self, stem: &str) {
        let path = self.entry_path(stem);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to delete cache file {}: {}", path.display(), e);
            }
        }
    }
}

fn entry_stem(key: &CacheKey) -> String {
    sha256_hex(key.as_str())
}
