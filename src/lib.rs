//! Background thumbnail generation for synced files.
//!
//! Thumbnails for remote files, local images and space header images are produced
//! on a bounded worker pool, persisted in a size-capped disk cache and committed
//! to display slots only while those slots still show the requested item.

pub mod cache_gate;
pub mod config;
pub mod content;
pub mod error;
pub mod file_utils;
pub mod image_cache;
pub mod image_loader;
pub mod scheduler;
pub mod services;
pub mod state;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use cache_gate::ThumbnailCacheGate;
pub use config::ThumbnailConfig;
pub use content::{CacheKey, ContentItem, LocalFile, RemoteFile, SpaceImage};
pub use error::{Result, ThumbnailError};
pub use scheduler::{TaskOutcome, ThumbnailScheduler};
