//! Unified error types for the thumbnail pipeline.

use image::error::{ImageError, LimitErrorKind};
use std::io;
use thiserror::Error;

/// Errors raised while caching or generating thumbnails.
///
/// None of these ever escape a generation task; they are logged and the
/// requester simply gets no image.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    /// The disk cache could not be opened or written.
    #[error("thumbnail cache unavailable: {0}")]
    StoreUnavailable(String),
    /// Transport-level failure while downloading a preview.
    #[error("preview fetch failed: {0}")]
    FetchFailed(String),
    /// The server answered with something other than 200.
    #[error("preview request returned HTTP {0}")]
    HttpStatus(u16),
    /// Malformed bytes or unsupported format.
    #[error("image decode failed: {0}")]
    DecodeFailed(String),
    /// Ran out of memory while decoding or scaling.
    #[error("out of memory while generating thumbnail")]
    ResourceExhausted,
    /// Invalid configuration file or value.
    #[error("configuration error: {0}")]
    Config(String),
    /// The background worker pool could not be created.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ThumbnailError {
    /// Whether this failure should trigger a memory reclaim hint.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted)
    }
}

impl From<ImageError> for ThumbnailError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Limits(limit) => match limit.kind() {
                LimitErrorKind::InsufficientMemory => Self::ResourceExhausted,
                _ => Self::DecodeFailed(limit.to_string()),
            },
            ImageError::IoError(e) => Self::Io(e),
            other => Self::DecodeFailed(other.to_string()),
        }
    }
}

impl From<jpeg_decoder::Error> for ThumbnailError {
    fn from(err: jpeg_decoder::Error) -> Self {
        match err {
            jpeg_decoder::Error::Io(e) => Self::Io(e),
            other => Self::DecodeFailed(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ThumbnailError {
    fn from(err: reqwest::Error) -> Self {
        Self::FetchFailed(err.to_string())
    }
}

/// Type alias for Results in this crate.
pub type Result<T> = std::result::Result<T, ThumbnailError>;

#[cfg(test)]
mod tests {
    use super::*;
    use image::error::{LimitError, LimitErrorKind};

    #[test]
    fn memory_limit_maps_to_resource_exhausted() {
        let err = ImageError::Limits(LimitError::from_kind(LimitErrorKind::InsufficientMemory));
        let err = ThumbnailError::from(err);
        assert!(err.is_resource_exhausted());
    }

    #[test]
    fn dimension_limit_is_a_decode_failure() {
        let err = ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError));
        assert!(matches!(
            ThumbnailError::from(err),
            ThumbnailError::DecodeFailed(_)
        ));
    }
}
