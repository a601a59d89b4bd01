//! Turns a server preview response into a square thumbnail.

use crate::config::{PNG_MIME_TYPE, ThumbnailConfig};
use crate::error::{Result, ThumbnailError};
use crate::image_loader::{composite_on_background, decode_bytes, extract_thumbnail};
use crate::services::http_client::{HTTP_OK, PreviewResponse};
use image::DynamicImage;

/// Shared decode and post-processing step of the remote strategies.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    thumbnail_px: u32,
    background: [u8; 3],
    max_decode_bytes: u64,
}

impl PreviewRenderer {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            thumbnail_px: config.thumbnail_px,
            background: config.background_color,
            max_decode_bytes: config.max_decode_bytes,
        }
    }

    pub fn thumbnail_px(&self) -> u32 {
        self.thumbnail_px
    }

    /// Decodes a 200 response into a thumbnail; any other status drains the body
    /// and yields `HttpStatus`.
    ///
    /// PNG sources are flattened onto the opaque background so they do not show
    /// through against the tiles they are displayed on.
    pub fn render(&self, response: PreviewResponse, mime_type: &str) -> Result<DynamicImage> {
        let status = response.status;
        if status != HTTP_OK {
            response.exhaust();
            return Err(ThumbnailError::HttpStatus(status));
        }

        let bytes = response.into_bytes()?;
        let decoded = decode_bytes(&bytes, self.max_decode_bytes)?;
        let px = self.thumbnail_px;
        let thumbnail = extract_thumbnail(&decoded, px, px);

        if mime_type.eq_ignore_ascii_case(PNG_MIME_TYPE) {
            Ok(composite_on_background(&thumbnail, px, self.background))
        } else {
            Ok(thumbnail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{encode_png, solid_image, test_config};
    use image::GenericImageView;
    use std::io::{Cursor, Read};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct TrackedBody {
        inner: Cursor<Vec<u8>>,
        drained: Arc<AtomicBool>,
    }

    impl Read for TrackedBody {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.inner.read(buf)?;
            if n == 0 {
                self.drained.store(true, Ordering::SeqCst);
            }
            Ok(n)
        }
    }

    #[test]
    fn png_preview_is_flattened() {
        let renderer = PreviewRenderer::new(&test_config());
        let body = encode_png(&solid_image(200, 200, [0, 0, 0, 0]));

        let thumb = renderer
            .render(PreviewResponse::new(200, Cursor::new(body)), "IMAGE/PNG")
            .unwrap();

        assert_eq!(thumb.dimensions(), (80, 80));
        assert!(!thumb.color().has_alpha());
    }

    #[test]
    fn jpeg_mime_keeps_alpha_channel() {
        let renderer = PreviewRenderer::new(&test_config());
        let body = encode_png(&solid_image(200, 200, [0, 0, 0, 0]));

        let thumb = renderer
            .render(PreviewResponse::new(200, Cursor::new(body)), "image/jpeg")
            .unwrap();

        assert_eq!(thumb.dimensions(), (80, 80));
        assert!(thumb.color().has_alpha());
    }

    #[test]
    fn error_status_drains_body() {
        let renderer = PreviewRenderer::new(&test_config());
        let drained = Arc::new(AtomicBool::new(false));
        let body = TrackedBody {
            inner: Cursor::new(b"<html>error page</html>".to_vec()),
            drained: Arc::clone(&drained),
        };

        let err = renderer
            .render(PreviewResponse::new(500, body), "image/png")
            .unwrap_err();

        assert!(matches!(err, ThumbnailError::HttpStatus(500)));
        assert!(drained.load(Ordering::SeqCst));
    }
}
