//! Thumbnails for images on the local filesystem.

use crate::content::LocalFile;
use crate::error::Result;
use crate::image_loader::{extract_thumbnail, rotate_by_exif, sampled_decode};
use image::DynamicImage;
use log::debug;

/// Fetch strategy for `ContentItem::LocalFile`.
#[derive(Debug, Clone)]
pub struct LocalFileService {
    thumbnail_px: u32,
    max_decode_bytes: u64,
}

impl LocalFileService {
    pub fn new(thumbnail_px: u32, max_decode_bytes: u64) -> Self {
        Self {
            thumbnail_px,
            max_decode_bytes,
        }
    }

    /// Decodes the file at a reduced resolution, crops it square and applies the
    /// orientation stored in its metadata.
    pub fn fetch(&self, file: &LocalFile) -> Result<DynamicImage> {
        let px = self.thumbnail_px;
        let path = &file.absolute_path;

        let bitmap = sampled_decode(path, px, px, self.max_decode_bytes)?;
        debug!(
            "Decoded {} at {}x{}",
            path.display(),
            bitmap.width(),
            bitmap.height()
        );
        let thumbnail = extract_thumbnail(&bitmap, px, px);
        rotate_by_exif(thumbnail, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThumbnailError;
    use crate::test_support::{encode_jpeg, encode_png, solid_image};
    use image::GenericImageView;
    use std::path::PathBuf;

    #[test]
    fn produces_square_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, encode_png(&solid_image(400, 250, [90, 80, 70, 255]))).unwrap();

        let thumb = LocalFileService::new(64, 64 * 1024 * 1024)
            .fetch(&LocalFile {
                absolute_path: path,
            })
            .unwrap();

        assert_eq!(thumb.dimensions(), (64, 64));
    }

    #[test]
    fn large_photo_fits_small_decode_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camera.jpg");
        std::fs::write(&path, encode_jpeg(&solid_image(2400, 2400, [30, 90, 150, 255]))).unwrap();

        let thumb = LocalFileService::new(80, 4 * 1024 * 1024)
            .fetch(&LocalFile {
                absolute_path: path,
            })
            .unwrap();

        assert_eq!(thumb.dimensions(), (80, 80));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = LocalFileService::new(64, 1024)
            .fetch(&LocalFile {
                absolute_path: PathBuf::from("/no/such/image.jpg"),
            })
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Io(_)));
    }

    #[test]
    fn non_image_file_fails_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.jpg");
        std::fs::write(&path, b"plain text pretending to be a jpeg").unwrap();

        let result = LocalFileService::new(64, 1024 * 1024).fetch(&LocalFile {
            absolute_path: path,
        });
        assert!(result.is_err());
    }
}
