//! Decoding and raster helpers used by the fetch strategies.

use crate::error::{Result, ThumbnailError};
use image::imageops::{self, FilterType};
use image::{
    DynamicImage, GrayImage, ImageDecoder, ImageFormat, ImageReader, Limits, RgbImage, Rgba,
    RgbaImage,
};
use jpeg_decoder::PixelFormat;
use log::debug;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

fn decode_limits(max_alloc: u64) -> Limits {
    let mut limits = Limits::default();
    limits.max_alloc = Some(max_alloc);
    limits
}

/// Decodes an in-memory image, guessing its format from the content.
pub fn decode_bytes(bytes: &[u8], max_alloc: u64) -> Result<DynamicImage> {
    let mut reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    reader.limits(decode_limits(max_alloc));
    Ok(reader.decode()?)
}

/// Scales and center-crops `image` so it exactly fills `width` x `height`.
pub fn extract_thumbnail(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_to_fill(width, height, FilterType::Triangle)
}

/// Flattens a possibly transparent thumbnail onto an opaque square canvas.
///
/// The canvas is `size` x `size` and the thumbnail is drawn at the origin.
pub fn composite_on_background(image: &DynamicImage, size: u32, background: [u8; 3]) -> DynamicImage {
    let [r, g, b] = background;
    let mut canvas = RgbaImage::from_pixel(size, size, Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).into_rgb8().into()
}

/// Power-of-two reduction that keeps both sides at or above the requested size.
pub fn sample_size(width: u32, height: u32, target_width: u32, target_height: u32) -> u32 {
    let mut sample = 1;
    if height > target_height || width > target_width {
        let half_height = height / 2;
        let half_width = width / 2;
        while half_height / sample >= target_height && half_width / sample >= target_width {
            sample *= 2;
        }
    }
    sample
}

/// Decodes an image file, reduced by a power-of-two factor close to the target size.
///
/// JPEGs are scaled during decoding, so large photos never exist at full size in
/// memory. Other formats are decoded under the allocation limit and reduced after.
pub fn sampled_decode(
    path: &Path,
    target_width: u32,
    target_height: u32,
    max_alloc: u64,
) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    if reader.format() == Some(ImageFormat::Jpeg) {
        if let Some(image) = scaled_jpeg_decode(path, target_width, target_height, max_alloc)? {
            return Ok(image);
        }
    }

    let (width, height) = reader.into_dimensions()?;
    let sample = sample_size(width, height, target_width, target_height);

    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    reader.limits(decode_limits(max_alloc));
    let image = reader.decode()?;

    if sample > 1 {
        Ok(image.resize_exact(
            (width / sample).max(1),
            (height / sample).max(1),
            FilterType::Nearest,
        ))
    } else {
        Ok(image)
    }
}

/// DCT-scaled JPEG decode. `None` for streams the scaled path cannot handle
/// (CMYK, 16-bit, unsupported coding), which then take the full decode path.
fn scaled_jpeg_decode(
    path: &Path,
    target_width: u32,
    target_height: u32,
    max_alloc: u64,
) -> Result<Option<DynamicImage>> {
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(File::open(path)?));
    match decoder.read_info() {
        Ok(()) => {}
        Err(jpeg_decoder::Error::Unsupported(feature)) => {
            debug!("Scaled JPEG decode unsupported ({:?}): {}", feature, path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    }
    let Some(info) = decoder.info() else {
        return Ok(None);
    };
    let channels: u64 = match info.pixel_format {
        PixelFormat::L8 => 1,
        PixelFormat::RGB24 => 3,
        _ => return Ok(None),
    };

    let sample = sample_size(
        u32::from(info.width),
        u32::from(info.height),
        target_width,
        target_height,
    );
    let requested_width = (u32::from(info.width) / sample).max(1) as u16;
    let requested_height = (u32::from(info.height) / sample).max(1) as u16;
    let (width, height) = decoder.scale(requested_width, requested_height)?;
    let (width, height) = (u32::from(width), u32::from(height));

    if u64::from(width) * u64::from(height) * channels > max_alloc {
        return Err(ThumbnailError::ResourceExhausted);
    }

    let pixels = match decoder.decode() {
        Ok(pixels) => pixels,
        Err(jpeg_decoder::Error::Unsupported(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let image = match info.pixel_format {
        PixelFormat::L8 => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        _ => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
    };
    image.map(Some).ok_or_else(|| {
        ThumbnailError::DecodeFailed(format!(
            "short JPEG pixel buffer for {}x{} in {}",
            width,
            height,
            path.display()
        ))
    })
}

/// Applies the orientation embedded in `source`'s metadata to `image`.
///
/// Sources without orientation metadata leave the image unchanged.
pub fn rotate_by_exif(mut image: DynamicImage, source: &Path) -> Result<DynamicImage> {
    let mut decoder = ImageReader::open(source)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation()?;
    image.apply_orientation(orientation);
    Ok(image)
}
