//! Avatar normalization, cropping, and per-size renditions.
//!
//! All outputs are RGBA PNG. Decoding and encoding are CPU-bound, so the
//! async entry points run the work on the blocking pool.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};
use tracing::debug;

use homecloud_core::config::account::{AvatarConfig, AvatarSizeLimit};
use homecloud_core::error::{AppError, ErrorKind, codes};
use homecloud_core::result::AppResult;

/// Shrink factor applied while a rendition is over its byte limit.
const SHRINK_FACTOR: f64 = 0.8;

/// Encoding attempts per rendition before giving up on the byte limit.
const MAX_ATTEMPTS: usize = 10;

/// Crop rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The three cropped sizes stored next to the original.
#[derive(Debug, Clone)]
pub struct AvatarRenditions {
    pub large: Bytes,
    pub middle: Bytes,
    pub small: Bytes,
}

fn invalid_image(e: image::ImageError) -> AppError {
    AppError::with_source(ErrorKind::Validation, "Not a readable image", e)
        .with_code(codes::INVALID_IMAGE)
}

fn encode_png(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to encode PNG", e))?;
    Ok(cursor.into_inner())
}

/// Downscale so the longest edge fits `max_edge`; never upscales.
fn fit_within(image: DynamicImage, max_edge: u32) -> DynamicImage {
    if image.width() <= max_edge && image.height() <= max_edge {
        image
    } else {
        image.resize(max_edge, max_edge, FilterType::Lanczos3)
    }
}

/// Encode `image` as PNG, shrinking it until it fits `limit.max_bytes`.
fn compress(image: DynamicImage, limit: AvatarSizeLimit) -> AppResult<Bytes> {
    let mut current = fit_within(image, limit.pixels);
    let mut encoded = encode_png(&current)?;
    let mut attempt = 1;
    while encoded.len() > limit.max_bytes && attempt < MAX_ATTEMPTS {
        let width = ((current.width() as f64 * SHRINK_FACTOR) as u32).max(1);
        let height = ((current.height() as f64 * SHRINK_FACTOR) as u32).max(1);
        current = current.resize_exact(width, height, FilterType::Triangle);
        encoded = encode_png(&current)?;
        attempt += 1;
    }
    debug!(
        width = current.width(),
        height = current.height(),
        bytes = encoded.len(),
        attempts = attempt,
        "Compressed avatar rendition"
    );
    Ok(Bytes::from(encoded))
}

/// Validate an uploaded image and store it as an RGBA PNG no larger than
/// the configured original size.
pub fn normalize_original(data: &[u8], config: &AvatarConfig) -> AppResult<Bytes> {
    if data.len() > config.original.max_bytes {
        return Err(AppError::validation(format!(
            "Avatar exceeds {} bytes",
            config.original.max_bytes
        ))
        .with_code(codes::UPLOAD_TOO_LARGE));
    }
    let decoded = image::load_from_memory(data).map_err(invalid_image)?;
    let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());
    compress(rgba, config.original)
}

fn crop_pixels(
    image: &DynamicImage,
    crop: CropBox,
    config: &AvatarConfig,
) -> AppResult<(u32, u32, u32, u32)> {
    let invalid = |message: String| AppError::validation(message).with_code(codes::INVALID_CROP);

    let values = [crop.x, crop.y, crop.width, crop.height];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("Crop box must be finite".to_string()));
    }
    if crop.x < 0.0 || crop.y < 0.0 || crop.width < 1.0 || crop.height < 1.0 {
        return Err(invalid("Crop box is empty or negative".to_string()));
    }

    let (img_w, img_h) = (image.width() as f64, image.height() as f64);
    // Allow half a pixel of slack for client-side rounding.
    if crop.x + crop.width > img_w + 0.5 || crop.y + crop.height > img_h + 0.5 {
        return Err(invalid(format!(
            "Crop box exceeds the {}x{} image",
            image.width(),
            image.height()
        )));
    }

    let ratio = crop.width / crop.height;
    if ratio < config.min_aspect_ratio || ratio > config.max_aspect_ratio() {
        return Err(invalid(format!("Crop aspect ratio {ratio:.3} is out of range")));
    }

    let x = crop.x.floor() as u32;
    let y = crop.y.floor() as u32;
    let w = (crop.width.round() as u32).clamp(1, image.width().saturating_sub(x).max(1));
    let h = (crop.height.round() as u32).clamp(1, image.height().saturating_sub(y).max(1));
    Ok((x, y, w, h))
}

/// Crop a normalized original and produce the large/middle/small renditions.
pub fn crop(original: &[u8], crop: CropBox, config: &AvatarConfig) -> AppResult<AvatarRenditions> {
    let decoded = image::load_from_memory(original).map_err(invalid_image)?;
    let (x, y, w, h) = crop_pixels(&decoded, crop, config)?;
    let cropped = DynamicImage::ImageRgba8(decoded.crop_imm(x, y, w, h).to_rgba8());

    Ok(AvatarRenditions {
        large: compress(cropped.clone(), config.large)?,
        middle: compress(cropped.clone(), config.middle)?,
        small: compress(cropped, config.small)?,
    })
}

/// Largest centered square of `original`, cropped into renditions.
///
/// Used right after an upload so a fresh avatar is usable before the
/// user picks a crop.
pub fn crop_centered(original: &[u8], config: &AvatarConfig) -> AppResult<AvatarRenditions> {
    let (width, height) = image::load_from_memory(original)
        .map_err(invalid_image)?
        .dimensions();
    let side = width.min(height) as f64;
    let crop_box = CropBox {
        x: ((width as f64 - side) / 2.0).floor(),
        y: ((height as f64 - side) / 2.0).floor(),
        width: side,
        height: side,
    };
    crop(original, crop_box, config)
}

/// [`normalize_original`] on the blocking pool.
pub async fn normalize_original_blocking(data: Bytes, config: AvatarConfig) -> AppResult<Bytes> {
    tokio::task::spawn_blocking(move || normalize_original(&data, &config))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Avatar task panicked", e))?
}

/// [`crop`] on the blocking pool.
pub async fn crop_blocking(
    original: Bytes,
    crop_box: CropBox,
    config: AvatarConfig,
) -> AppResult<AvatarRenditions> {
    tokio::task::spawn_blocking(move || crop(&original, crop_box, &config))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Avatar task panicked", e))?
}

/// [`crop_centered`] on the blocking pool.
pub async fn crop_centered_blocking(
    original: Bytes,
    config: AvatarConfig,
) -> AppResult<AvatarRenditions> {
    tokio::task::spawn_blocking(move || crop_centered(&original, &config))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Internal, "Avatar task panicked", e))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn noise(width: u32, height: u32) -> Vec<u8> {
        let mut state = 0x2545_f491_u32;
        let img = RgbaImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [a, b, c, _] = state.to_le_bytes();
            Rgba([a, b, c, 255])
        });
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn dims(data: &[u8]) -> (u32, u32) {
        image::load_from_memory(data).unwrap().dimensions()
    }

    #[test]
    fn test_normalize_keeps_small_images() {
        let out = normalize_original(&png(300, 200), &AvatarConfig::default()).unwrap();
        assert_eq!(dims(&out), (300, 200));
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_normalize_downscales_oversized_images() {
        let out = normalize_original(&png(3000, 30), &AvatarConfig::default()).unwrap();
        let (w, h) = dims(&out);
        assert!(w <= 2048 && h <= 2048);
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize_original(b"not an image", &AvatarConfig::default()).unwrap_err();
        assert_eq!(err.code, codes::INVALID_IMAGE);
    }

    #[test]
    fn test_normalize_rejects_large_upload() {
        let mut config = AvatarConfig::default();
        config.original.max_bytes = 10;
        let err = normalize_original(&png(20, 20), &config).unwrap_err();
        assert_eq!(err.code, codes::UPLOAD_TOO_LARGE);
    }

    #[test]
    fn test_crop_produces_bounded_renditions() {
        let config = AvatarConfig::default();
        let original = normalize_original(&png(400, 300), &config).unwrap();
        let crop_box = CropBox { x: 50.0, y: 10.0, width: 280.0, height: 280.0 };
        let out = crop(&original, crop_box, &config).unwrap();

        assert_eq!(dims(&out.large), (256, 256));
        assert_eq!(dims(&out.middle), (128, 128));
        assert_eq!(dims(&out.small), (64, 64));
        assert!(out.small.len() <= config.small.max_bytes);
    }

    #[test]
    fn test_crop_never_upscales() {
        let config = AvatarConfig::default();
        let original = png(100, 100);
        let crop_box = CropBox { x: 0.0, y: 0.0, width: 100.0, height: 100.0 };
        let out = crop(&original, crop_box, &config).unwrap();
        assert_eq!(dims(&out.large), (100, 100));
        assert_eq!(dims(&out.small), (64, 64));
    }

    #[test]
    fn test_crop_shrinks_until_under_byte_limit() {
        let mut config = AvatarConfig::default();
        config.large.max_bytes = 20_000;
        let original = noise(256, 256);
        let crop_box = CropBox { x: 0.0, y: 0.0, width: 256.0, height: 256.0 };
        let out = crop(&original, crop_box, &config).unwrap();
        let (w, _) = dims(&out.large);
        assert!(w < 256);
    }

    #[test]
    fn test_crop_rejects_out_of_bounds_and_bad_ratio() {
        let config = AvatarConfig::default();
        let original = png(200, 200);

        let outside = CropBox { x: 150.0, y: 0.0, width: 100.0, height: 100.0 };
        assert_eq!(crop(&original, outside, &config).unwrap_err().code, codes::INVALID_CROP);

        let wide = CropBox { x: 0.0, y: 0.0, width: 200.0, height: 50.0 };
        assert_eq!(crop(&original, wide, &config).unwrap_err().code, codes::INVALID_CROP);

        let negative = CropBox { x: -1.0, y: 0.0, width: 100.0, height: 100.0 };
        assert_eq!(crop(&original, negative, &config).unwrap_err().code, codes::INVALID_CROP);
    }

    #[test]
    fn test_crop_centered_takes_the_middle_square() {
        let config = AvatarConfig::default();
        let out = crop_centered(&png(300, 100), &config).unwrap();
        assert_eq!(dims(&out.large), (100, 100));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let config = AvatarConfig::default();
        let original = normalize_original_blocking(Bytes::from(png(64, 64)), config.clone())
            .await
            .unwrap();
        let crop_box = CropBox { x: 0.0, y: 0.0, width: 64.0, height: 64.0 };
        let out = crop_blocking(original, crop_box, config).await.unwrap();
        assert_eq!(dims(&out.middle), (64, 64));
    }
}
