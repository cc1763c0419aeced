//! Image encoder adapter.
//!
//! The pretrained model is an opaque capability behind [`ImageEncoder`]; the production
//! implementation is [`ClipEncoder`], tests plug in deterministic doubles.

pub mod clip;
pub mod preprocess;

pub use clip::{ClipConfig, ClipEncoder};
pub use preprocess::Preprocessing;

use crate::domain::embedding::{DegenerateEmbedding, UnitVector};
use image::{ImageReader, Limits, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

/// Largest accepted width or height of an uploaded image, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Largest accepted ratio between the long and the short edge. Preprocessing scales the short
/// edge up to the model input, so the long edge grows by the same factor.
pub const MAX_ASPECT_RATIO: u32 = 16;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("invalid image: {0}")]
    InvalidImage(String),
    #[error("degenerate embedding: {0}")]
    DegenerateEmbedding(#[from] DegenerateEmbedding),
    #[error("encoder model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("embedding inference failed: {0}")]
    EncodingFailure(String),
}

/// Turns raw image bytes into a unit-length embedding.
///
/// Implementations are blocking and CPU bound; async callers go through [`encode_blocking`].
pub trait ImageEncoder: Send + Sync {
    /// Identifier of the underlying model, reported to clients.
    fn model_id(&self) -> &str;

    /// Width of every embedding this encoder produces.
    fn dimensions(&self) -> usize;

    fn encode(&self, image_bytes: &[u8]) -> Result<UnitVector, EncodeError>;

    /// Loads whatever the encoder needs before the first request.
    fn warm_up(&self) -> Result<(), EncodeError> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        true
    }
}

/// Runs `encoder.encode` on the blocking thread pool.
pub async fn encode_blocking(
    encoder: Arc<dyn ImageEncoder>,
    image_bytes: bytes::Bytes,
) -> Result<UnitVector, EncodeError> {
    tokio::task::spawn_blocking(move || encoder.encode(&image_bytes))
        .await
        .map_err(|e| EncodeError::EncodingFailure(format!("encoder task failed: {}", e)))?
}

/// Decodes `bytes` into a 3-channel RGB image.
///
/// Oversized and extremely elongated images are rejected before the pixel buffer is allocated.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, EncodeError> {
    if bytes.is_empty() {
        return Err(EncodeError::InvalidImage("image is empty".to_string()));
    }
    let (width, height) = reader(bytes)?.into_dimensions().map_err(invalid_image)?;
    check_dimensions(width, height)?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_SIDE);
    limits.max_image_height = Some(MAX_IMAGE_SIDE);
    let mut reader = reader(bytes)?;
    reader.limits(limits);

    Ok(reader.decode().map_err(invalid_image)?.to_rgb8())
}

fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, EncodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| EncodeError::InvalidImage(e.to_string()))
}

fn invalid_image(e: image::ImageError) -> EncodeError {
    EncodeError::InvalidImage(e.to_string())
}

fn check_dimensions(width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidImage(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }
    if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
        return Err(EncodeError::InvalidImage(format!(
            "image is {}x{}, larger than {} pixels per side",
            width, height, MAX_IMAGE_SIDE
        )));
    }
    let (long, short) = (width.max(height), width.min(height));
    if long > short.saturating_mul(MAX_ASPECT_RATIO) {
        return Err(EncodeError::InvalidImage(format!(
            "image is {}x{}, aspect ratio exceeds {}:1",
            width, height, MAX_ASPECT_RATIO
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};

    fn png_of(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 200]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn decode_rejects_empty_and_garbage() {
        assert!(matches!(decode_rgb(&[]), Err(EncodeError::InvalidImage(_))));
        assert!(matches!(
            decode_rgb(b"definitely not an image"),
            Err(EncodeError::InvalidImage(_))
        ));
    }

    #[test]
    fn decode_drops_alpha_channel() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 128]));
        let mut png = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let rgb = decode_rgb(&png).unwrap();
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn decode_rejects_thin_strips() {
        let strip = png_of(20_000, 1);
        assert!(strip.len() < 64 * 1024);
        assert!(matches!(
            decode_rgb(&strip),
            Err(EncodeError::InvalidImage(_))
        ));

        let tall = png_of(10, 10 * MAX_ASPECT_RATIO + 1);
        assert!(matches!(decode_rgb(&tall), Err(EncodeError::InvalidImage(_))));
    }

    #[test]
    fn decode_accepts_bounded_panorama() {
        let wide = png_of(16 * MAX_ASPECT_RATIO, 16);
        assert_eq!(decode_rgb(&wide).unwrap().dimensions(), (256, 16));
    }
}
