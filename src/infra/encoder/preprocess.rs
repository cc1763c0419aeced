//! CLIP image preprocessing: resize, center crop, normalize, NCHW layout.

use crate::infra::encoder::EncodeError;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use serde::Deserialize;
use std::path::Path;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];
const CLIP_INPUT_SIZE: u32 = 224;

/// Preprocessing parameters of the vision model.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessing {
    pub shortest_edge: u32,
    pub crop_width: u32,
    pub crop_height: u32,
    pub rescale_factor: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Preprocessing {
    /// openai/clip-vit-base-patch32 values.
    fn default() -> Self {
        Self {
            shortest_edge: CLIP_INPUT_SIZE,
            crop_width: CLIP_INPUT_SIZE,
            crop_height: CLIP_INPUT_SIZE,
            rescale_factor: 1.0 / 255.0,
            mean: CLIP_MEAN,
            std: CLIP_STD,
        }
    }
}

// `size` and `crop_size` come as a bare int or an object depending on the exporter.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Square(u32),
    ShortestEdge { shortest_edge: u32 },
    HeightWidth { height: u32, width: u32 },
}

#[derive(Debug, Deserialize)]
struct PreprocessorConfigFile {
    size: Option<SizeField>,
    crop_size: Option<SizeField>,
    rescale_factor: Option<f32>,
    image_mean: Option<[f32; 3]>,
    image_std: Option<[f32; 3]>,
}

impl Preprocessing {
    /// Reads a Hugging Face `preprocessor_config.json`; missing keys keep CLIP defaults.
    pub fn from_file(path: &Path) -> Result<Self, EncodeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EncodeError::ModelUnavailable(format!(
                "cannot read preprocessor config {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, EncodeError> {
        let file: PreprocessorConfigFile = serde_json::from_str(raw).map_err(|e| {
            EncodeError::ModelUnavailable(format!("invalid preprocessor config: {}", e))
        })?;

        let mut cfg = Self::default();
        if let Some(size) = file.size {
            cfg.shortest_edge = match size {
                SizeField::Square(s) | SizeField::ShortestEdge { shortest_edge: s } => s,
                SizeField::HeightWidth { height, width } => height.min(width),
            };
        }
        if let Some(crop) = file.crop_size {
            let (w, h) = match crop {
                SizeField::Square(s) | SizeField::ShortestEdge { shortest_edge: s } => (s, s),
                SizeField::HeightWidth { height, width } => (width, height),
            };
            cfg.crop_width = w;
            cfg.crop_height = h;
        }
        if let Some(factor) = file.rescale_factor {
            cfg.rescale_factor = factor;
        }
        if let Some(mean) = file.image_mean {
            cfg.mean = mean;
        }
        if let Some(std) = file.image_std {
            cfg.std = std;
        }

        if cfg.shortest_edge == 0 || cfg.crop_width == 0 || cfg.crop_height == 0 {
            return Err(EncodeError::ModelUnavailable(
                "preprocessor sizes must be positive".to_string(),
            ));
        }
        if cfg.std.iter().any(|s| *s == 0.0) {
            return Err(EncodeError::ModelUnavailable(
                "preprocessor image_std must be non-zero".to_string(),
            ));
        }
        Ok(cfg)
    }

    /// Builds the `[1, 3, crop_height, crop_width]` pixel tensor for `image`.
    pub fn to_tensor(&self, image: &RgbImage) -> Array4<f32> {
        let (w, h) = image.dimensions();
        let scale = self.shortest_edge as f32 / w.min(h).max(1) as f32;
        let new_w = ((w as f32 * scale).round() as u32).max(self.crop_width);
        let new_h = ((h as f32 * scale).round() as u32).max(self.crop_height);
        let resized = imageops::resize(image, new_w, new_h, FilterType::CatmullRom);

        let x0 = (new_w - self.crop_width) / 2;
        let y0 = (new_h - self.crop_height) / 2;

        Array4::from_shape_fn(
            (1, 3, self.crop_height as usize, self.crop_width as usize),
            |(_, c, y, x)| {
                let pixel = resized.get_pixel(x0 + x as u32, y0 + y as u32);
                (f32::from(pixel[c]) * self.rescale_factor - self.mean[c]) / self.std[c]
            },
        )
    }
}
