//! CLIP vision encoder running an ONNX export through ONNX Runtime.
//!
//! Model weights and preprocessing configuration are loaded once per process, the first time
//! they are needed (or eagerly via `warm_up`). The loaded runtime is immutable afterwards; the
//! ONNX session sits behind a mutex because `Session::run` needs exclusive access.

use crate::domain::embedding::UnitVector;
use crate::infra::encoder::preprocess::Preprocessing;
use crate::infra::encoder::{decode_rgb, EncodeError, ImageEncoder};
use ndarray::Array4;
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::PathBuf;
use std::sync::Mutex;

pub const CLIP_VIT_B32_DIMS: usize = 512;

#[derive(Debug, Clone)]
pub struct ClipConfig {
    /// Path to the vision tower ONNX file (e.g. `vision_model.onnx`).
    pub model_path: PathBuf,
    /// Optional `preprocessor_config.json`; CLIP defaults when absent.
    pub preprocessor_path: Option<PathBuf>,
    pub model_id: String,
    /// Name of the output holding the projected image embedding.
    pub output_name: String,
    pub dims: usize,
    pub intra_threads: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/clip-vit-base-patch32/vision_model.onnx"),
            preprocessor_path: None,
            model_id: "openai/clip-vit-base-patch32".to_string(),
            output_name: "image_embeds".to_string(),
            dims: CLIP_VIT_B32_DIMS,
            intra_threads: 4,
        }
    }
}

struct ClipRuntime {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    preprocessing: Preprocessing,
}

impl ClipRuntime {
    fn load(config: &ClipConfig) -> Result<Self, EncodeError> {
        if !config.model_path.exists() {
            return Err(EncodeError::ModelUnavailable(format!(
                "model file not found at {}",
                config.model_path.display()
            )));
        }

        let preprocessing = match &config.preprocessor_path {
            Some(path) => Preprocessing::from_file(path)?,
            None => Preprocessing::default(),
        };

        tracing::info!(
            model = %config.model_id,
            path = %config.model_path.display(),
            "loading CLIP vision model"
        );

        let session = Session::builder()
            .map_err(model_unavailable)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(model_unavailable)?
            .with_intra_threads(config.intra_threads.max(1))
            .map_err(model_unavailable)?
            .commit_from_file(&config.model_path)
            .map_err(model_unavailable)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| EncodeError::ModelUnavailable("model declares no inputs".to_string()))?;

        let output_name = if session.outputs.iter().any(|o| o.name == config.output_name) {
            config.output_name.clone()
        } else {
            let fallback = session
                .outputs
                .first()
                .map(|o| o.name.clone())
                .ok_or_else(|| {
                    EncodeError::ModelUnavailable("model declares no outputs".to_string())
                })?;
            tracing::warn!(
                expected = %config.output_name,
                using = %fallback,
                "configured embedding output not found, falling back to first output"
            );
            fallback
        };

        tracing::info!(input = %input_name, output = %output_name, "CLIP vision model loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            preprocessing,
        })
    }

    fn infer(&self, pixel_values: Array4<f32>) -> Result<Vec<f32>, EncodeError> {
        let input = Tensor::from_array(pixel_values).map_err(encoding_failure)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| {
                EncodeError::EncodingFailure("encoder session lock poisoned".to_string())
            })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(encoding_failure)?;

        let output = outputs.get(self.output_name.as_str()).ok_or_else(|| {
            EncodeError::EncodingFailure(format!("no output '{}' from model", self.output_name))
        })?;

        let (_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(encoding_failure)?;

        Ok(data.to_vec())
    }
}

fn model_unavailable(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::ModelUnavailable(e.to_string())
}

fn encoding_failure(e: impl std::fmt::Display) -> EncodeError {
    EncodeError::EncodingFailure(e.to_string())
}

/// Process-wide CLIP image encoder.
pub struct ClipEncoder {
    config: ClipConfig,
    runtime: OnceCell<ClipRuntime>,
}

impl ClipEncoder {
    pub fn new(config: ClipConfig) -> Self {
        Self {
            config,
            runtime: OnceCell::new(),
        }
    }

    // Concurrent first callers block on the same initialization; a failed load is not cached.
    fn runtime(&self) -> Result<&ClipRuntime, EncodeError> {
        self.runtime
            .get_or_try_init(|| ClipRuntime::load(&self.config))
    }
}

impl ImageEncoder for ClipEncoder {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn dimensions(&self) -> usize {
        self.config.dims
    }

    fn encode(&self, image_bytes: &[u8]) -> Result<UnitVector, EncodeError> {
        let rgb = decode_rgb(image_bytes)?;
        let runtime = self.runtime()?;

        let pixel_values = runtime.preprocessing.to_tensor(&rgb);
        let raw = runtime.infer(pixel_values)?;

        if raw.len() != self.config.dims {
            return Err(EncodeError::EncodingFailure(format!(
                "model produced {} values, expected {}",
                raw.len(),
                self.config.dims
            )));
        }

        let embedding = UnitVector::normalize(raw)?;
        tracing::debug!(dims = embedding.dims(), "generated CLIP image embedding");
        Ok(embedding)
    }

    fn warm_up(&self) -> Result<(), EncodeError> {
        self.runtime().map(|_| ())
    }

    fn is_ready(&self) -> bool {
        self.runtime.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_model() -> ClipEncoder {
        ClipEncoder::new(ClipConfig {
            model_path: PathBuf::from("/nonexistent/vision_model.onnx"),
            ..ClipConfig::default()
        })
    }

    #[test]
    fn invalid_bytes_fail_before_model_load() {
        let encoder = missing_model();
        assert!(matches!(
            encoder.encode(b"not an image"),
            Err(EncodeError::InvalidImage(_))
        ));
        assert!(!encoder.is_ready());
    }

    #[test]
    fn missing_weights_are_reported_and_not_cached() {
        let encoder = missing_model();
        assert!(matches!(
            encoder.warm_up(),
            Err(EncodeError::ModelUnavailable(_))
        ));
        assert!(matches!(
            encoder.warm_up(),
            Err(EncodeError::ModelUnavailable(_))
        ));
        assert!(!encoder.is_ready());
        assert_eq!(encoder.dimensions(), CLIP_VIT_B32_DIMS);
        assert_eq!(encoder.model_id(), "openai/clip-vit-base-patch32");
    }
}
