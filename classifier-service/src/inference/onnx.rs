//! ONNX Runtime backend for the EfficientNetV2-S lesion classifier.
//!
//! The model is the fine-tuned network with its head replaced by a single
//! logit, exported to ONNX with a `(1, 3, 112, 112)` float input.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::{ImageTensor, InferenceError, Scorer};

/// Scorer backed by an ONNX Runtime session loaded once at startup.
pub struct OnnxScorer {
    // `Session::run` takes `&mut self`; the model itself is never changed.
    session: Mutex<Session>,
    path: PathBuf,
}

impl OnnxScorer {
    /// Load the model, failing fast when the file is missing or invalid.
    ///
    /// With the `cuda` feature the CUDA execution provider is registered
    /// first; ONNX Runtime falls back to CPU when no device is available.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or ONNX Runtime rejects it.
    pub fn load(path: &Path, intra_threads: Option<usize>) -> Result<Self, InferenceError> {
        if !path.exists() {
            return Err(InferenceError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let load_err = |e: &dyn std::fmt::Display| InferenceError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut builder = Session::builder()
            .map_err(|e| load_err(&e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(&e))?;

        if let Some(threads) = intra_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| load_err(&e))?;
        }

        #[cfg(feature = "cuda")]
        {
            builder = builder
                .with_execution_providers([ort::ep::CUDA::default().build()])
                .map_err(|e| load_err(&e))?;
        }

        let session = builder.commit_from_file(path).map_err(|e| load_err(&e))?;

        tracing::info!(
            model = %path.display(),
            device = preferred_device(),
            inputs = session.inputs().len(),
            outputs = session.outputs().len(),
            "Loaded classifier model"
        );

        Ok(Self {
            session: Mutex::new(session),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Scorer for OnnxScorer {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn logit(&self, tensor: &ImageTensor) -> Result<f32, InferenceError> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let data: Vec<f32> = tensor.iter().copied().collect();

        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .map_err(|e| InferenceError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InferenceError::Inference("model session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InferenceError::Inference(e.to_string()))?;

        let (output_shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::InvalidOutput(e.to_string()))?;

        let dims: &[i64] = output_shape;
        let logit = match output_data {
            [logit] => *logit,
            _ => {
                return Err(InferenceError::InvalidOutput(format!(
                    "expected a single logit, got shape {dims:?}"
                )))
            }
        };

        Ok(logit)
    }
}

fn preferred_device() -> &'static str {
    if cfg!(feature = "cuda") {
        "cuda (cpu fallback)"
    } else {
        "cpu"
    }
}
