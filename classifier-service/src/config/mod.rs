use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Location of the exported model, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model/neoplasm_classifier.onnx";

/// Largest accepted upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub common: core_config::Config,
    pub model: ModelConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub path: String,
    pub intra_threads: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    Onnx,
    Mock,
}

impl ClassifierConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let backend: ModelBackend = env_or("MODEL_BACKEND", "onnx")
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        if is_prod && backend == ModelBackend::Mock {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MODEL_BACKEND=mock is not allowed in production"
            )));
        }

        Ok(ClassifierConfig {
            common: common_config,
            model: ModelConfig {
                backend,
                path: env_or("MODEL_PATH", DEFAULT_MODEL_PATH),
                intra_threads: parse_optional("MODEL_INTRA_THREADS")?,
            },
            upload: UploadConfig {
                max_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
        })
    }

    /// Development configuration that needs no model file.
    pub fn mock() -> Self {
        ClassifierConfig {
            common: core_config::Config::default(),
            model: ModelConfig {
                backend: ModelBackend::Mock,
                path: DEFAULT_MODEL_PATH.to_string(),
                intra_threads: None,
            },
            upload: UploadConfig {
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
        }
    }
}

impl std::str::FromStr for ModelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(ModelBackend::Onnx),
            "mock" => Ok(ModelBackend::Mock),
            _ => Err(format!("Invalid model backend: {}", s)),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_optional(key: &str) -> Result<Option<usize>, AppError> {
    match env::var(key) {
        Ok(val) => val.trim().parse().map(Some).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("{} must be a positive integer: {}", key, e))
        }),
        Err(_) => Ok(None),
    }
}
