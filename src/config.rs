//! Configuration management for the fraud detection service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
/// Environment variable naming an alternative configuration file
pub const CONFIG_PATH_ENV: &str = "FRAUD_CONFIG";

/// How categorical encoding and scaling are parameterized
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingMode {
    /// Encoders and ranges loaded from a pre-fit table
    #[default]
    Fitted,
    /// Encoders and ranges fit on the request itself (every feature scales to 0)
    SingleRow,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between metrics summaries in the log
    pub metrics_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            metrics_interval_secs: 60,
        }
    }
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// ONNX model file
    pub path: String,
    /// Name reported in logs and on `/health`
    pub name: String,
    /// Probabilities strictly above this are labelled fraud
    pub threshold: f64,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/fraud_detection_rfc.onnx".to_string(),
            name: "random_forest".to_string(),
            threshold: 0.5,
            onnx_threads: 1,
        }
    }
}

/// Feature preprocessing configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub mode: PreprocessingMode,
    /// Pre-fit encoder/range table, read in `fitted` mode
    pub table_path: String,
    /// Answer 400 for categories missing from the table instead of
    /// encoding them with the reserved unknown code
    pub reject_unknown_categories: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            mode: PreprocessingMode::Fitted,
            table_path: "config/preprocessing.json".to_string(),
            reject_unknown_categories: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `FRAUD_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path, then apply `FRAUD__*` overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("FRAUD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.model.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("model.threshold must be within [0, 1], got {threshold}");
        }
        if self.model.onnx_threads == 0 {
            anyhow::bail!("model.onnx_threads must be at least 1");
        }
        Ok(())
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
