//! Fraud Detection Service Library
//!
//! Feature derivation and ONNX inference behind a small HTTP API, plus the
//! data-quality, time-series merge and evaluation helpers used when preparing
//! and validating the model.

pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod server;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use feature_extractor::FeatureExtractor;
pub use models::{Classifier, OnnxClassifier, Prediction};
pub use preprocessing::Preprocessor;
pub use server::{create_router, AppState};
pub use types::{FeatureVector, RawTransaction};
