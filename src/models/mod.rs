//! Model boundary: ONNX loading and classification

pub mod inference;
pub mod loader;

pub use inference::{Classifier, OnnxClassifier, Prediction};
pub use loader::{LoadedModel, ModelLoader};
