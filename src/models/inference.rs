//! Classifier boundary and the ONNX-backed implementation

use crate::models::loader::{LoadedModel, ModelLoader};
use crate::types::FeatureVector;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// A pre-trained binary classifier scoring feature vectors.
///
/// Implementations are shared across request handlers and must be safe to
/// call concurrently.
pub trait Classifier: Send + Sync {
    /// Model name for logs and health output
    fn name(&self) -> &str;

    /// Probability of the fraud class
    fn predict_proba(&self, features: &FeatureVector) -> Result<f64>;

    /// Score many vectors, failing on the first error
    fn predict_proba_batch(&self, batch: &[FeatureVector]) -> Result<Vec<f64>> {
        batch.iter().map(|f| self.predict_proba(f)).collect()
    }
}

/// Binary decision for one transaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Fraud probability (0.0 - 1.0)
    pub probability: f64,
    /// 1 when `probability` is strictly above the threshold
    pub label: u8,
}

impl Prediction {
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        Self {
            probability,
            label: u8::from(probability > threshold),
        }
    }

    pub fn is_fraud(&self) -> bool {
        self.label == 1
    }
}

/// Classifier backed by an ONNX Runtime session.
///
/// Running a session needs exclusive access, so calls are serialized on a
/// mutex.
pub struct OnnxClassifier {
    name: String,
    input_name: String,
    output_name: String,
    session: Mutex<ort::session::Session>,
}

impl OnnxClassifier {
    /// Initialize ONNX Runtime and load the model at `path`.
    pub fn load<P: AsRef<Path>>(path: P, name: &str, onnx_threads: usize) -> Result<Self> {
        let loader = ModelLoader::with_threads(onnx_threads)?;
        Ok(Self::from_loaded(loader.load_model(path, name)?))
    }

    pub fn from_loaded(model: LoadedModel) -> Self {
        Self {
            name: model.name,
            input_name: model.input_name,
            output_name: model.output_name,
            session: Mutex::new(model.session),
        }
    }

    /// Extract fraud probability from model output.
    /// Handles both tensor outputs and the seq(map) outputs of tree exporters.
    fn extract_probability(&self, outputs: &ort::session::SessionOutputs) -> Result<f64> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            let dtype = output.dtype();

            if let Ok(tensor) = output.try_extract_tensor::<f32>() {
                let (shape, data) = tensor;
                let prob = extract_fraud_prob_from_tensor(&shape, data);
                debug!(model = %self.name, prob = prob, "Extracted from tensor");
                return Ok(prob);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(prob) = self.extract_from_sequence_map(output) {
                    return Ok(prob);
                }
            }
        }

        // Fallback: any non-label output that yields a probability
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }

            let dtype = output.dtype();

            if let Ok(tensor) = output.try_extract_tensor::<f32>() {
                let (shape, data) = tensor;
                let prob = extract_fraud_prob_from_tensor(&shape, data);
                debug!(model = %self.name, output = %name, prob = prob, "Extracted from tensor (fallback)");
                return Ok(prob);
            }

            if DynSequenceValueType::can_downcast(&dtype) {
                if let Ok(prob) = self.extract_from_sequence_map(&output) {
                    return Ok(prob);
                }
            }
        }

        warn!(model = %self.name, "No probability output found");
        anyhow::bail!("model {} produced no probability output", self.name)
    }

    /// Extract probability from seq(map(int64, float)) format
    fn extract_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let map_value = maps
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

        let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;

        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
            debug!(model = %self.name, prob = *prob, "Extracted from seq(map)");
            return Ok(*prob as f64);
        }
        if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
            return Ok(1.0 - *prob as f64);
        }

        Err(anyhow::anyhow!("No probability found in map"))
    }
}

/// Fraud-class probability from a `[batch, classes]` or `[classes]` tensor.
fn extract_fraud_prob_from_tensor(shape: &ort::tensor::Shape, data: &[f32]) -> f64 {
    let dims: Vec<i64> = shape.iter().copied().collect();
    let num_classes = dims.last().copied().unwrap_or(0);

    match (dims.len(), num_classes) {
        (1 | 2, n) if n >= 2 => data.get(1).map_or(0.5, |&v| v as f64),
        (1 | 2, 1) => data.first().map_or(0.5, |&v| v as f64),
        _ => data.last().map_or(0.5, |&v| v as f64),
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<f64> {
        use ort::value::Tensor;

        let values = features.to_f32_vec();
        let shape = vec![1_i64, values.len() as i64];
        let input_tensor =
            Tensor::from_array((shape, values)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        self.extract_probability(&outputs)
    }
}
