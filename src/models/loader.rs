//! ONNX Runtime setup and session loading for the fraud classifier

use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Input name used by skl2onnx exports when the graph does not report one
const DEFAULT_INPUT: &str = "float_input";
/// Output name used by skl2onnx exports for class probabilities
const DEFAULT_PROBABILITY_OUTPUT: &str = "probabilities";

/// Session plus the tensor names needed to run it
pub struct LoadedModel {
    pub name: String,
    pub session: Session,
    pub input_name: String,
    /// Output carrying class probabilities
    pub output_name: String,
}

/// Builds ONNX sessions with a fixed intra-op thread count
pub struct ModelLoader {
    onnx_threads: usize,
}

impl ModelLoader {
    /// Initialize ONNX Runtime; sessions built by this loader use
    /// `onnx_threads` intra-op threads.
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a classifier exported to ONNX.
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Model file not found: {}", path.display());
        }

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model {} from {}", name, path.display()))?;

        let input_name = input_name(&session);
        let output_name = probability_output(&session);

        info!(
            model = %name,
            path = %path.display(),
            input = %input_name,
            output = %output_name,
            threads = self.onnx_threads,
            "Model loaded"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            output_name,
        })
    }
}

fn input_name(session: &Session) -> String {
    session
        .inputs
        .first()
        .map_or_else(|| DEFAULT_INPUT.to_string(), |i| i.name.clone())
}

/// First output mentioning `prob`, else the last output. Classifier exports
/// emit the label output first.
fn probability_output(session: &Session) -> String {
    session
        .outputs
        .iter()
        .find(|o| o.name.contains("prob"))
        .or_else(|| session.outputs.last())
        .map_or_else(|| DEFAULT_PROBABILITY_OUTPUT.to_string(), |o| o.name.clone())
}
