//! Fraud Detection Service - Main Entry Point
//!
//! Loads the classifier and preprocessing table, then serves predictions
//! over HTTP until interrupted.

use anyhow::{Context, Result};
use fraud_detection_service::{
    config::{AppConfig, LoggingConfig, PreprocessingMode},
    metrics::MetricsReporter,
    models::OnnxClassifier,
    preprocessing::Preprocessor,
    server::{create_router, AppState},
    FeatureExtractor,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_detection_service={}", logging.level).parse()?)
        .add_directive("tower_http=info".parse()?);

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn build_preprocessor(config: &AppConfig) -> Result<Preprocessor> {
    match config.preprocessing.mode {
        PreprocessingMode::Fitted => Preprocessor::fitted_from_path(&config.preprocessing.table_path)
            .map(|p| p.reject_unknown_categories(config.preprocessing.reject_unknown_categories))
            .with_context(|| {
                format!(
                    "Failed to load preprocessing table {}",
                    config.preprocessing.table_path
                )
            }),
        PreprocessingMode::SingleRow => {
            warn!("Single-row preprocessing selected: every feature will scale to 0");
            Ok(Preprocessor::SingleRow)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Fraud Detection Service");
    info!(
        threshold = config.model.threshold,
        preprocessing = ?config.preprocessing.mode,
        reject_unknown_categories = config.preprocessing.reject_unknown_categories,
        "Configuration loaded successfully"
    );

    let extractor = FeatureExtractor::new(build_preprocessor(&config)?);
    info!(
        features = extractor.feature_count(),
        mode = extractor.preprocessor().mode_name(),
        "Feature extractor initialized"
    );

    let classifier = OnnxClassifier::load(
        &config.model.path,
        &config.model.name,
        config.model.onnx_threads,
    )?;

    let state = AppState::new(extractor, Arc::new(classifier), config.model.threshold);
    let metrics = state.metrics.clone();

    let reporter = MetricsReporter::new(metrics.clone(), config.server.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let app = create_router(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service stopped");
    metrics.print_summary();
    Ok(())
}
