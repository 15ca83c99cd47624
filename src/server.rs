//! HTTP inference endpoint
//!
//! `POST /predict` scores one raw transaction, `GET /health` reports the
//! loaded model and `GET /metrics` serves the current metrics snapshot.

use crate::feature_extractor::FeatureExtractor;
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::models::{Classifier, Prediction};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<FeatureExtractor>,
    pub classifier: Arc<dyn Classifier>,
    /// Probabilities strictly above this are labelled fraud
    pub threshold: f64,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(
        extractor: FeatureExtractor,
        classifier: Arc<dyn Classifier>,
        threshold: f64,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            classifier,
            threshold,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }
}

/// Errors returned to HTTP clients
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or record
    BadRequest(String),
    /// Inference failed; details stay in the log
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                error!("Inference error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        if err.is_client_error() {
            ApiError::BadRequest(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Body of a successful `/predict` response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: u8,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    preprocessing: &'static str,
}

/// Build the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let start = Instant::now();

    let features = match payload
        .map_err(ApiError::from)
        .and_then(|Json(body)| state.extractor.derive_json(body).map_err(ApiError::from))
    {
        Ok(features) => features,
        Err(err) => {
            if let ApiError::BadRequest(msg) = &err {
                warn!(request_id = %request_id, error = %msg, "Rejected prediction request");
                state.metrics.record_rejected();
            } else {
                state.metrics.record_failed();
            }
            return Err(err);
        }
    };

    // session runs block on the model mutex
    let classifier = state.classifier.clone();
    let scored = tokio::task::spawn_blocking(move || classifier.predict_proba(&features)).await;

    let probability = match scored {
        Ok(Ok(p)) => p,
        Ok(Err(e)) => {
            state.metrics.record_failed();
            return Err(ApiError::Internal(format!("request {request_id}: {e:#}")));
        }
        Err(e) => {
            state.metrics.record_failed();
            return Err(ApiError::Internal(format!("request {request_id}: {e}")));
        }
    };

    let prediction = Prediction::from_probability(probability, state.threshold);
    let latency = start.elapsed();
    state
        .metrics
        .record_prediction(latency, prediction.probability, prediction.label);

    debug!(
        request_id = %request_id,
        model = %state.classifier.name(),
        probability = prediction.probability,
        prediction = prediction.label,
        latency_us = latency.as_micros() as u64,
        "Prediction served"
    );

    Ok(Json(PredictResponse {
        prediction: prediction.label,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.classifier.name().to_string(),
        preprocessing: state.extractor.preprocessor().mode_name(),
    })
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
