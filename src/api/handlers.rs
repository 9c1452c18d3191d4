use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::metrics::gather_metrics;
use crate::ml::{HistoryEntry, InferenceStats, ModelInfo, PredictionResult};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::Validate;

/// Names shown in the example payload of `/api/models/features`
const FEATURE_EXAMPLE_LEN: usize = 10;

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Service banner
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Network Traffic Anomaly Detection API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: BTreeMap::from([
            ("health", "/health"),
            ("models", "/api/models/info"),
            ("features", "/api/models/features"),
            ("predict", "/api/predict"),
            ("batch", "/api/predict/batch"),
            ("stats", "/api/stats"),
            ("history", "/api/history"),
            ("metrics", "/metrics"),
        ]),
    })
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: BTreeMap<&'static str, &'static str>,
}

/// Liveness. Always 200, reports whether models are loaded.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        models_loaded: state.models_loaded(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub models_loaded: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Readiness. 503 until the artifact bundle is loaded.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let inference = state.require_inference()?;
    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
        models: inference.bundle().model_ids().map(str::to_string).collect(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub models: Vec<String>,
}

/// Per-model metrics and feature schema
pub async fn models_info(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, ModelInfo>>> {
    let inference = state.require_inference()?;
    Ok(Json(inference.model_info()))
}

/// Feature schema plus a zero-valued example payload
pub async fn models_features(State(state): State<AppState>) -> Result<Json<FeaturesResponse>> {
    let inference = state.require_inference()?;
    let names = inference.feature_names();

    let example = names
        .iter()
        .take(FEATURE_EXAMPLE_LEN)
        .map(|name| (name.clone(), 0.0))
        .collect();

    Ok(Json(FeaturesResponse {
        feature_names: names.to_vec(),
        num_features: names.len(),
        example,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub feature_names: Vec<String>,
    pub num_features: usize,
    pub example: BTreeMap<String, f64>,
}

/// Classify one traffic sample
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResult>> {
    let Json(request) = payload?;
    request.validate()?;

    let inference = state.require_inference()?;
    let model_id = request
        .model_type
        .as_deref()
        .unwrap_or_else(|| inference.default_model());

    let result = inference.predict(&request.features, model_id)?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictionRequest {
    /// Feature name to numeric value
    pub features: Map<String, Value>,

    /// Model identifier; the configured default when omitted
    #[validate(length(min = 1))]
    pub model_type: Option<String>,
}

/// Classify many samples; per-element failures do not fail the request
pub async fn predict_batch(
    State(state): State<AppState>,
    payload: std::result::Result<Json<BatchPredictionRequest>, JsonRejection>,
) -> Result<Json<BatchPredictionResponse>> {
    let Json(request) = payload?;
    request.validate()?;

    let inference = state.require_inference()?.clone();
    let model_id = request
        .model_type
        .unwrap_or_else(|| inference.default_model().to_string());
    let data = request.data;

    // Up to max_batch_size pipeline runs; keep them off the async workers
    let response = tokio::task::spawn_blocking(move || -> Result<BatchPredictionResponse> {
        let results = inference.predict_batch(&data, &model_id)?;
        Ok(BatchPredictionResponse::new(&model_id, results))
    })
    .await
    .map_err(|e| AppError::Internal(format!("Batch prediction task failed: {}", e)))??;

    Ok(Json(response))
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchPredictionRequest {
    #[validate(length(min = 1))]
    /// Feature objects; other JSON values fail per element
    pub data: Vec<Value>,

    #[validate(length(min = 1))]
    pub model_type: Option<String>,
}

/// One element of a batch response, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchItem {
    Prediction(PredictionResult),
    Failed { error: String, index: usize },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub results: Vec<BatchItem>,
    pub model_used: String,
    pub total_count: usize,
    pub attack_count: usize,
    pub normal_count: usize,
    pub error_count: usize,
}

impl BatchPredictionResponse {
    fn new(
        model_id: &str,
        results: Vec<std::result::Result<PredictionResult, crate::ml::PipelineError>>,
    ) -> Self {
        let total_count = results.len();
        let mut attack_count = 0;
        let mut normal_count = 0;
        let mut error_count = 0;

        let results = results
            .into_iter()
            .enumerate()
            .map(|(index, result)| match result {
                Ok(prediction) => {
                    if prediction.is_attack() {
                        attack_count += 1;
                    } else {
                        normal_count += 1;
                    }
                    BatchItem::Prediction(prediction)
                }
                Err(e) => {
                    error_count += 1;
                    BatchItem::Failed {
                        error: e.to_string(),
                        index,
                    }
                }
            })
            .collect();

        Self {
            results,
            model_used: model_id.to_string(),
            total_count,
            attack_count,
            normal_count,
            error_count,
        }
    }
}

/// Bundle metadata, loaded models and history summary
pub async fn stats(State(state): State<AppState>) -> Result<Json<InferenceStats>> {
    let inference = state.require_inference()?;
    Ok(Json(inference.stats()))
}

/// Recent predictions, oldest first
pub async fn history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryEntry>>> {
    let inference = state.require_inference()?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(inference.history(limit)))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        gather_metrics(),
    )
}
