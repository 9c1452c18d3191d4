use crate::config::{Config, InferenceConfig};
use crate::error::{AppError, Result};
use crate::metrics::{
    BATCH_SIZE, MODEL_BUNDLE_LOADED, PREDICTIONS_TOTAL, PREDICTION_DURATION_SECONDS,
    PREDICTION_ERRORS_TOTAL,
};
use crate::ml::artifacts::{BundleMetadata, ModelArtifactBundle};
use crate::ml::error::{ArtifactError, PipelineError, ValidationError};
use crate::ml::models::{ConfidencePolicy, ModelInfo, ModelKind, PredictionResult};
use crate::ml::predictor;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use strum::IntoEnumIterator;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// `model` label recorded for identifiers the bundle does not contain
pub const UNKNOWN_MODEL_LABEL: &str = "unknown";

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// One successful prediction kept for trend display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,

    #[serde(flatten)]
    pub result: PredictionResult,
}

/// Aggregate view over the retained history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Successful predictions since startup, including evicted entries
    pub total_recorded: u64,
    pub retained: usize,
    pub capacity: usize,
    pub attack_count: usize,
    pub normal_count: usize,
    pub attack_rate: f64,
    pub last_prediction_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceStats {
    pub metadata: BundleMetadata,
    pub num_features: usize,
    pub models_loaded: BTreeMap<String, bool>,
    pub history: HistorySummary,
}

/// Validate, scale and classify requests against a loaded artifact bundle
pub struct InferenceService {
    bundle: Arc<ModelArtifactBundle>,

    policy: ConfidencePolicy,

    default_model: String,

    max_batch_size: usize,

    history_capacity: usize,

    history: Mutex<VecDeque<HistoryEntry>>,

    total_recorded: AtomicU64,
}

impl InferenceService {
    pub fn new(bundle: Arc<ModelArtifactBundle>, config: &InferenceConfig) -> Self {
        if !bundle.has_model(&config.default_model) {
            warn!(
                model_id = %config.default_model,
                "Default model is not present in the artifact bundle"
            );
        }

        Self {
            bundle,
            policy: config.confidence,
            default_model: config.default_model.clone(),
            max_batch_size: config.max_batch_size,
            history_capacity: config.history_capacity,
            history: Mutex::new(VecDeque::with_capacity(config.history_capacity.min(1024))),
            total_recorded: AtomicU64::new(0),
        }
    }

    /// Load the bundle from `models.artifact_dir` and build the service
    pub fn from_config(config: &Config) -> std::result::Result<Self, ArtifactError> {
        let bundle = ModelArtifactBundle::load(&config.models.artifact_dir)?;
        MODEL_BUNDLE_LOADED.set(1.0);
        info!(
            default_model = %config.inference.default_model,
            max_batch_size = config.inference.max_batch_size,
            "Inference service ready with models [{}]",
            bundle.model_ids().collect::<Vec<_>>().join(", ")
        );
        Ok(Self::new(Arc::new(bundle), &config.inference))
    }

    pub fn bundle(&self) -> &ModelArtifactBundle {
        &self.bundle
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    /// Run the full pipeline for one raw feature map
    pub fn predict(
        &self,
        raw: &Map<String, Value>,
        model_id: &str,
    ) -> std::result::Result<PredictionResult, PipelineError> {
        let start = Instant::now();

        match self.run_pipeline(raw, model_id) {
            Ok(result) => {
                PREDICTION_DURATION_SECONDS
                    .with_label_values(&[model_id])
                    .observe(start.elapsed().as_secs_f64());
                let label = if result.is_attack() { "attack" } else { "normal" };
                PREDICTIONS_TOTAL.with_label_values(&[model_id, label]).inc();
                debug!(
                    model_id,
                    prediction = result.prediction,
                    probability = result.probability,
                    confidence = %result.confidence,
                    "Prediction completed"
                );
                self.record(&result);
                Ok(result)
            }
            Err(err) => {
                self.record_failure(model_id, &err);
                Err(err)
            }
        }
    }

    /// Apply [`predict`](Self::predict) to each element independently.
    ///
    /// `results[i]` always corresponds to `items[i]`; an element that is not
    /// a JSON object fails on its own. The batch is rejected as a whole only
    /// when it exceeds `max_batch_size` or names a model the bundle does not
    /// contain.
    pub fn predict_batch(
        &self,
        items: &[Value],
        model_id: &str,
    ) -> Result<Vec<std::result::Result<PredictionResult, PipelineError>>> {
        if items.len() > self.max_batch_size {
            return Err(AppError::BatchTooLarge {
                size: items.len(),
                limit: self.max_batch_size,
            });
        }
        self.bundle.classifier(model_id)?;

        BATCH_SIZE.observe(items.len() as f64);
        let results: Vec<_> = items
            .iter()
            .map(|item| match item {
                Value::Object(raw) => self.predict(raw, model_id),
                other => {
                    let err = PipelineError::from(ValidationError::NotAnObject(json_kind(other)));
                    self.record_failure(model_id, &err);
                    Err(err)
                }
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            model_id,
            total = results.len(),
            failed,
            "Batch prediction completed"
        );

        Ok(results)
    }

    /// Model label for metrics; client-supplied identifiers outside the
    /// bundle collapse into one series
    fn metric_label<'a>(&self, model_id: &'a str) -> &'a str {
        if self.bundle.has_model(model_id) {
            model_id
        } else {
            UNKNOWN_MODEL_LABEL
        }
    }

    fn record_failure(&self, model_id: &str, err: &PipelineError) {
        let class = err.error_class();
        PREDICTION_ERRORS_TOTAL
            .with_label_values(&[self.metric_label(model_id), class])
            .inc();
        if err.is_internal() {
            error!(model_id, error_class = class, "Pipeline contract violation: {}", err);
        } else {
            debug!(model_id, error_class = class, "Rejected prediction input: {}", err);
        }
    }

    fn run_pipeline(
        &self,
        raw: &Map<String, Value>,
        model_id: &str,
    ) -> std::result::Result<PredictionResult, PipelineError> {
        let classifier = self.bundle.classifier(model_id)?;
        let vector = self.bundle.schema().validate(raw)?;
        let scaled = self.bundle.scaler().transform(&vector)?;
        predictor::predict(&scaled, classifier, model_id, &self.policy)
    }

    fn record(&self, result: &PredictionResult) {
        self.total_recorded.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity == 0 {
            return;
        }

        let mut history = self.history.lock();
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(HistoryEntry {
            id: Uuid::new_v4(),
            result: result.clone(),
        });
    }

    /// Most recent `limit` entries, oldest first
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn history_summary(&self) -> HistorySummary {
        let history = self.history.lock();
        let attack_count = history.iter().filter(|e| e.result.is_attack()).count();
        let retained = history.len();
        let attack_rate = if retained == 0 {
            0.0
        } else {
            attack_count as f64 / retained as f64
        };

        HistorySummary {
            total_recorded: self.total_recorded.load(Ordering::Relaxed),
            retained,
            capacity: self.history_capacity,
            attack_count,
            normal_count: retained - attack_count,
            attack_rate,
            last_prediction_at: history.back().map(|e| e.result.timestamp),
        }
    }

    pub fn stats(&self) -> InferenceStats {
        let models_loaded = ModelKind::iter()
            .map(|kind| (kind.to_string(), self.bundle.has_model(kind.as_ref())))
            .collect();

        InferenceStats {
            metadata: self.bundle.metadata().clone(),
            num_features: self.bundle.schema().len(),
            models_loaded,
            history: self.history_summary(),
        }
    }

    pub fn model_info(&self) -> BTreeMap<String, ModelInfo> {
        self.bundle.model_info()
    }

    pub fn feature_names(&self) -> &[String] {
        self.bundle.schema().names()
    }
}
