//! Inference pipeline for network traffic anomaly detection
//!
//! A request flows through:
//! - [`FeatureSchema::validate`]: raw JSON map to an ordered [`FeatureVector`]
//! - [`Scaler::transform`]: per-feature standardization
//! - [`predict`]: classifier label and probability plus a [`ConfidenceTier`]
//!
//! [`ModelArtifactBundle`] holds the immutable artifacts loaded at startup and
//! [`InferenceService`] wires them to the HTTP layer.

pub mod artifacts;
pub mod classifier;
pub mod error;
pub mod features;
pub mod models;
pub mod predictor;
pub mod scaler;
pub mod service;

pub use artifacts::{BundleMetadata, ModelArtifactBundle};
pub use classifier::{
    Classifier, KNearestNeighborsModel, LogisticRegressionModel, TrainedClassifier,
};
pub use error::{ArtifactError, PipelineError, ValidationError};
pub use features::{validate, FeatureSchema, FeatureVector};
pub use models::{
    ConfidencePolicy, ConfidenceTier, ModelInfo, ModelKind, ModelMetrics, PredictionResult,
    LABEL_ATTACK, LABEL_NORMAL,
};
pub use predictor::predict;
pub use scaler::Scaler;
pub use service::{HistoryEntry, HistorySummary, InferenceService, InferenceStats};
