//! Model artifact bundle: scaler, classifiers and metadata loaded once at startup.
//!
//! Directory layout:
//!
//! ```text
//! <artifact_dir>/
//!   scaler.json               {"mean": [..], "scale": [..]}
//!   logistic_regression.json  {"coefficients": [..], "intercept": f}
//!   knn.json                  {"k": n, "samples": [[..], ..], "labels": [0|1, ..]}
//!   model_metadata.json       {"feature_names": [..], "num_features": n, "knn": {..}, ..}
//! ```

use crate::ml::classifier::{
    KNearestNeighborsModel, KNearestNeighborsParams, LogisticRegressionModel,
    LogisticRegressionParams, TrainedClassifier,
};
use crate::ml::error::{ArtifactError, PipelineError};
use crate::ml::features::FeatureSchema;
use crate::ml::models::{ModelInfo, ModelKind, ModelMetrics};
use crate::ml::scaler::{Scaler, ScalerParams};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info};

pub const SCALER_FILE: &str = "scaler.json";
pub const METADATA_FILE: &str = "model_metadata.json";

/// Contents of `model_metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub feature_names: FeatureSchema,

    pub num_features: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_used: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_samples: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logistic_regression: Option<ModelMetrics>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knn: Option<ModelMetrics>,

    /// Any other training-time fields, kept for the stats view
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl BundleMetadata {
    /// Metadata with only a feature schema and no recorded metrics
    pub fn new(feature_names: FeatureSchema) -> Self {
        Self {
            num_features: feature_names.len(),
            feature_names,
            dataset_used: None,
            training_samples: None,
            logistic_regression: None,
            knn: None,
            extra: HashMap::new(),
        }
    }

    /// Metrics recorded for `kind`; an absent section reads as zeros
    pub fn metrics_for(&self, kind: ModelKind) -> ModelMetrics {
        let section = match kind {
            ModelKind::LogisticRegression => &self.logistic_regression,
            ModelKind::Knn => &self.knn,
        };
        section.clone().unwrap_or_default()
    }
}

/// Everything needed to serve predictions. Immutable once built.
#[derive(Debug, Clone)]
pub struct ModelArtifactBundle {
    source: Option<PathBuf>,
    schema: FeatureSchema,
    scaler: Scaler,
    classifiers: BTreeMap<String, TrainedClassifier>,
    metadata: BundleMetadata,
}

impl ModelArtifactBundle {
    /// Load all four artifacts from `dir`. Either every artifact is valid or
    /// an error is returned; no partial bundle is produced.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();
        info!(artifact_dir = %dir.display(), "Loading model artifact bundle");

        // Check presence of all four first so a missing file wins over a corrupt one
        let scaler_path = dir.join(SCALER_FILE);
        let metadata_path = dir.join(METADATA_FILE);
        let model_paths: Vec<(ModelKind, PathBuf)> = ModelKind::iter()
            .map(|kind| (kind, dir.join(kind.artifact_file())))
            .collect();

        for path in [&scaler_path, &metadata_path]
            .into_iter()
            .chain(model_paths.iter().map(|(_, p)| p))
        {
            if !path.is_file() {
                return Err(ArtifactError::ArtifactMissing(path.clone()));
            }
        }

        let metadata: BundleMetadata = read_json(&metadata_path)?;
        let schema = metadata.feature_names.clone();
        if schema.is_empty() {
            return Err(ArtifactError::corrupt(&metadata_path, "feature_names is empty"));
        }
        if metadata.num_features != schema.len() {
            return Err(ArtifactError::corrupt(
                &metadata_path,
                format!(
                    "num_features is {} but {} feature names are listed",
                    metadata.num_features,
                    schema.len()
                ),
            ));
        }

        let scaler = Scaler::try_from(read_json::<ScalerParams>(&scaler_path)?)
            .map_err(|reason| ArtifactError::corrupt(&scaler_path, reason))?;
        check_dimension(&scaler_path, scaler.dimension(), schema.len())?;

        let mut classifiers = BTreeMap::new();
        for (kind, path) in &model_paths {
            let classifier = match kind {
                ModelKind::LogisticRegression => TrainedClassifier::LogisticRegression(
                    LogisticRegressionModel::try_from(read_json::<LogisticRegressionParams>(path)?)
                        .map_err(|reason| ArtifactError::corrupt(path, reason))?,
                ),
                ModelKind::Knn => TrainedClassifier::KNearestNeighbors(
                    KNearestNeighborsModel::try_from(read_json::<KNearestNeighborsParams>(path)?)
                        .map_err(|reason| ArtifactError::corrupt(path, reason))?,
                ),
            };
            check_dimension(path, classifier.n_features(), schema.len())?;
            debug!(model_id = %kind, path = %path.display(), "Classifier loaded");
            classifiers.insert(kind.to_string(), classifier);
        }

        info!(
            num_features = schema.len(),
            models = classifiers.len(),
            "✅ Model artifact bundle loaded"
        );

        Ok(Self {
            source: Some(dir.to_path_buf()),
            schema,
            scaler,
            classifiers,
            metadata,
        })
    }

    /// Assemble a bundle from in-memory parts, with the same dimension checks as `load`
    pub fn from_parts(
        metadata: BundleMetadata,
        scaler: Scaler,
        classifiers: impl IntoIterator<Item = TrainedClassifier>,
    ) -> Result<Self, ArtifactError> {
        let origin = PathBuf::from("<memory>");
        let schema = metadata.feature_names.clone();
        check_dimension(&origin, scaler.dimension(), schema.len())?;

        let mut map = BTreeMap::new();
        for classifier in classifiers {
            check_dimension(&origin, classifier.n_features(), schema.len())?;
            map.insert(classifier.kind().to_string(), classifier);
        }

        Ok(Self {
            source: None,
            schema,
            scaler,
            classifiers: map,
            metadata,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn metadata(&self) -> &BundleMetadata {
        &self.metadata
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.classifiers.keys().map(String::as_str)
    }

    pub fn has_model(&self, model_id: &str) -> bool {
        self.classifiers.contains_key(model_id)
    }

    /// Look up a classifier by identifier (`"knn"`, `"logistic_regression"`)
    pub fn classifier(&self, model_id: &str) -> Result<&TrainedClassifier, PipelineError> {
        self.classifiers
            .get(model_id)
            .ok_or_else(|| PipelineError::UnknownModelIdentifier(model_id.to_string()))
    }

    /// Model-info view keyed by model identifier
    pub fn model_info(&self) -> BTreeMap<String, ModelInfo> {
        self.classifiers
            .iter()
            .map(|(id, classifier)| {
                let kind = classifier.kind();
                let metrics = self.metadata.metrics_for(kind);
                let k = match classifier {
                    TrainedClassifier::KNearestNeighbors(m) => Some(metrics.k.unwrap_or(m.k())),
                    TrainedClassifier::LogisticRegression(_) => None,
                };
                let info = ModelInfo {
                    model_type: kind.to_string(),
                    accuracy: metrics.accuracy,
                    precision: metrics.precision,
                    recall: metrics.recall,
                    f1_score: metrics.f1_score,
                    k,
                    num_features: self.schema.len(),
                    feature_names: self.schema.names().to_vec(),
                };
                (id.clone(), info)
            })
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ArtifactError::ArtifactMissing(path.to_path_buf()),
        _ => ArtifactError::corrupt(path, e.to_string()),
    })?;
    serde_json::from_slice(&bytes).map_err(|e| ArtifactError::corrupt(path, e.to_string()))
}

fn check_dimension(path: &Path, actual: usize, expected: usize) -> Result<(), ArtifactError> {
    if actual != expected {
        return Err(ArtifactError::corrupt(
            path,
            format!(
                "fitted on {} features but the schema lists {}",
                actual, expected
            ),
        ));
    }
    Ok(())
}
