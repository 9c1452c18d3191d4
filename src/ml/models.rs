use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Label value for normal traffic
pub const LABEL_NORMAL: u8 = 0;

/// Label value for attack traffic
pub const LABEL_ATTACK: u8 = 1;

/// Classifier variants shipped in the artifact bundle
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelKind {
    Knn,
    LogisticRegression,
}

impl ModelKind {
    /// Artifact file name holding this model's parameters
    pub fn artifact_file(&self) -> String {
        format!("{}.json", self.as_ref())
    }
}

/// Coarse certainty bucket derived from the distance between probability and 0.5
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, AsRefStr,
)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

/// Margins from the decision boundary that separate confidence tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// `|p - 0.5|` at or above this is High
    #[serde(default = "default_high_margin")]
    pub high_margin: f64,

    /// `|p - 0.5|` at or above this (and below `high_margin`) is Medium
    #[serde(default = "default_medium_margin")]
    pub medium_margin: f64,
}

/// Absorbs rounding in `|p - 0.5|`, e.g. `0.7 - 0.5 == 0.19999999999999996`
const MARGIN_TOLERANCE: f64 = 1e-9;

fn default_high_margin() -> f64 {
    0.4
}

fn default_medium_margin() -> f64 {
    0.2
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            high_margin: default_high_margin(),
            medium_margin: default_medium_margin(),
        }
    }
}

impl ConfidencePolicy {
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |m: f64| (0.0..=0.5).contains(&m);
        if !in_range(self.high_margin) || !in_range(self.medium_margin) {
            return Err(format!(
                "confidence margins must lie in [0, 0.5], got high={} medium={}",
                self.high_margin, self.medium_margin
            ));
        }
        if self.medium_margin > self.high_margin {
            return Err(format!(
                "medium_margin ({}) must not exceed high_margin ({})",
                self.medium_margin, self.high_margin
            ));
        }
        Ok(())
    }

    pub fn tier(&self, probability: f64) -> ConfidenceTier {
        let margin = (probability - 0.5).abs() + MARGIN_TOLERANCE;
        if margin >= self.high_margin {
            ConfidenceTier::High
        } else if margin >= self.medium_margin {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// Outcome of one inference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 0 = normal, 1 = attack
    pub prediction: u8,

    /// Estimated probability of attack
    pub probability: f64,

    pub confidence: ConfidenceTier,

    pub model_used: String,

    pub timestamp: DateTime<Utc>,
}

impl PredictionResult {
    pub fn is_attack(&self) -> bool {
        self.prediction == LABEL_ATTACK
    }
}

/// Offline evaluation metrics recorded at training time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(default)]
    pub accuracy: f64,

    #[serde(default)]
    pub precision: f64,

    #[serde(default)]
    pub recall: f64,

    #[serde(default)]
    pub f1_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_time_seconds: Option<f64>,

    /// Neighbour count, KNN only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
}

/// Per-model description served by the model-info endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    pub num_features: usize,
    pub feature_names: Vec<String>,
}
