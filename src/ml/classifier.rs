use crate::ml::error::PipelineError;
use crate::ml::models::{ModelKind, LABEL_ATTACK, LABEL_NORMAL};
use linfa_nn::{distance::L2Dist, CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Binary traffic classifier surface shared by every model variant
pub trait Classifier: Send + Sync {
    /// Predict 0 (normal) or 1 (attack) for a scaled vector
    fn predict_label(&self, features: ArrayView1<'_, f64>) -> Result<u8, PipelineError>;

    /// Estimated probability that the label is 1 (attack)
    fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError>;
}

fn check_dimension(expected: usize, features: &ArrayView1<'_, f64>) -> Result<(), PipelineError> {
    if features.len() != expected {
        return Err(PipelineError::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Persisted logistic regression parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Linear model with a sigmoid link
#[derive(Debug, Clone)]
pub struct LogisticRegressionModel {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticRegressionModel {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self, String> {
        if coefficients.is_empty() {
            return Err("logistic regression has no coefficients".to_string());
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err("logistic regression parameters must be finite".to_string());
        }
        Ok(Self {
            coefficients: Array1::from(coefficients),
            intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Signed distance from the decision boundary
    pub fn decision_function(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
        check_dimension(self.n_features(), &features)?;
        Ok(self.coefficients.dot(&features) + self.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Classifier for LogisticRegressionModel {
    fn predict_label(&self, features: ArrayView1<'_, f64>) -> Result<u8, PipelineError> {
        let z = self.decision_function(features)?;
        Ok(if z > 0.0 { LABEL_ATTACK } else { LABEL_NORMAL })
    }

    fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
        Ok(sigmoid(self.decision_function(features)?))
    }
}

impl TryFrom<LogisticRegressionParams> for LogisticRegressionModel {
    type Error = String;

    fn try_from(params: LogisticRegressionParams) -> Result<Self, Self::Error> {
        Self::new(params.coefficients, params.intercept)
    }
}

/// Persisted k-nearest-neighbours model: scaled training points and labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNearestNeighborsParams {
    pub k: usize,
    pub samples: Vec<Vec<f64>>,
    pub labels: Vec<u8>,
}

/// Uniform-weight KNN over Euclidean distance
#[derive(Debug, Clone)]
pub struct KNearestNeighborsModel {
    k: usize,
    samples: Array2<f64>,
    labels: Vec<u8>,
}

impl KNearestNeighborsModel {
    pub fn new(k: usize, samples: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self, String> {
        let n_samples = samples.len();
        if n_samples == 0 {
            return Err("knn has no training samples".to_string());
        }
        if k == 0 || k > n_samples {
            return Err(format!("k must be in 1..={}, got {}", n_samples, k));
        }
        if labels.len() != n_samples {
            return Err(format!(
                "{} samples but {} labels",
                n_samples,
                labels.len()
            ));
        }
        if let Some(bad) = labels.iter().find(|l| **l > LABEL_ATTACK) {
            return Err(format!("label {} is not 0 or 1", bad));
        }

        let n_features = samples[0].len();
        if n_features == 0 {
            return Err("knn samples have no features".to_string());
        }
        if let Some(row) = samples.iter().position(|s| s.len() != n_features) {
            return Err(format!(
                "sample {} has {} features, expected {}",
                row,
                samples[row].len(),
                n_features
            ));
        }

        let flat: Vec<f64> = samples.into_iter().flatten().collect();
        if flat.iter().any(|v| !v.is_finite()) {
            return Err("knn samples must be finite".to_string());
        }
        let samples = Array2::from_shape_vec((n_samples, n_features), flat)
            .map_err(|e| format!("invalid sample matrix: {}", e))?;

        Ok(Self { k, samples, labels })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_features(&self) -> usize {
        self.samples.ncols()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.nrows()
    }

    /// Fraction of the k nearest samples labelled attack
    fn attack_vote(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
        check_dimension(self.n_features(), &features)?;

        // LinearSearch borrows `samples` without preprocessing
        let index = CommonNearestNeighbour::LinearSearch
            .from_batch(&self.samples, L2Dist)
            .map_err(|e| PipelineError::InferenceFailed(format!("knn index: {}", e)))?;
        let neighbours = index
            .k_nearest(features, self.k)
            .map_err(|e| PipelineError::InferenceFailed(format!("knn query: {}", e)))?;

        let attacks = neighbours
            .iter()
            .filter(|(_, idx)| self.labels[*idx] == LABEL_ATTACK)
            .count();

        Ok(attacks as f64 / neighbours.len().max(1) as f64)
    }
}

impl Classifier for KNearestNeighborsModel {
    fn predict_label(&self, features: ArrayView1<'_, f64>) -> Result<u8, PipelineError> {
        let vote = self.attack_vote(features)?;
        Ok(if vote > 0.5 { LABEL_ATTACK } else { LABEL_NORMAL })
    }

    fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
        self.attack_vote(features)
    }
}

impl TryFrom<KNearestNeighborsParams> for KNearestNeighborsModel {
    type Error = String;

    fn try_from(params: KNearestNeighborsParams) -> Result<Self, Self::Error> {
        Self::new(params.k, params.samples, params.labels)
    }
}

/// A classifier loaded from the artifact bundle
#[derive(Debug, Clone)]
pub enum TrainedClassifier {
    LogisticRegression(LogisticRegressionModel),
    KNearestNeighbors(KNearestNeighborsModel),
}

impl TrainedClassifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedClassifier::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedClassifier::KNearestNeighbors(_) => ModelKind::Knn,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            TrainedClassifier::LogisticRegression(m) => m.n_features(),
            TrainedClassifier::KNearestNeighbors(m) => m.n_features(),
        }
    }
}

impl Classifier for TrainedClassifier {
    fn predict_label(&self, features: ArrayView1<'_, f64>) -> Result<u8, PipelineError> {
        match self {
            TrainedClassifier::LogisticRegression(m) => m.predict_label(features),
            TrainedClassifier::KNearestNeighbors(m) => m.predict_label(features),
        }
    }

    fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
        match self {
            TrainedClassifier::LogisticRegression(m) => m.predict_probability(features),
            TrainedClassifier::KNearestNeighbors(m) => m.predict_probability(features),
        }
    }
}
