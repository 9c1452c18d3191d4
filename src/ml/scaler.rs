use crate::ml::error::PipelineError;
use crate::ml::features::FeatureVector;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Persisted StandardScaler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Fitted per-feature standardization: `(x - center) / spread`
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    center: Array1<f64>,
    spread: Array1<f64>,
}

impl Scaler {
    /// Build a scaler from fitted parameters.
    ///
    /// Zero spreads become 1.0 so constant features pass through centred,
    /// the same way scikit-learn handles them.
    pub fn new(center: Vec<f64>, spread: Vec<f64>) -> Result<Self, String> {
        if center.len() != spread.len() {
            return Err(format!(
                "center has {} entries but spread has {}",
                center.len(),
                spread.len()
            ));
        }
        if let Some(i) = center
            .iter()
            .chain(spread.iter())
            .position(|v| !v.is_finite())
        {
            return Err(format!("non-finite scaler parameter at position {}", i));
        }
        if spread.iter().any(|s| *s < 0.0) {
            return Err("spread must not be negative".to_string());
        }

        let spread = spread
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect::<Array1<f64>>();

        Ok(Self {
            center: Array1::from(center),
            spread,
        })
    }

    /// Pass-through scaler for `n` features
    pub fn identity(n: usize) -> Self {
        Self {
            center: Array1::zeros(n),
            spread: Array1::ones(n),
        }
    }

    pub fn dimension(&self) -> usize {
        self.center.len()
    }

    /// Standardize a validated vector
    pub fn transform(&self, vector: &FeatureVector) -> Result<Array1<f64>, PipelineError> {
        if vector.len() != self.dimension() {
            return Err(PipelineError::DimensionMismatch {
                expected: self.dimension(),
                actual: vector.len(),
            });
        }

        let raw = Array1::from(vector.values().to_vec());
        Ok((raw - &self.center) / &self.spread)
    }
}

impl TryFrom<ScalerParams> for Scaler {
    type Error = String;

    fn try_from(params: ScalerParams) -> Result<Self, Self::Error> {
        Scaler::new(params.mean, params.scale)
    }
}
