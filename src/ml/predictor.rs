use crate::ml::classifier::Classifier;
use crate::ml::error::PipelineError;
use crate::ml::models::{ConfidencePolicy, PredictionResult, LABEL_ATTACK};
use ndarray::Array1;

/// Run `classifier` on an already-scaled vector and attach a confidence tier
pub fn predict(
    scaled: &Array1<f64>,
    classifier: &dyn Classifier,
    model_id: &str,
    policy: &ConfidencePolicy,
) -> Result<PredictionResult, PipelineError> {
    let label = classifier.predict_label(scaled.view())?;
    let probability = classifier.predict_probability(scaled.view())?;

    if label > LABEL_ATTACK || !(0.0..=1.0).contains(&probability) {
        return Err(PipelineError::InferenceFailed(format!(
            "model '{}' produced label {} with probability {}",
            model_id, label, probability
        )));
    }

    Ok(PredictionResult {
        prediction: label,
        probability,
        confidence: policy.tier(probability),
        model_used: model_id.to_string(),
        timestamp: chrono::Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::models::ConfidenceTier;
    use ndarray::{array, ArrayView1};

    /// Flags heavy traffic: attack with p=0.95 once `packets` (index 1) exceeds 50
    struct PacketThreshold;

    impl Classifier for PacketThreshold {
        fn predict_label(&self, features: ArrayView1<'_, f64>) -> Result<u8, PipelineError> {
            Ok(u8::from(features[1] > 50.0))
        }

        fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
            Ok(if features[1] > 50.0 { 0.95 } else { 0.3 })
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict_label(&self, _: ArrayView1<'_, f64>) -> Result<u8, PipelineError> {
            Ok(1)
        }

        fn predict_probability(&self, _: ArrayView1<'_, f64>) -> Result<f64, PipelineError> {
            Ok(1.7)
        }
    }

    #[test]
    fn test_heavy_traffic_is_high_confidence_attack() {
        let result = predict(
            &array![10.0, 80.0],
            &PacketThreshold,
            "knn",
            &ConfidencePolicy::default(),
        )
        .unwrap();

        assert_eq!(result.prediction, 1);
        assert_eq!(result.probability, 0.95);
        assert_eq!(result.confidence, ConfidenceTier::High);
        assert_eq!(result.model_used, "knn");
        assert!(result.is_attack());
    }

    #[test]
    fn test_light_traffic_is_medium_confidence_normal() {
        let result = predict(
            &array![10.0, 20.0],
            &PacketThreshold,
            "knn",
            &ConfidencePolicy::default(),
        )
        .unwrap();

        assert_eq!(result.prediction, 0);
        assert_eq!(result.confidence, ConfidenceTier::Medium);
    }

    #[test]
    fn test_policy_is_respected() {
        let strict = ConfidencePolicy {
            high_margin: 0.49,
            medium_margin: 0.46,
        };
        let result = predict(&array![0.0, 80.0], &PacketThreshold, "knn", &strict).unwrap();
        assert_eq!(result.confidence, ConfidenceTier::Low);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let policy = ConfidencePolicy::default();
        let x = array![3.0, 51.0];
        let a = predict(&x, &PacketThreshold, "knn", &policy).unwrap();
        let b = predict(&x, &PacketThreshold, "knn", &policy).unwrap();
        assert_eq!(a.prediction, b.prediction);
        assert_eq!(a.probability, b.probability);
    }

    #[test]
    fn test_out_of_range_probability_is_internal_error() {
        let err = predict(
            &array![0.0, 0.0],
            &Broken,
            "logistic_regression",
            &ConfidencePolicy::default(),
        )
        .unwrap_err();
        assert!(err.is_internal());
    }
}
