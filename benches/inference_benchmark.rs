//! Criterion benchmarks for the inference pipeline
//!
//! These benchmarks measure:
//! - Feature validation of a raw JSON map
//! - Single predictions per model
//! - Batch throughput

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{Map, Value};
use std::sync::Arc;
use traffic_anomaly_detector::config::InferenceConfig;
use traffic_anomaly_detector::ml::{
    BundleMetadata, FeatureSchema, InferenceService, KNearestNeighborsModel,
    LogisticRegressionModel, ModelArtifactBundle, Scaler, TrainedClassifier,
};

const N_FEATURES: usize = 40;
const N_SAMPLES: usize = 2_000;

/// Deterministic pseudo-random values in [0, 1)
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn feature_names() -> Vec<String> {
    (0..N_FEATURES).map(|i| format!("feature_{}", i)).collect()
}

fn build_service() -> InferenceService {
    let mut rng = Lcg(42);
    let names = feature_names();

    let samples: Vec<Vec<f64>> = (0..N_SAMPLES)
        .map(|_| (0..N_FEATURES).map(|_| rng.next()).collect())
        .collect();
    let labels = samples.iter().map(|s| u8::from(s[0] > 0.5)).collect();

    let knn = KNearestNeighborsModel::new(5, samples, labels).unwrap();
    let lr = LogisticRegressionModel::new((0..N_FEATURES).map(|_| rng.next() - 0.5).collect(), 0.1)
        .unwrap();

    let mut metadata = BundleMetadata::new(FeatureSchema::new(names));
    metadata.training_samples = Some(N_SAMPLES);
    let bundle = ModelArtifactBundle::from_parts(
        metadata,
        Scaler::identity(N_FEATURES),
        vec![
            TrainedClassifier::KNearestNeighbors(knn),
            TrainedClassifier::LogisticRegression(lr),
        ],
    )
    .unwrap();

    InferenceService::new(Arc::new(bundle), &InferenceConfig::default())
}

fn raw_sample(rng: &mut Lcg) -> Map<String, Value> {
    feature_names()
        .into_iter()
        .map(|name| (name, Value::from(rng.next())))
        .collect()
}

/// Benchmark schema validation alone
fn bench_validation(c: &mut Criterion) {
    let service = build_service();
    let raw = raw_sample(&mut Lcg(7));

    c.bench_function("validate_features", |b| {
        b.iter(|| service.bundle().schema().validate(black_box(&raw)).unwrap());
    });
}

/// Benchmark a single prediction per model
fn bench_predict(c: &mut Criterion) {
    let service = build_service();
    let raw = raw_sample(&mut Lcg(7));

    let mut group = c.benchmark_group("predict");
    for model in ["logistic_regression", "knn"] {
        group.bench_with_input(BenchmarkId::from_parameter(model), &model, |b, model| {
            b.iter(|| service.predict(black_box(&raw), model).unwrap());
        });
    }
    group.finish();
}

/// Benchmark batch throughput
fn bench_batch(c: &mut Criterion) {
    let service = build_service();
    let mut rng = Lcg(11);

    let mut group = c.benchmark_group("predict_batch");
    for size in [10usize, 100, 1_000] {
        let items: Vec<Value> = (0..size)
            .map(|_| Value::Object(raw_sample(&mut rng)))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("logistic_regression", size), &items, |b, items| {
            b.iter(|| {
                service
                    .predict_batch(black_box(items), "logistic_regression")
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validation, bench_predict, bench_batch);
criterion_main!(benches);
