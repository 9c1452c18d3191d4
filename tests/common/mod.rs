//! Common test utilities: fixture artifact bundles and Prometheus output parsing

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;

pub const FEATURES: [&str; 2] = ["duration", "packets"];

/// Write a two-feature bundle where traffic above 50 packets is an attack.
///
/// Both classifiers agree: logistic regression via `packets - 50`, KNN via
/// three normal samples at 10/20/30 packets and three attacks at 70/80/90.
pub fn write_bundle(dir: &Path) {
    write(dir, "scaler.json", json!({"mean": [0.0, 0.0], "scale": [1.0, 1.0]}));
    write(
        dir,
        "logistic_regression.json",
        json!({"coefficients": [0.0, 1.0], "intercept": -50.0}),
    );
    write(
        dir,
        "knn.json",
        json!({
            "k": 3,
            "samples": [
                [1.0, 10.0], [1.0, 20.0], [1.0, 30.0],
                [1.0, 70.0], [1.0, 80.0], [1.0, 90.0]
            ],
            "labels": [0, 0, 0, 1, 1, 1]
        }),
    );
    write(
        dir,
        "model_metadata.json",
        json!({
            "feature_names": FEATURES,
            "num_features": FEATURES.len(),
            "dataset_used": "fixture",
            "training_samples": 6,
            "logistic_regression": {
                "accuracy": 0.91,
                "precision": 0.9,
                "recall": 0.88,
                "f1_score": 0.89,
                "training_time_seconds": 0.2
            },
            "knn": {
                "k": 3,
                "accuracy": 0.95,
                "precision": 0.94,
                "recall": 0.93,
                "f1_score": 0.935
            }
        }),
    );
}

pub fn write(dir: &Path, name: &str, value: Value) {
    std::fs::write(dir.join(name), serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

pub fn sample(duration: f64, packets: f64) -> Map<String, Value> {
    match json!({"duration": duration, "packets": packets}) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// Parse Prometheus exposition format into metric name -> lines
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            if let Some(name) = line.split_whitespace().nth(2) {
                current_metric = name.to_string();
                metrics
                    .entry(current_metric.clone())
                    .or_insert_with(Vec::new)
                    .push(line.to_string());
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_insert_with(Vec::new)
                .push(line.to_string());
        }
    }

    metrics
}
