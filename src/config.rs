use crate::ml::ConfidencePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Artifact bundle location
    pub models: ModelsConfig,

    /// Inference pipeline tuning
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        let config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: ANOMALY_DETECTOR)
            .add_source(
                config::Environment::with_prefix("ANOMALY_DETECTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.inference.validate().map_err(config::ConfigError::Message)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Request body limit (bytes); large batches exceed axum's 2 MiB default
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory holding scaler, classifier and metadata artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Model used when a request omits `model_type`
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Upper bound on elements per batch request
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Prediction history entries kept for trend display
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Confidence tier margins
    #[serde(default)]
    pub confidence: ConfidencePolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            max_batch_size: default_max_batch_size(),
            history_capacity: default_history_capacity(),
            confidence: ConfidencePolicy::default(),
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_model.trim().is_empty() {
            return Err("inference.default_model must not be empty".to_string());
        }
        if self.max_batch_size == 0 {
            return Err("inference.max_batch_size must be at least 1".to_string());
        }
        self.confidence
            .validate()
            .map_err(|e| format!("inference.confidence: {}", e))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./models")
}

fn default_model() -> String {
    "knn".to_string()
}

fn default_max_batch_size() -> usize {
    10_000
}

fn default_history_capacity() -> usize {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "traffic-anomaly-detector".to_string()
}

fn default_true() -> bool {
    true
}
