pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::error::{AppError, Result};
use crate::ml::InferenceService;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when the artifact bundle failed to load
    pub inference: Option<Arc<InferenceService>>,
    pub load_error: Option<String>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(inference: Arc<InferenceService>) -> Self {
        Self {
            inference: Some(inference),
            load_error: None,
            started_at: Instant::now(),
        }
    }

    /// State for a server that stays up for liveness but cannot predict
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            inference: None,
            load_error: Some(reason.into()),
            started_at: Instant::now(),
        }
    }

    pub fn models_loaded(&self) -> bool {
        self.inference.is_some()
    }

    pub fn require_inference(&self) -> Result<&Arc<InferenceService>> {
        self.inference.as_ref().ok_or_else(|| {
            AppError::ModelsUnavailable(
                self.load_error
                    .clone()
                    .unwrap_or_else(|| "artifact bundle not loaded".to_string()),
            )
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
