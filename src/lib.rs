//! Network traffic anomaly detection: artifact loading, feature validation,
//! scaling and KNN / logistic regression inference served over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ml;

pub use error::{AppError, Result};
