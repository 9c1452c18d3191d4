use crate::api::{handlers, AppState};
use crate::metrics::MetricsMiddleware;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::readiness_check))
        // Model introspection
        .route("/api/models/info", get(handlers::models_info))
        .route("/api/models/features", get(handlers::models_features))
        // Inference
        .route("/api/predict", post(handlers::predict))
        .route("/api/predict/batch", post(handlers::predict_batch))
        .route("/api/stats", get(handlers::stats))
        .route("/api/history", get(handlers::history))
        // Prometheus scrape endpoint
        .route("/metrics", get(handlers::metrics))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(MetricsMiddleware::layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
