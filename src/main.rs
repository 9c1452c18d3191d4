use axum::extract::DefaultBodyLimit;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use traffic_anomaly_detector::{
    api::{build_router, AppState},
    config::Config,
    metrics::{init_metrics, MODEL_BUNDLE_LOADED},
    ml::InferenceService,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    init_tracing(&config);

    tracing::info!(
        service = %config.observability.service_name,
        "Starting traffic anomaly detector v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Load the artifact bundle; the server stays up for liveness if this fails
    tracing::info!(
        artifact_dir = %config.models.artifact_dir.display(),
        "Loading model artifacts"
    );
    let app_state = match InferenceService::from_config(&config) {
        Ok(service) => AppState::new(Arc::new(service)),
        Err(e) => {
            MODEL_BUNDLE_LOADED.set(0.0);
            tracing::error!("Failed to load model artifacts: {}", e);
            tracing::warn!("   Prediction endpoints will answer 503 until restarted with valid artifacts");
            AppState::unavailable(e.to_string())
        }
    };

    let app = build_router(app_state)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Predict: http://{}/api/predict", http_addr);
    tracing::info!("   Metrics: http://{}/metrics", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_directive(&config.observability.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Filter used when `RUST_LOG` is unset; covers the library and this binary
fn default_log_directive(level: &str) -> String {
    format!(
        "traffic_anomaly_detector={level},{bin}={level},tower_http=info",
        bin = module_path!()
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
