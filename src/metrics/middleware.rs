//! HTTP middleware recording request count, duration and in-flight requests

use super::{HTTP_CONNECTIONS_ACTIVE, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};
use axum::{
    extract::{MatchedPath, Request},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::{Layer, Service};

/// Paths never recorded; scraping should not inflate request counts
const DEFAULT_EXCLUDED_PATHS: &[&str] = &["/metrics"];

/// Entry point for building the metrics tower layer
#[derive(Clone, Default)]
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Layer with the default path exclusions
    pub fn layer() -> MetricsLayer {
        Self::layer_excluding(DEFAULT_EXCLUDED_PATHS.iter().map(|p| p.to_string()))
    }

    /// Layer that skips the given route paths
    pub fn layer_excluding(paths: impl IntoIterator<Item = String>) -> MetricsLayer {
        MetricsLayer {
            excluded: Arc::new(paths.into_iter().collect()),
        }
    }
}

/// Tower layer for metrics middleware
#[derive(Clone)]
pub struct MetricsLayer {
    excluded: Arc<Vec<String>>,
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            excluded: self.excluded.clone(),
        }
    }
}

/// Tower service for metrics collection
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    excluded: Arc<Vec<String>>,
}

fn route_path(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

impl<S> Service<Request> for MetricsService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let method = req.method().to_string();
        let path = route_path(&req);

        if self.excluded.iter().any(|p| p == &path) {
            return Box::pin(self.inner.call(req));
        }

        HTTP_CONNECTIONS_ACTIVE.inc();
        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let result = future.await;

            // Always decrement active connections
            HTTP_CONNECTIONS_ACTIVE.dec();

            if let Ok(response) = &result {
                let status = response.status().as_u16().to_string();
                HTTP_REQUESTS_TOTAL
                    .with_label_values(&[&method, &path, &status])
                    .inc();
                HTTP_REQUEST_DURATION_SECONDS
                    .with_label_values(&[&method, &path])
                    .observe(start.elapsed().as_secs_f64());
            }

            result
        })
    }
}
