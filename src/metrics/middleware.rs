/// HTTP middleware for tracking request/response metrics
///
/// Records request count and duration per matched route.

use super::*;
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

/// Factory for the metrics tower layer
#[derive(Clone)]
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Layer that records every route except the scrape endpoint
    pub fn layer() -> MetricsLayer {
        Self::layer_excluding(vec!["/metrics".to_string()])
    }

    /// Layer that skips the given paths
    pub fn layer_excluding(paths: Vec<String>) -> MetricsLayer {
        MetricsLayer {
            excluded_paths: Arc::new(paths),
        }
    }
}

/// Tower layer for metrics middleware
#[derive(Clone)]
pub struct MetricsLayer {
    excluded_paths: Arc<Vec<String>>,
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            excluded_paths: self.excluded_paths.clone(),
        }
    }
}

/// Tower service for metrics collection
#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    excluded_paths: Arc<Vec<String>>,
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
        let path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        if self.excluded_paths.iter().any(|p| p == &path) {
            return Box::pin(self.inner.call(req));
        }

        let start = Instant::now();
        let future = self.inner.call(req);

        Box::pin(async move {
            let response = future.await?;
            let status = response.status().as_u16().to_string();

            HTTP_REQUESTS_TOTAL
                .with_label_values(&[&method, &path, &status])
                .inc();
            HTTP_REQUEST_DURATION_SECONDS
                .with_label_values(&[&method, &path])
                .observe(start.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}
