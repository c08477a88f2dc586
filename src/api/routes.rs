use crate::api::{handlers, AppState};
use crate::metrics::MetricsMiddleware;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    let metrics_enabled = state.metrics_enabled;

    let mut router = Router::new()
        // Health endpoints
        .route("/", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness))
        .route("/health/ready", get(handlers::readiness))
        // Inference
        .route("/predict", post(handlers::predict));

    if metrics_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    let router = router
        // Add state
        .with_state(state)
        // Add middleware
        .layer(CatchPanicLayer::custom(handlers::handle_panic));

    let router = if metrics_enabled {
        router.layer(MetricsMiddleware::layer())
    } else {
        router
    };

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
