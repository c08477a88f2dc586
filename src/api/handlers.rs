use crate::api::AppState;
use crate::artifacts::LifecycleState;
use crate::error::{AppError, Result};
use crate::inference::{InferencePipeline, PredictionRequest, PredictionResponse};
use crate::metrics::{gather_metrics, PREDICTIONS_TOTAL};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Health check endpoint.
///
/// Always 200; readiness is carried in the body.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "active".to_string(),
        service: state.service_name.clone(),
        model_loaded: state.service.model_loaded(),
        scaler_loaded: state.service.scaler_loaded(),
        state: state.service.lifecycle(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    pub state: LifecycleState,
    pub version: String,
}

/// Liveness probe
pub async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "alive" }))
}

/// Readiness probe: 503 until both artifacts are loaded
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let service = &state.service;
    let ready = service.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let detail = service.failure().map(str::to_string).or_else(|| {
        service
            .reports()
            .iter()
            .find_map(|report| report.error.clone())
    });

    (
        status,
        Json(ReadinessResponse {
            ready,
            state: service.lifecycle(),
            model_loaded: service.model_loaded(),
            scaler_loaded: service.scaler_loaded(),
            detail,
        }),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub state: LifecycleState,
    pub model_loaded: bool,
    pub scaler_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Score one feature vector
pub async fn predict(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Some(artifacts) = state.service.artifacts() else {
        PREDICTIONS_TOTAL.with_label_values(&["not_ready"]).inc();
        return Err(AppError::NotReady);
    };

    let Json(request) = payload?;

    match InferencePipeline::run_with_timeout(artifacts, request, state.request_timeout).await {
        Ok(prediction) => {
            PREDICTIONS_TOTAL.with_label_values(&["success"]).inc();
            Ok(Json(PredictionResponse::success(prediction)))
        }
        Err(e) => {
            PREDICTIONS_TOTAL.with_label_values(&[e.kind()]).inc();
            Err(e.into())
        }
    }
}

/// Prometheus text exposition
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

/// Last-resort conversion of a handler panic into a structured 500
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let cause = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown fault".to_string()
    };

    AppError::Internal(cause).into_response()
}
