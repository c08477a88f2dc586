//! Common test utilities for the prediction service
//!
//! Builds artifacts the way the training pipeline would persist them and
//! wires up routers over temporary artifact directories.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use ndarray::array;
use outbreak_prediction_api::{
    api::{build_router, AppState},
    artifacts::{
        loader::encode, ArtifactFormat, ArtifactLoader, ArtifactPaths, BinaryLogisticModel,
        ModelArtifact, ScalerArtifact, StandardScaler,
    },
    config::ArtifactsConfig,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const MODEL_FILE: &str = "outbreak_model.json";
pub const SCALER_FILE: &str = "scaler.json";

/// Scaler fitted on four features
pub fn four_feature_scaler() -> ScalerArtifact {
    ScalerArtifact::Standard(StandardScaler::new(
        array![2.5, 2.5, 2.5, 2.5],
        array![1.0, 1.0, 1.0, 1.0],
    ))
}

/// Binary classifier over four scaled features
pub fn four_feature_model() -> ModelArtifact {
    ModelArtifact::LogisticRegression(BinaryLogisticModel::new(array![0.5, 0.5, 0.5, 0.5], 0.0))
}

pub fn write_artifact<T: serde::Serialize>(dir: &Path, file: &str, value: &T, format: ArtifactFormat) {
    let bytes = encode(value, format).expect("encode artifact");
    std::fs::write(dir.join(file), bytes).expect("write artifact");
}

/// Temp directory holding the four-feature model and scaler as JSON
pub fn artifact_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write_artifact(dir.path(), MODEL_FILE, &four_feature_model(), ArtifactFormat::Json);
    write_artifact(dir.path(), SCALER_FILE, &four_feature_scaler(), ArtifactFormat::Json);
    dir
}

pub fn loader_for(dir: &Path) -> ArtifactLoader {
    let config = ArtifactsConfig {
        dir: None,
        model_file: MODEL_FILE.to_string(),
        scaler_file: SCALER_FILE.to_string(),
        format: ArtifactFormat::Auto,
    };
    ArtifactLoader::new(ArtifactPaths::resolve(&config, dir), config.format)
}

/// Router over whatever the loader finds in `dir`
pub fn router_for(dir: &Path) -> Router {
    let state = loader_for(dir).load();
    build_router(AppState::new(Arc::new(state)))
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn json_body(response: Response<Body>) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}
