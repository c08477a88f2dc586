//! Process-wide artifact state.
//!
//! A [`ServiceState`] is produced once by the loader during startup and is
//! read-only afterwards. Request handlers share it through an `Arc` and never
//! take a lock. Reloading would require swapping the whole `Arc` rather than
//! mutating in place.

use crate::artifacts::model::Model;
use crate::artifacts::scaler::Scaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Startup state machine: `Uninitialized -> Ready | Degraded`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    /// Load not yet attempted
    Uninitialized,

    /// Both artifacts loaded and compatible
    Ready,

    /// Load attempted and at least one artifact is unusable
    Degraded,
}

impl LifecycleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LifecycleState::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactKind {
    Model,
    Scaler,
}

/// Outcome of loading one artifact, kept for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    pub loaded: bool,
    pub size_bytes: Option<u64>,
    pub sha256: Option<String>,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl ArtifactReport {
    pub fn loaded(kind: ArtifactKind, path: PathBuf, size_bytes: u64, sha256: String) -> Self {
        Self {
            artifact: kind,
            path,
            loaded: true,
            size_bytes: Some(size_bytes),
            sha256: Some(sha256),
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn failed(kind: ArtifactKind, path: PathBuf, error: String) -> Self {
        Self {
            artifact: kind,
            path,
            loaded: false,
            size_bytes: None,
            sha256: None,
            error: Some(error),
            attempted_at: Utc::now(),
        }
    }
}

/// Both artifacts, borrowed out of a ready [`ServiceState`]
#[derive(Clone)]
pub struct LoadedArtifacts {
    pub model: Arc<dyn Model>,
    pub scaler: Arc<dyn Scaler>,
}

impl LoadedArtifacts {
    pub fn new(model: Arc<dyn Model>, scaler: Arc<dyn Scaler>) -> Self {
        Self { model, scaler }
    }
}

/// Write-once container for the model and scaler
pub struct ServiceState {
    model: Option<Arc<dyn Model>>,
    scaler: Option<Arc<dyn Scaler>>,
    lifecycle: LifecycleState,
    reports: Vec<ArtifactReport>,
    failure: Option<String>,
}

impl ServiceState {
    /// State before any load attempt
    pub fn uninitialized() -> Self {
        Self {
            model: None,
            scaler: None,
            lifecycle: LifecycleState::Uninitialized,
            reports: Vec::new(),
            failure: None,
        }
    }

    /// Fold the loader's results into a terminal startup state.
    ///
    /// `failure` carries a cross-artifact problem (e.g. incompatible widths)
    /// that forces `Degraded` even when both files decoded. A degraded state
    /// holds neither artifact; what did decode is still visible in `reports`.
    pub fn from_load(
        model: Option<Arc<dyn Model>>,
        scaler: Option<Arc<dyn Scaler>>,
        reports: Vec<ArtifactReport>,
        failure: Option<String>,
    ) -> Self {
        match (model, scaler, failure) {
            (Some(model), Some(scaler), None) => Self {
                model: Some(model),
                scaler: Some(scaler),
                lifecycle: LifecycleState::Ready,
                reports,
                failure: None,
            },
            (_, _, failure) => Self {
                model: None,
                scaler: None,
                lifecycle: LifecycleState::Degraded,
                reports,
                failure,
            },
        }
    }

    /// Ready state from in-memory artifacts, bypassing the filesystem
    pub fn ready(model: Arc<dyn Model>, scaler: Arc<dyn Scaler>) -> Self {
        Self::from_load(Some(model), Some(scaler), Vec::new(), None)
    }

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn scaler_loaded(&self) -> bool {
        self.scaler.is_some()
    }

    pub fn reports(&self) -> &[ArtifactReport] {
        &self.reports
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Both artifacts when the service is ready, `None` otherwise
    pub fn artifacts(&self) -> Option<LoadedArtifacts> {
        if !self.is_ready() {
            return None;
        }
        match (&self.model, &self.scaler) {
            (Some(model), Some(scaler)) => Some(LoadedArtifacts::new(model.clone(), scaler.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceState")
            .field("lifecycle", &self.lifecycle)
            .field("model_loaded", &self.model_loaded())
            .field("scaler_loaded", &self.scaler_loaded())
            .field("failure", &self.failure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::model::{LinearModel, ModelArtifact};
    use crate::artifacts::scaler::ScalerArtifact;
    use ndarray::array;

    fn model() -> Arc<dyn Model> {
        Arc::new(ModelArtifact::LinearRegression(LinearModel {
            coefficients: array![1.0, 1.0],
            intercept: 0.0,
        }))
    }

    fn scaler() -> Arc<dyn Scaler> {
        Arc::new(ScalerArtifact::Identity { n_features: 2 })
    }

    #[test]
    fn test_uninitialized_is_not_ready() {
        let state = ServiceState::uninitialized();
        assert_eq!(state.lifecycle(), LifecycleState::Uninitialized);
        assert!(state.artifacts().is_none());
    }

    #[test]
    fn test_both_loaded_is_ready() {
        let state = ServiceState::ready(model(), scaler());
        assert_eq!(state.lifecycle(), LifecycleState::Ready);
        assert!(state.artifacts().is_some());
    }

    #[test]
    fn test_partial_load_is_degraded() {
        let state = ServiceState::from_load(Some(model()), None, Vec::new(), None);

        assert_eq!(state.lifecycle(), LifecycleState::Degraded);
        assert!(!state.model_loaded());
        assert!(!state.scaler_loaded());
        assert!(state.artifacts().is_none());
    }

    #[test]
    fn test_cross_artifact_failure_is_degraded() {
        let state = ServiceState::from_load(
            Some(model()),
            Some(scaler()),
            Vec::new(),
            Some("incompatible".to_string()),
        );

        assert_eq!(state.lifecycle(), LifecycleState::Degraded);
        assert!(!state.model_loaded());
        assert!(!state.scaler_loaded());
        assert!(state.artifacts().is_none());
        assert_eq!(state.failure(), Some("incompatible"));
    }

    #[test]
    fn test_lifecycle_display() {
        assert_eq!(LifecycleState::Ready.to_string(), "ready");
        assert_eq!(LifecycleState::Degraded.to_string(), "degraded");
    }
}
