use crate::artifacts::{LoadedArtifacts, PredictionError, PredictionValue, TransformError};
use crate::inference::models::PredictionRequest;
use crate::metrics::INFERENCE_DURATION_SECONDS;
use ndarray::Array2;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use validator::Validate;

/// Failures of a single inference run.
///
/// All variants are distinct from "service not ready", which is decided
/// before the pipeline is invoked.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed input
    #[error("{0}")]
    Validation(String),

    /// Scaler rejected the sample
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Model failed
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    /// Fault outside the estimators (e.g. a panicking worker)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Inference did not finish within the request timeout
    #[error("inference timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl PipelineError {
    /// Label used for the outcome metric
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Transform(_) => "transform_error",
            PipelineError::Prediction(_) => "prediction_error",
            PipelineError::Internal(_) => "internal_error",
            PipelineError::Timeout(_) => "timeout",
        }
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(err: validator::ValidationErrors) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

/// Stateless validate -> scale -> predict -> normalize pipeline
pub struct InferencePipeline;

impl InferencePipeline {
    /// Score one request against the loaded artifacts.
    ///
    /// CPU-bound; async callers should go through [`Self::run_blocking`].
    pub fn run(
        artifacts: &LoadedArtifacts,
        request: &PredictionRequest,
    ) -> Result<PredictionValue, PipelineError> {
        request.validate()?;

        let n = request.features.len();
        if let Some(expected) = artifacts.scaler.n_features() {
            if expected != n {
                return Err(TransformError::DimensionMismatch { expected, got: n }.into());
            }
        }

        // One row, n columns
        let sample = Array2::from_shape_vec((1, n), request.features.clone())
            .map_err(|e| PipelineError::Validation(format!("cannot reshape features: {}", e)))?;

        let scaled = artifacts.scaler.transform(&sample.view())?;
        let raw = artifacts.model.predict(&scaled.view())?;

        let value = Self::normalize(raw)?;
        debug!(n_features = n, prediction = %value, "Inference completed");
        Ok(value)
    }

    /// Run the pipeline on the blocking pool so concurrent requests and
    /// health checks keep being served. Panics inside the estimators are
    /// contained and reported as [`PipelineError::Internal`].
    pub async fn run_blocking(
        artifacts: LoadedArtifacts,
        request: PredictionRequest,
    ) -> Result<PredictionValue, PipelineError> {
        let start = Instant::now();
        let joined = tokio::task::spawn_blocking(move || Self::run(&artifacts, &request)).await;
        INFERENCE_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

        joined.map_err(|e| {
            if e.is_panic() {
                error!("Inference worker panicked");
                PipelineError::Internal("inference worker panicked".to_string())
            } else {
                PipelineError::Internal(e.to_string())
            }
        })?
    }

    /// [`Self::run_blocking`] bounded by `limit`.
    ///
    /// On timeout the caller gets [`PipelineError::Timeout`]; the blocking
    /// worker cannot be interrupted and runs to completion in the background.
    pub async fn run_with_timeout(
        artifacts: LoadedArtifacts,
        request: PredictionRequest,
        limit: Duration,
    ) -> Result<PredictionValue, PipelineError> {
        match tokio::time::timeout(limit, Self::run_blocking(artifacts, request)).await {
            Ok(result) => result,
            Err(_) => {
                // The dropped future never reached its own observation
                INFERENCE_DURATION_SECONDS.observe(limit.as_secs_f64());
                warn!(timeout_ms = limit.as_millis() as u64, "Inference timed out");
                Err(PipelineError::Timeout(limit))
            }
        }
    }

    /// Reduce the model's per-row output to the single wire value
    fn normalize(raw: Vec<PredictionValue>) -> Result<PredictionValue, PipelineError> {
        let got = raw.len();
        let mut rows = raw.into_iter();
        match (rows.next(), rows.next()) {
            (Some(value), None) if value.is_finite() => Ok(value),
            (Some(_), None) => Err(PredictionError::NonFiniteOutput.into()),
            _ => Err(PredictionError::RowCountMismatch { expected: 1, got }.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{
        LinearModel, Model, ModelArtifact, Scaler, ScalerArtifact, StandardScaler,
    };
    use ndarray::{array, ArrayView2};
    use std::sync::Arc;

    fn artifacts() -> LoadedArtifacts {
        let scaler = ScalerArtifact::Standard(StandardScaler::new(
            array![1.0, 1.0, 1.0, 1.0],
            array![1.0, 1.0, 1.0, 1.0],
        ));
        let model = ModelArtifact::LinearRegression(LinearModel {
            coefficients: array![1.0, 1.0, 1.0, 1.0],
            intercept: 0.5,
        });
        LoadedArtifacts::new(Arc::new(model), Arc::new(scaler))
    }

    struct PanickingModel;

    impl Model for PanickingModel {
        fn predict(&self, _x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
            panic!("estimator bug");
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> &'static str {
            "panicking"
        }
    }

    struct SlowModel(Duration);

    impl Model for SlowModel {
        fn predict(&self, _x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
            std::thread::sleep(self.0);
            Ok(vec![PredictionValue::Class(1)])
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> &'static str {
            "slow"
        }
    }

    struct MultiRowModel;

    impl Model for MultiRowModel {
        fn predict(&self, _x: &ArrayView2<f64>) -> Result<Vec<PredictionValue>, PredictionError> {
            Ok(vec![PredictionValue::Class(0), PredictionValue::Class(1)])
        }

        fn n_features(&self) -> Option<usize> {
            None
        }

        fn kind(&self) -> &'static str {
            "multi_row"
        }
    }

    #[test]
    fn test_run_scales_then_predicts() {
        let request = PredictionRequest::new(vec![1.0, 2.0, 3.0, 4.0]);
        let value = InferencePipeline::run(&artifacts(), &request).unwrap();

        // (0 + 1 + 2 + 3) + 0.5
        assert_eq!(value, PredictionValue::Score(6.5));
    }

    #[test]
    fn test_empty_features_is_validation_error() {
        let request = PredictionRequest::new(vec![]);
        let err = InferencePipeline::run(&artifacts(), &request).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_wrong_width_is_transform_error() {
        let request = PredictionRequest::new(vec![1.0, 2.0]);
        let err = InferencePipeline::run(&artifacts(), &request).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Transform(TransformError::DimensionMismatch { expected: 4, got: 2 })
        ));
        assert!(err.to_string().contains("features"));
    }

    #[test]
    fn test_infinite_feature_is_transform_error() {
        let request = PredictionRequest::new(vec![1.0, f64::INFINITY, 3.0, 4.0]);
        let err = InferencePipeline::run(&artifacts(), &request).unwrap_err();
        assert!(matches!(err, PipelineError::Transform(TransformError::NonFinite { index: 1 })));
    }

    #[test]
    fn test_extra_rows_are_rejected() {
        let scaler: Arc<dyn Scaler> = Arc::new(ScalerArtifact::Identity { n_features: 2 });
        let artifacts = LoadedArtifacts::new(Arc::new(MultiRowModel), scaler);

        let err = InferencePipeline::run(&artifacts, &PredictionRequest::new(vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Prediction(PredictionError::RowCountMismatch { expected: 1, got: 2 })
        ));
    }

    #[tokio::test]
    async fn test_run_blocking_contains_panics() {
        let scaler: Arc<dyn Scaler> = Arc::new(ScalerArtifact::Identity { n_features: 2 });
        let artifacts = LoadedArtifacts::new(Arc::new(PanickingModel), scaler);

        let err = InferencePipeline::run_blocking(artifacts, PredictionRequest::new(vec![1.0, 2.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[tokio::test]
    async fn test_panicking_run_still_records_latency() {
        let scaler: Arc<dyn Scaler> = Arc::new(ScalerArtifact::Identity { n_features: 2 });
        let artifacts = LoadedArtifacts::new(Arc::new(PanickingModel), scaler);
        let before = INFERENCE_DURATION_SECONDS.get_sample_count();

        let _ = InferencePipeline::run_blocking(artifacts, PredictionRequest::new(vec![1.0, 2.0])).await;

        assert!(INFERENCE_DURATION_SECONDS.get_sample_count() > before);
    }

    #[tokio::test]
    async fn test_slow_inference_times_out() {
        let scaler: Arc<dyn Scaler> = Arc::new(ScalerArtifact::Identity { n_features: 2 });
        let artifacts =
            LoadedArtifacts::new(Arc::new(SlowModel(Duration::from_millis(300))), scaler);
        let before = INFERENCE_DURATION_SECONDS.get_sample_count();

        let err = InferencePipeline::run_with_timeout(
            artifacts,
            PredictionRequest::new(vec![1.0, 2.0]),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout(_)));
        assert_eq!(err.kind(), "timeout");
        assert!(err.to_string().contains("timed out after 50ms"));
        assert!(INFERENCE_DURATION_SECONDS.get_sample_count() > before);
    }

    #[tokio::test]
    async fn test_fast_inference_within_timeout() {
        let value = InferencePipeline::run_with_timeout(
            artifacts(),
            PredictionRequest::new(vec![1.0, 2.0, 3.0, 4.0]),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(value, PredictionValue::Score(6.5));
    }

    #[tokio::test]
    async fn test_run_blocking_matches_sync_run() {
        let request = PredictionRequest::new(vec![1.0, 2.0, 3.0, 4.0]);
        let value = InferencePipeline::run_blocking(artifacts(), request).await.unwrap();
        assert_eq!(value, PredictionValue::Score(6.5));
    }
}
