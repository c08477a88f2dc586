/// Artifact store adapter and startup lifecycle
///
/// Deserializes the trained model and feature scaler produced by the
/// training pipeline and turns the outcome into the process-wide
/// [`ServiceState`].

pub mod error;
pub mod loader;
pub mod model;
pub mod scaler;
pub mod state;

pub use error::{ArtifactResult, PredictionError, StartupArtifactError, TransformError};
pub use loader::{deployment_dir, ArtifactFormat, ArtifactLoader, ArtifactPaths};
pub use model::{BinaryLogisticModel, LinearModel, Model, ModelArtifact, PredictionValue};
pub use scaler::{MinMaxScaler, Scaler, ScalerArtifact, StandardScaler};
pub use state::{ArtifactKind, ArtifactReport, LifecycleState, LoadedArtifacts, ServiceState};
