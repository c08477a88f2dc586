/// Inference pipeline
///
/// Turns one [`PredictionRequest`] plus the loaded artifacts into one
/// scalar prediction. Owns no state.

pub mod models;
pub mod pipeline;

pub use models::{PredictionRequest, PredictionResponse};
pub use pipeline::{InferencePipeline, PipelineError};
