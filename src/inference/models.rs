use crate::artifacts::PredictionValue;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single sample to score
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    /// Ordered feature values; width must match the fitted artifacts
    #[validate(length(min = 1, message = "features must not be empty"))]
    pub features: Vec<f64>,
}

impl PredictionRequest {
    pub fn new(features: Vec<f64>) -> Self {
        Self { features }
    }
}

/// Successful prediction body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub prediction: PredictionValue,
    pub status: String,
}

impl PredictionResponse {
    pub fn success(prediction: PredictionValue) -> Self {
        Self {
            prediction,
            status: "success".to_string(),
        }
    }
}
