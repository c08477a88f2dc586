//! Outbreak Prediction API
//!
//! Loads a trained model and feature scaler once at startup and serves
//! synchronous predictions over HTTP.
//!
//! - [`artifacts`]: deserializes the model and scaler and owns the startup
//!   readiness state machine
//! - [`inference`]: the stateless validate, scale, predict and normalize pipeline
//! - [`api`]: axum routes for health, readiness, prediction and metrics

pub mod api;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod inference;
pub mod metrics;

pub use error::{AppError, Result};
