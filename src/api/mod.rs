pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::artifacts::ServiceState;
use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Artifacts and readiness, fixed after startup
    pub service: Arc<ServiceState>,
    pub service_name: String,
    pub metrics_enabled: bool,
    /// Upper bound on one inference
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<ServiceState>) -> Self {
        Self {
            service,
            service_name: "Outbreak Prediction API".to_string(),
            metrics_enabled: false,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Apply server and observability settings
    pub fn with_config(mut self, config: &Config) -> Self {
        self.service_name = config.observability.service_name.clone();
        self.metrics_enabled = config.observability.prometheus_enabled;
        self.request_timeout = Duration::from_secs(config.server.request_timeout_secs);
        self
    }
}
