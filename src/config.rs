use crate::artifacts::ArtifactFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact locations
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: OUTBREAK_API)
            .add_source(
                config::Environment::with_prefix("OUTBREAK_API")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on one inference (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory holding the artifacts; relative paths are resolved against
    /// the executable's directory, unset means that directory itself
    pub dir: Option<PathBuf>,

    /// Model artifact file name
    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Scaler artifact file name
    #[serde(default = "default_scaler_file")]
    pub scaler_file: String,

    /// Artifact encoding
    #[serde(default)]
    pub format: ArtifactFormat,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            model_file: default_model_file(),
            scaler_file: default_scaler_file(),
            format: ArtifactFormat::Auto,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_model_file() -> String {
    "outbreak_model.json".to_string()
}

fn default_scaler_file() -> String {
    "scaler.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "Outbreak Prediction API".to_string()
}

fn default_true() -> bool {
    true
}
