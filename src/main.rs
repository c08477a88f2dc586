use anyhow::Context;
use outbreak_prediction_api::{
    api::{build_router, AppState},
    artifacts::ArtifactLoader,
    config::{Config, ObservabilityConfig},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let (config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_tracing(&config.observability);

    if let Some(e) = config_error {
        tracing::warn!("Failed to load configuration: {}", e);
        tracing::warn!("Using default configuration");
    }

    tracing::info!(
        "Starting {} v{}",
        config.observability.service_name,
        env!("CARGO_PKG_VERSION")
    );

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = outbreak_prediction_api::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Load artifacts once; failure leaves the service degraded but running
    let loader = ArtifactLoader::from_config(&config.artifacts);
    tracing::info!("Model artifact: {}", loader.paths().model.display());
    tracing::info!("Scaler artifact: {}", loader.paths().scaler.display());

    let service = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("artifact loader task failed")?;

    if service.is_ready() {
        tracing::info!("✅ Service ready");
    } else {
        tracing::warn!(
            "⚠️  Service degraded: model_loaded={}, scaler_loaded={}",
            service.model_loaded(),
            service.scaler_loaded()
        );
    }

    let app_state = AppState::new(Arc::new(service)).with_config(&config);
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("failed to bind {}", http_addr))?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/", http_addr);
    tracing::info!("   Prediction: http://{}/predict", http_addr);
    if config.observability.prometheus_enabled {
        tracing::info!("   Metrics: http://{}/metrics", http_addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "outbreak_prediction_api={},tower_http=info",
            config.log_level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
