//! PCOS prediction server
//!
//! Loads the classifier bundle once at startup and serves the prediction
//! form, the durable history and the CSV export over HTTP.

use anyhow::{Context, Result};
use pcos_core::{
    health::{Component, HealthRegistry},
    observability::{PcosMetrics, StructuredLogger},
    predictor::ModelBundle,
    FeatureCatalog, HistoryStore, PredictionPipeline, Predictor,
};
use pcos_server::{api, config::ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::load()?;

    let json_logs = !config.text_logs();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json_logs.then(|| fmt::layer().json()))
        .with((!json_logs).then(|| fmt::layer()))
        .init();

    info!(instance = %config.instance_name, "Starting pcos-server");

    let health_registry = HealthRegistry::new();
    health_registry.register(Component::Predictor).await;
    health_registry.register(Component::HistoryStore).await;

    let metrics = PcosMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);

    // No model, no service
    let catalog = Arc::new(FeatureCatalog::pcos());
    let loaded = ModelBundle::new(&config.model_manifest)
        .load(&catalog)
        .map_err(|e| {
            error!(manifest = %config.model_manifest.display(), error = %e, "Failed to load model");
            e
        })
        .with_context(|| format!("loading model bundle {}", config.model_manifest.display()))?;

    let model_version = loaded.manifest.version.clone();
    logger.log_model_loaded(&model_version, &loaded.checksum, loaded.manifest.features.len());
    metrics.set_model_version(&model_version, &loaded.checksum);
    health_registry.model_loaded(&model_version).await;

    let store = HistoryStore::new(&config.history_path);
    if !health_registry.check_history_store(&store).await.is_operational() {
        warn!(path = %store.path().display(), "History store is not writable, predictions will fail");
    }

    let predictor = Predictor::new(Arc::new(loaded.classifier), catalog);
    let pipeline = PredictionPipeline::new(predictor, store, logger.clone());
    let app_state = Arc::new(
        api::AppState::new(pipeline, health_registry.clone(), metrics)
            .with_session_limits(config.session_ttl(), config.max_sessions),
    );
    tokio::spawn(api::expire_sessions_loop(app_state.clone(), SESSION_SWEEP_INTERVAL));

    logger.log_startup(SERVER_VERSION, &model_version);

    let addr = config.listen_addr();
    let api_handle = tokio::spawn(api::serve(addr, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    logger.log_shutdown("API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
