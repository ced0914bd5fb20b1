//! Vision Assist Controller
//!
//! Mode orchestration for the assistance workers:
//! - OFF / INDOOR / OUTDOOR state machine driven by control events
//! - Worker handles with cooperative stop and bounded abort
//! - Indoor guidance, outdoor navigation and hazard alert workers

pub mod config;
pub mod console;
pub mod orchestrator;
pub mod worker;
pub mod workers;

pub use crate::config::{AssistConfig, ConfigError, LogFormat, LoggingConfig};
pub use orchestrator::{ControlEvent, Mode, ModeOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus};
pub use worker::{StopSignal, WorkerError, WorkerExit, WorkerFactory, WorkerFuture, WorkerHandle, WorkerRole};
pub use workers::{AssistWorkerFactory, HazardMonitor, Services};

use metrics_exporter_prometheus::PrometheusBuilder;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = Level::from_str(&config.level)
        .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", config.level)))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = match config.format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    };
    installed.map_err(|e| ConfigError::Invalid(format!("tracing subscriber: {}", e)))
}

/// Expose metrics over HTTP when an address is configured
pub fn init_metrics(config: &LoggingConfig) -> Result<(), ConfigError> {
    let Some(addr) = config.metrics_addr else {
        return Ok(());
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ConfigError::Invalid(format!("metrics exporter on {}: {}", addr, e)))?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}
