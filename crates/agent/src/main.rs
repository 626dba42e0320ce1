//! Carbon Agent - host carbon footprint monitor
//!
//! This binary samples the host on a fixed interval, keeps a bounded
//! history of derived carbon figures and serves them over HTTP.

use anyhow::{Context, Result};
use carbon_agent::{api, config::AgentConfig};
use carbon_lib::{
    collector::{PollingLoopBuilder, ProcSampler},
    health::HealthRegistry,
    observability::{AgentMetrics, StructuredLogger},
    optimization::AdvisoryActions,
    pipeline::CarbonPipeline,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting carbon-agent");

    let config = AgentConfig::load()?;
    info!(host = %config.host_name, proc_root = %config.proc_root.display(), "Agent configured");

    let sampler = ProcSampler::new(&config.proc_root).with_cpu_window(config.cpu_sample_window());
    let pipeline = CarbonPipeline::builder()
        .sampler(Arc::new(sampler))
        .emission(config.emission_config())
        .history_max_points(config.history_max_points)
        .actions(Arc::new(AdvisoryActions::new(
            &config.sys_root,
            &config.proc_root,
        )))
        .build()
        .context("Failed to build carbon pipeline")?;
    let pipeline = Arc::new(pipeline);

    let health_registry = HealthRegistry::new();
    let metrics = AgentMetrics::new();
    let logger = StructuredLogger::new(&config.host_name);
    logger.log_startup(
        AGENT_VERSION,
        config.poll_interval_secs,
        config.history_max_points,
    );

    let polling = PollingLoopBuilder::new()
        .pipeline(pipeline.clone())
        .interval(config.poll_interval())
        .health(health_registry.clone())
        .metrics(metrics.clone())
        .logger(logger.clone())
        .build()
        .context("Invalid polling configuration")?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let polling_handle = tokio::spawn(polling.run(shutdown_rx));

    let app_state = Arc::new(api::AppState::new(
        pipeline,
        health_registry,
        metrics,
        logger.clone(),
    ));

    // Start the API server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
            }
        }
    }

    let _ = shutdown_tx.send(());
    let stats = polling_handle.await.context("Polling loop task failed")?;
    info!(
        successes = stats.successes,
        failures = stats.failures,
        "Shutting down"
    );

    Ok(())
}
