//! Periodic polling loop
//!
//! Samples the host at a fixed interval and appends the derived figures to
//! the history store. A failed cycle is logged and counted; the loop keeps
//! running until shutdown is signalled.

use crate::error::{CarbonError, Result};
use crate::health::HealthRegistry;
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::pipeline::CarbonPipeline;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default polling interval in seconds
pub const POLL_INTERVAL_SECONDS: u64 = 5;

/// Configuration for the polling loop
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Time between samples (default: 5 seconds)
    pub interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(POLL_INTERVAL_SECONDS),
        }
    }
}

/// Counters returned when the loop stops
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub successes: u64,
    pub failures: u64,
}

/// Loop that periodically samples into the pipeline's history
pub struct PollingLoop {
    pipeline: Arc<CarbonPipeline>,
    config: PollingConfig,
    health: HealthRegistry,
    metrics: Option<AgentMetrics>,
    logger: Option<StructuredLogger>,
}

impl PollingLoop {
    pub fn new(pipeline: Arc<CarbonPipeline>, config: PollingConfig, health: HealthRegistry) -> Self {
        Self {
            pipeline,
            config,
            health,
            metrics: None,
            logger: None,
        }
    }

    /// Run until a shutdown message arrives or the sender is dropped.
    ///
    /// The first sample is taken one interval after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> PollStats {
        info!(
            interval_secs = self.config.interval.as_secs_f64(),
            "Starting polling loop"
        );

        let mut ticker = interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = PollStats::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.tick().await {
                        stats.successes += 1;
                    } else {
                        stats.failures += 1;
                    }
                }
                _ = shutdown.recv() => {
                    info!(
                        successes = stats.successes,
                        failures = stats.failures,
                        "Shutting down polling loop"
                    );
                    break;
                }
            }
        }

        stats
    }

    /// Run one sampling cycle; returns false if it failed
    pub(crate) async fn tick(&self) -> bool {
        let start = Instant::now();
        let result = self.pipeline.poll_once().await;
        let elapsed = start.elapsed();

        let succeeded = match result {
            Ok(snapshot) => {
                self.health.record_success(snapshot.sampled_at).await;
                if let Some(metrics) = &self.metrics {
                    metrics.observe_sample_latency(elapsed.as_secs_f64());
                    metrics.record_snapshot(&snapshot);
                    metrics.set_history_points(self.pipeline.history_store().len().await);
                }
                debug!(
                    elapsed_ms = elapsed.as_millis(),
                    total_carbon_g = snapshot.reading.total_carbon_g(),
                    "Polling cycle complete"
                );
                true
            }
            Err(e) => {
                let message = e.to_string();
                let consecutive = self.health.record_failure(message.clone()).await;
                if let Some(metrics) = &self.metrics {
                    metrics.inc_sample_errors();
                }
                match &self.logger {
                    Some(logger) => logger.log_sample_failure(&message, consecutive),
                    None => warn!(error = %message, consecutive, "Polling cycle failed"),
                }
                false
            }
        };

        self.health.set_ready(true).await;
        succeeded
    }
}

/// Builder for creating the polling loop
pub struct PollingLoopBuilder {
    pipeline: Option<Arc<CarbonPipeline>>,
    config: PollingConfig,
    health: HealthRegistry,
    metrics: Option<AgentMetrics>,
    logger: Option<StructuredLogger>,
}

impl PollingLoopBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: None,
            config: PollingConfig::default(),
            health: HealthRegistry::new(),
            metrics: None,
            logger: None,
        }
    }

    pub fn pipeline(mut self, pipeline: Arc<CarbonPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the polling interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<PollingLoop> {
        let pipeline = self
            .pipeline
            .ok_or_else(|| CarbonError::invalid_parameter("pipeline is required"))?;
        if self.config.interval.is_zero() {
            return Err(CarbonError::invalid_parameter(
                "polling interval must be greater than zero",
            ));
        }

        Ok(PollingLoop {
            pipeline,
            config: self.config,
            health: self.health,
            metrics: self.metrics,
            logger: self.logger,
        })
    }
}

impl Default for PollingLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
