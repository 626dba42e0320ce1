//! Observability infrastructure for the carbon agent
//!
//! Provides:
//! - Prometheus metrics (sample latency, failures, latest power and carbon)
//! - Structured JSON logging with tracing

use crate::models::CarbonSnapshot;
use crate::optimization::OptimizationOutcome;
use prometheus::{
    register_gauge, register_histogram, register_int_counter, register_int_gauge, Gauge,
    Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for sample latency (in seconds). CPU sampling holds a
/// fixed window, so the interesting range is around one second.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 1.1, 1.25, 1.5, 2.0, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    sample_latency_seconds: Histogram,
    sample_errors: IntCounter,
    history_points: IntGauge,
    power_watts: Gauge,
    total_carbon_grams: Gauge,
    optimizations_applied: IntCounter,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            sample_latency_seconds: register_histogram!(
                "carbon_agent_sample_latency_seconds",
                "Time spent sampling the host and deriving a reading",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register sample_latency_seconds"),

            sample_errors: register_int_counter!(
                "carbon_agent_sample_errors_total",
                "Total number of failed sampling cycles"
            )
            .expect("Failed to register sample_errors"),

            history_points: register_int_gauge!(
                "carbon_agent_history_points",
                "Number of points currently held per history series"
            )
            .expect("Failed to register history_points"),

            power_watts: register_gauge!(
                "carbon_agent_power_watts",
                "Estimated system power draw at the latest sample"
            )
            .expect("Failed to register power_watts"),

            total_carbon_grams: register_gauge!(
                "carbon_agent_total_carbon_grams",
                "Estimated cumulative carbon at the latest sample"
            )
            .expect("Failed to register total_carbon_grams"),

            optimizations_applied: register_int_counter!(
                "carbon_agent_optimizations_applied_total",
                "Total number of optimization strategies applied"
            )
            .expect("Failed to register optimizations_applied"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share it.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_sample_latency(&self, duration_secs: f64) {
        self.inner().sample_latency_seconds.observe(duration_secs);
    }

    pub fn inc_sample_errors(&self) {
        self.inner().sample_errors.inc();
    }

    pub fn set_history_points(&self, points: usize) {
        self.inner().history_points.set(points as i64);
    }

    /// Publish the latest reading
    pub fn record_snapshot(&self, snapshot: &CarbonSnapshot) {
        self.inner().power_watts.set(snapshot.reading.power_watts());
        self.inner()
            .total_carbon_grams
            .set(snapshot.reading.total_carbon_g());
    }

    pub fn inc_optimizations_applied(&self) {
        self.inner().optimizations_applied.inc();
    }
}

/// Structured logger for agent events
#[derive(Clone)]
pub struct StructuredLogger {
    host_name: String,
}

impl StructuredLogger {
    pub fn new(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
        }
    }

    pub fn log_startup(&self, version: &str, poll_interval_secs: u64, history_max_points: usize) {
        info!(
            event = "agent_started",
            host = %self.host_name,
            agent_version = %version,
            poll_interval_secs = poll_interval_secs,
            history_max_points = history_max_points,
            "Carbon agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            host = %self.host_name,
            reason = %reason,
            "Carbon agent shutting down"
        );
    }

    /// Log a failed sampling cycle; the loop continues on the next tick
    pub fn log_sample_failure(&self, error: &str, consecutive_failures: u32) {
        warn!(
            event = "sample_failed",
            host = %self.host_name,
            error = %error,
            consecutive_failures = consecutive_failures,
            "Sampling failed, retrying on next tick"
        );
    }

    pub fn log_optimization(&self, outcome: &OptimizationOutcome) {
        info!(
            event = "optimization_applied",
            host = %self.host_name,
            strategy = %outcome.strategy,
            before_carbon_g = ?outcome.record.before_carbon_g,
            after_carbon_g = ?outcome.record.after_carbon_g,
            reduction_percent = ?outcome.record.reduction_percent,
            actions = outcome.actions.len(),
            action_error = ?outcome.action_error,
            "Optimization applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmissionReading, MemoryStats, NetworkCounters};
    use chrono::Utc;

    #[test]
    fn test_agent_metrics_creation() {
        let metrics = AgentMetrics::new();
        let snapshot = CarbonSnapshot {
            sampled_at: Utc::now(),
            cpu_usage_percent: 20.0,
            memory: MemoryStats::default(),
            network: NetworkCounters::default(),
            reading: EmissionReading::new(63.0, 0.01, 5.0, 0.5, 0.2).unwrap(),
        };

        metrics.observe_sample_latency(1.002);
        metrics.inc_sample_errors();
        metrics.set_history_points(42);
        metrics.record_snapshot(&snapshot);
        metrics.inc_optimizations_applied();

        // A second handle shares the registered metrics
        AgentMetrics::new().inc_sample_errors();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-host");
        assert_eq!(logger.host_name, "test-host");
    }
}
