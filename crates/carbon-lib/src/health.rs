//! Health tracking for the sampling pipeline
//!
//! The sampler is the only component that can fail at runtime. Its status
//! follows the consecutive failure count: any failure degrades it and a
//! run of [`UNHEALTHY_AFTER_FAILURES`] marks it unhealthy. One successful
//! sample restores it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive sampler failures before the agent reports unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 3;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Sampler health and counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerHealth {
    pub status: ComponentStatus,
    pub consecutive_failures: u32,
    pub total_samples: u64,
    pub total_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Default for SamplerHealth {
    fn default() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            consecutive_failures: 0,
            total_samples: 0,
            total_failures: 0,
            last_success: None,
            last_error: None,
        }
    }
}

impl SamplerHealth {
    fn record_success(&mut self, at: DateTime<Utc>) {
        self.status = ComponentStatus::Healthy;
        self.consecutive_failures = 0;
        self.total_samples += 1;
        self.last_success = Some(at);
        self.last_error = None;
    }

    fn record_failure(&mut self, error: String) {
        self.consecutive_failures += 1;
        self.total_failures += 1;
        self.last_error = Some(error);
        self.status = if self.consecutive_failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub sampler: SamplerHealth,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared health state updated by the polling loop
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    sampler: Arc<RwLock<SamplerHealth>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, at: DateTime<Utc>) {
        self.sampler.write().await.record_success(at);
    }

    /// Record a failed sample; returns the consecutive failure count
    pub async fn record_failure(&self, error: impl Into<String>) -> u32 {
        let mut sampler = self.sampler.write().await;
        sampler.record_failure(error.into());
        sampler.consecutive_failures
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let sampler = self.sampler.read().await.clone();
        HealthResponse {
            status: sampler.status,
            sampler,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let status = self.sampler.read().await.status;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("No sampling cycle has completed yet".to_string()),
            }
        } else if !status.is_operational() {
            ReadinessResponse {
                ready: false,
                reason: Some("Sampler unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.sampler.total_samples, 0);
        assert!(health.sampler.last_success.is_none());
    }

    #[tokio::test]
    async fn test_single_failure_degrades() {
        let registry = HealthRegistry::new();
        let failures = registry.record_failure("permission denied").await;

        assert_eq!(failures, 1);
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.sampler.last_error.as_deref(), Some("permission denied"));
    }

    #[tokio::test]
    async fn test_consecutive_failures_become_unhealthy() {
        let registry = HealthRegistry::new();
        for _ in 0..UNHEALTHY_AFTER_FAILURES {
            registry.record_failure("boom").await;
        }

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_success_resets_failures() {
        let registry = HealthRegistry::new();
        registry.record_failure("boom").await;
        registry.record_failure("boom").await;
        registry.record_success(Utc::now()).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.sampler.consecutive_failures, 0);
        assert_eq!(health.sampler.total_failures, 2);
        assert_eq!(health.sampler.total_samples, 1);
        assert!(health.sampler.last_error.is_none());
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_when_degraded_and_unhealthy() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;
        registry.record_failure("boom").await;
        assert!(registry.readiness().await.ready);

        for _ in 1..UNHEALTHY_AFTER_FAILURES {
            registry.record_failure("boom").await;
        }
        assert!(!registry.readiness().await.ready);
    }
}
