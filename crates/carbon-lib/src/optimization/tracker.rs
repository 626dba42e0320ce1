//! Before/after optimization tracking
//!
//! A two-state machine: `Unset` until the first application, then
//! `Recorded`. Each new application replaces the whole record in a single
//! write so readers never observe a mix of old and new fields.

use crate::error::{CarbonError, Result};
use crate::models::EmissionReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A fully computed before/after projection
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOptimization {
    pub before_carbon_g: f64,
    pub after_carbon_g: f64,
    pub reduction_g: f64,
    pub reduction_percent: f64,
    pub strategy_id: String,
    pub applied_at: DateTime<Utc>,
}

impl AppliedOptimization {
    /// Project the outcome of reducing `before_carbon_g` by `reduction_percent`
    pub fn project(
        before_carbon_g: f64,
        strategy_id: impl Into<String>,
        reduction_percent: f64,
    ) -> Result<Self> {
        validate_reduction_percent(reduction_percent)?;
        if !before_carbon_g.is_finite() || before_carbon_g < 0.0 {
            return Err(CarbonError::invalid_parameter(format!(
                "before_carbon_g must be non-negative, got {}",
                before_carbon_g
            )));
        }

        let after_carbon_g = before_carbon_g * (1.0 - reduction_percent / 100.0);

        Ok(Self {
            before_carbon_g,
            after_carbon_g,
            reduction_g: before_carbon_g - after_carbon_g,
            reduction_percent,
            strategy_id: strategy_id.into(),
            applied_at: Utc::now(),
        })
    }
}

/// Reject reduction percentages outside `0..=100`
pub(crate) fn validate_reduction_percent(reduction_percent: f64) -> Result<()> {
    if !reduction_percent.is_finite() || !(0.0..=100.0).contains(&reduction_percent) {
        return Err(CarbonError::invalid_parameter(format!(
            "reduction_percent must be within 0..=100, got {}",
            reduction_percent
        )));
    }
    Ok(())
}

/// Tracker state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OptimizationState {
    #[default]
    Unset,
    Recorded(AppliedOptimization),
}

/// Externally visible view of the tracker state.
///
/// Numeric fields are `None` until an optimization has been applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub before_carbon_g: Option<f64>,
    pub after_carbon_g: Option<f64>,
    pub reduction_g: Option<f64>,
    pub reduction_percent: Option<f64>,
    pub strategy_id: Option<String>,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl From<&OptimizationState> for OptimizationRecord {
    fn from(state: &OptimizationState) -> Self {
        match state {
            OptimizationState::Unset => OptimizationRecord::default(),
            OptimizationState::Recorded(applied) => OptimizationRecord {
                before_carbon_g: Some(applied.before_carbon_g),
                after_carbon_g: Some(applied.after_carbon_g),
                reduction_g: Some(applied.reduction_g),
                reduction_percent: Some(applied.reduction_percent),
                strategy_id: Some(applied.strategy_id.clone()),
                applied: true,
                applied_at: Some(applied.applied_at),
            },
        }
    }
}

/// Process-wide holder of the most recent optimization record
#[derive(Debug, Clone, Default)]
pub struct OptimizationTracker {
    state: Arc<RwLock<OptimizationState>>,
}

impl OptimizationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an optimization against a reading captured before it ran
    pub async fn apply(
        &self,
        before: &EmissionReading,
        strategy_id: impl Into<String>,
        reduction_percent: f64,
    ) -> Result<OptimizationRecord> {
        let applied =
            AppliedOptimization::project(before.total_carbon_g(), strategy_id, reduction_percent)?;

        info!(
            strategy = %applied.strategy_id,
            before_carbon_g = applied.before_carbon_g,
            after_carbon_g = applied.after_carbon_g,
            reduction_percent = applied.reduction_percent,
            "Optimization recorded"
        );

        let mut state = self.state.write().await;
        *state = OptimizationState::Recorded(applied);
        Ok(OptimizationRecord::from(&*state))
    }

    pub async fn read(&self) -> OptimizationRecord {
        OptimizationRecord::from(&*self.state.read().await)
    }

    pub async fn state(&self) -> OptimizationState {
        self.state.read().await.clone()
    }
}
