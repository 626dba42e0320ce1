//! Optimization strategies and before/after tracking
//!
//! This module provides:
//! - The built-in strategy catalog with projected reductions
//! - The advisory actions run when a strategy is applied
//! - The tracker holding the most recent before/after record

mod actions;
mod strategy;
mod tracker;

pub use actions::{ActionStatus, AdvisoryActions, OptimizationAction, OptimizationActions};
pub use strategy::{SavingsEstimate, Strategy};
pub use tracker::{AppliedOptimization, OptimizationRecord, OptimizationState, OptimizationTracker};
pub(crate) use tracker::validate_reduction_percent;

use serde::{Deserialize, Serialize};

/// Result of applying a strategy: the recorded projection and what was done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOutcome {
    pub strategy: Strategy,
    pub record: OptimizationRecord,
    pub actions: Vec<OptimizationAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_error: Option<String>,
}
