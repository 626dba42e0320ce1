//! Carbon footprint library
//!
//! This crate provides the core functionality for:
//! - Sampling host CPU, memory and network activity from /proc
//! - Estimating power, energy and carbon from each sample
//! - Keeping a bounded, time-aligned history of derived figures
//! - Recording projected reductions from optimization strategies
//! - Health checks and observability

pub mod clock;
pub mod collector;
pub mod emission;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod optimization;
pub mod pipeline;

pub use clock::{Clock, ManualClock, RuntimeTracker, SystemClock};
pub use collector::{PollingLoop, PollingLoopBuilder, ProcSampler, SystemSampler};
pub use emission::{EmissionConfig, EmissionModel};
pub use error::{CarbonError, Result};
pub use health::{ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse};
pub use history::{HistorySnapshot, Series, SeriesPoint, TimeSeriesStore};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use optimization::{
    AdvisoryActions, OptimizationActions, OptimizationOutcome, OptimizationRecord,
    OptimizationTracker, SavingsEstimate, Strategy,
};
pub use pipeline::{CarbonPipeline, CarbonPipelineBuilder};
