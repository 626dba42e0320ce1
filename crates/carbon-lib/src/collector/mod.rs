//! Host metrics collection
//!
//! This module provides the sampler abstraction over the operating system,
//! a /proc backed implementation, and the periodic polling loop that feeds
//! the history store.

mod r#loop;
mod procfs;

#[cfg(test)]
mod tests;

pub use procfs::{CpuTimes, PidStat, ProcSampler, DEFAULT_CPU_SAMPLE_WINDOW, TOP_PROCESSES};
pub use r#loop::{PollStats, PollingConfig, PollingLoop, PollingLoopBuilder, POLL_INTERVAL_SECONDS};

use crate::error::Result;
use crate::models::{ProcessInfo, SystemSnapshot};

pub use async_trait::async_trait;

/// Source of raw host observations
#[async_trait]
pub trait SystemSampler: Send + Sync {
    /// Take one observation. Latency is bounded by the implementation.
    async fn sample(&self) -> Result<SystemSnapshot>;

    /// Up to `limit` processes, busiest first.
    ///
    /// Samplers without a process table list nothing.
    async fn processes(&self, _limit: usize) -> Result<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }
}
