//! On-demand carbon pipeline
//!
//! Owns the sampler, the emission model, the history store and the
//! optimization tracker. Every logical operation takes exactly one sample
//! and derives all of its figures from it.

use crate::clock::{Clock, RuntimeTracker, SystemClock};
use crate::collector::SystemSampler;
use crate::emission::{EmissionConfig, EmissionModel};
use crate::error::{CarbonError, Result};
use crate::history::{HistoryPoint, HistorySnapshot, Series, SeriesPoint, TimeSeriesStore, HISTORY_MAX_POINTS};
use crate::models::{CarbonSnapshot, ProcessInfo, Sample};
use crate::optimization::{
    validate_reduction_percent, AdvisoryActions, OptimizationActions, OptimizationOutcome,
    OptimizationRecord, OptimizationTracker, SavingsEstimate, Strategy,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared state behind the polling loop and the request handlers
pub struct CarbonPipeline {
    sampler: Arc<dyn SystemSampler>,
    model: EmissionModel,
    runtime: RuntimeTracker,
    history: TimeSeriesStore,
    tracker: OptimizationTracker,
    actions: Arc<dyn OptimizationActions>,
}

impl CarbonPipeline {
    pub fn builder() -> CarbonPipelineBuilder {
        CarbonPipelineBuilder::new()
    }

    pub fn model(&self) -> &EmissionModel {
        &self.model
    }

    pub fn runtime(&self) -> &RuntimeTracker {
        &self.runtime
    }

    pub fn history_store(&self) -> &TimeSeriesStore {
        &self.history
    }

    pub fn tracker(&self) -> &OptimizationTracker {
        &self.tracker
    }

    /// Take one sample and stamp it with the pipeline clock
    pub async fn sample(&self) -> Result<Sample> {
        let snapshot = self.sampler.sample().await?;
        Sample::new(snapshot, self.runtime.now())
    }

    /// Fresh sample plus the reading computed from it
    pub async fn current_reading(&self) -> Result<CarbonSnapshot> {
        let sample = self.sample().await?;
        let runtime = self.runtime.runtime_at(sample.timestamp());
        let reading = self.model.reading(&sample, runtime)?;

        Ok(CarbonSnapshot::new(
            &sample,
            reading,
            self.runtime.wall_time(sample.timestamp()),
        ))
    }

    /// Sample, compute and append one history point
    pub async fn poll_once(&self) -> Result<CarbonSnapshot> {
        let snapshot = self.current_reading().await?;
        self.history
            .push(snapshot.sampled_at, HistoryPoint::from_snapshot(&snapshot))
            .await?;

        debug!(
            cpu_percent = snapshot.cpu_usage_percent,
            total_carbon_g = snapshot.reading.total_carbon_g(),
            "History point appended"
        );
        Ok(snapshot)
    }

    /// Busiest processes as reported by the sampler
    pub async fn top_processes(&self, limit: usize) -> Result<Vec<ProcessInfo>> {
        self.sampler.processes(limit).await
    }

    pub async fn history(&self) -> HistorySnapshot {
        self.history.snapshot().await
    }

    pub async fn history_series(&self, series: Series) -> Vec<SeriesPoint> {
        self.history.read(series).await
    }

    /// Capture a before-reading and record a projected reduction against it.
    ///
    /// Any side-effecting action must run after this capture; use
    /// [`apply_strategy`](Self::apply_strategy) to get that ordering.
    pub async fn apply_optimization(
        &self,
        strategy_id: &str,
        reduction_percent: f64,
    ) -> Result<OptimizationRecord> {
        validate_reduction_percent(reduction_percent)?;

        let before = self.current_reading().await?;
        self.tracker
            .apply(&before.reading, strategy_id, reduction_percent)
            .await
    }

    /// Capture, run the strategy's actions, then record the projection
    pub async fn apply_strategy(&self, strategy: Strategy) -> Result<OptimizationOutcome> {
        let before = self.current_reading().await?;

        let (actions, action_error) = match self.actions.apply(strategy).await {
            Ok(actions) => (actions, None),
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "Optimization actions failed");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let record = self
            .tracker
            .apply(&before.reading, strategy.id(), strategy.reduction_percent())
            .await?;

        Ok(OptimizationOutcome {
            strategy,
            record,
            actions,
            action_error,
        })
    }

    pub async fn optimization_record(&self) -> OptimizationRecord {
        self.tracker.read().await
    }

    /// Projected savings of every strategy against a fresh reading
    pub async fn estimate_savings(&self) -> Result<Vec<SavingsEstimate>> {
        let current = self.current_reading().await?;
        let total = current.reading.total_carbon_g();

        Ok(Strategy::ALL
            .iter()
            .map(|strategy| strategy.estimate_savings(total))
            .collect())
    }
}

/// Builder for [`CarbonPipeline`]
pub struct CarbonPipelineBuilder {
    sampler: Option<Arc<dyn SystemSampler>>,
    clock: Arc<dyn Clock>,
    emission: EmissionConfig,
    history_max_points: usize,
    actions: Option<Arc<dyn OptimizationActions>>,
}

impl CarbonPipelineBuilder {
    pub fn new() -> Self {
        Self {
            sampler: None,
            clock: Arc::new(SystemClock),
            emission: EmissionConfig::default(),
            history_max_points: HISTORY_MAX_POINTS,
            actions: None,
        }
    }

    pub fn sampler(mut self, sampler: Arc<dyn SystemSampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn emission(mut self, config: EmissionConfig) -> Self {
        self.emission = config;
        self
    }

    pub fn history_max_points(mut self, max_points: usize) -> Self {
        self.history_max_points = max_points;
        self
    }

    pub fn actions(mut self, actions: Arc<dyn OptimizationActions>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Build the pipeline; runtime starts counting now
    pub fn build(self) -> Result<CarbonPipeline> {
        let sampler = self
            .sampler
            .ok_or_else(|| CarbonError::invalid_parameter("sampler is required"))?;

        Ok(CarbonPipeline {
            sampler,
            model: EmissionModel::new(self.emission)?,
            runtime: RuntimeTracker::new(self.clock),
            history: TimeSeriesStore::new(self.history_max_points)?,
            tracker: OptimizationTracker::new(),
            actions: self
                .actions
                .unwrap_or_else(|| Arc::new(AdvisoryActions::default())),
        })
    }
}

impl Default for CarbonPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
