//! Bounded time-series history of derived metrics
//!
//! Every tracked series shares one timestamp sequence so that index `i`
//! refers to the same poll in each of them. Appends add a value to every
//! series at once and eviction trims every series by the same count.

use crate::error::{CarbonError, Result};
use crate::models::{CarbonSnapshot, BYTES_PER_MB};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default number of points retained per series
pub const HISTORY_MAX_POINTS: usize = 100;

/// A tracked metric series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    /// CPU utilisation, percent
    Cpu,
    /// Cumulative network traffic, MB
    Network,
    /// Total carbon, grams CO₂
    Carbon,
    /// Cumulative energy, Wh
    Energy,
}

impl Series {
    pub const ALL: [Series; 4] = [Series::Cpu, Series::Network, Series::Carbon, Series::Energy];

    fn index(self) -> usize {
        match self {
            Series::Cpu => 0,
            Series::Network => 1,
            Series::Carbon => 2,
            Series::Energy => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Series::Cpu => "cpu",
            Series::Network => "network",
            Series::Carbon => "carbon",
            Series::Energy => "energy",
        }
    }

    /// Unit label for display
    pub fn unit(&self) -> &'static str {
        match self {
            Series::Cpu => "%",
            Series::Network => "MB",
            Series::Carbon => "g CO₂",
            Series::Energy => "Wh",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Series {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Series::Cpu),
            "network" => Ok(Series::Network),
            "carbon" => Ok(Series::Carbon),
            "energy" => Ok(Series::Energy),
            other => Err(CarbonError::invalid_parameter(format!(
                "unknown series '{}'",
                other
            ))),
        }
    }
}

/// One value per tracked series for a single poll
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub cpu_usage_percent: f64,
    pub network_mb: f64,
    pub carbon_g: f64,
    pub energy_wh: f64,
}

impl HistoryPoint {
    /// Extract the tracked values from a snapshot
    pub fn from_snapshot(snapshot: &CarbonSnapshot) -> Self {
        Self {
            cpu_usage_percent: snapshot.cpu_usage_percent,
            network_mb: snapshot.network.total_bytes() as f64 / BYTES_PER_MB,
            carbon_g: snapshot.reading.total_carbon_g(),
            energy_wh: snapshot.reading.energy_wh(),
        }
    }

    pub fn to_values(&self) -> HashMap<Series, f64> {
        HashMap::from([
            (Series::Cpu, self.cpu_usage_percent),
            (Series::Network, self.network_mb),
            (Series::Carbon, self.carbon_g),
            (Series::Energy, self.energy_wh),
        ])
    }
}

/// A single timestamped value of one series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Copy of every series at one moment, oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub timestamps: Vec<DateTime<Utc>>,
    pub cpu_usage: Vec<f64>,
    pub network_mb: Vec<f64>,
    pub carbon_emissions: Vec<f64>,
    pub energy_consumption: Vec<f64>,
}

impl HistorySnapshot {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Index-aligned FIFO buffer. Single-threaded; share it via [`TimeSeriesStore`].
#[derive(Debug)]
pub struct HistoryBuffer {
    max_points: usize,
    timestamps: VecDeque<DateTime<Utc>>,
    series: [VecDeque<f64>; 4],
}

impl HistoryBuffer {
    pub fn new(max_points: usize) -> Result<Self> {
        if max_points == 0 {
            return Err(CarbonError::invalid_parameter(
                "history_max_points must be at least 1",
            ));
        }

        let capacity = max_points + 1;
        Ok(Self {
            max_points,
            timestamps: VecDeque::with_capacity(capacity),
            series: std::array::from_fn(|_| VecDeque::with_capacity(capacity)),
        })
    }

    pub fn max_points(&self) -> usize {
        self.max_points
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Append one value to every series.
    ///
    /// All inputs are validated before anything is written, so a rejected
    /// append leaves the buffer untouched.
    pub fn append(&mut self, timestamp: DateTime<Utc>, values: &HashMap<Series, f64>) -> Result<()> {
        let mut row = [0.0f64; 4];
        for series in Series::ALL {
            let value = *values.get(&series).ok_or(CarbonError::MissingSeries(series))?;
            if !value.is_finite() {
                return Err(CarbonError::invalid_parameter(format!(
                    "value for series '{}' is not finite",
                    series
                )));
            }
            row[series.index()] = value;
        }

        if let Some(last) = self.timestamps.back() {
            if timestamp < *last {
                return Err(CarbonError::invalid_parameter(format!(
                    "timestamp {} precedes last entry {}",
                    timestamp, last
                )));
            }
        }

        self.timestamps.push_back(timestamp);
        for (values, value) in self.series.iter_mut().zip(row) {
            values.push_back(value);
        }

        let overflow = self.timestamps.len().saturating_sub(self.max_points);
        if overflow > 0 {
            self.timestamps.drain(..overflow);
            for values in self.series.iter_mut() {
                values.drain(..overflow);
            }
        }

        Ok(())
    }

    pub fn read(&self, series: Series) -> Vec<SeriesPoint> {
        self.timestamps
            .iter()
            .zip(self.series[series.index()].iter())
            .map(|(timestamp, value)| SeriesPoint {
                timestamp: *timestamp,
                value: *value,
            })
            .collect()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let column = |series: Series| self.series[series.index()].iter().copied().collect();

        HistorySnapshot {
            timestamps: self.timestamps.iter().copied().collect(),
            cpu_usage: column(Series::Cpu),
            network_mb: column(Series::Network),
            carbon_emissions: column(Series::Carbon),
            energy_consumption: column(Series::Energy),
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
        for values in self.series.iter_mut() {
            values.clear();
        }
    }
}

/// Shared handle to a [`HistoryBuffer`].
///
/// Appends hold the write lock for the whole push-and-evict, so readers
/// never see a partially evicted set.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    inner: Arc<RwLock<HistoryBuffer>>,
}

impl TimeSeriesStore {
    pub fn new(max_points: usize) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(RwLock::new(HistoryBuffer::new(max_points)?)),
        })
    }

    pub async fn append(&self, timestamp: DateTime<Utc>, values: &HashMap<Series, f64>) -> Result<()> {
        self.inner.write().await.append(timestamp, values)
    }

    /// Append a full point
    pub async fn push(&self, timestamp: DateTime<Utc>, point: HistoryPoint) -> Result<()> {
        self.append(timestamp, &point.to_values()).await
    }

    pub async fn read(&self, series: Series) -> Vec<SeriesPoint> {
        self.inner.read().await.read(series)
    }

    pub async fn snapshot(&self) -> HistorySnapshot {
        self.inner.read().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(offset_secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs)
    }

    fn point(i: usize) -> HistoryPoint {
        let i = i as f64;
        HistoryPoint {
            cpu_usage_percent: i,
            network_mb: i * 2.0,
            carbon_g: i * 3.0,
            energy_wh: i * 4.0,
        }
    }

    #[test]
    fn test_empty_history() {
        let buffer = HistoryBuffer::new(10).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.read(Series::Carbon).is_empty());
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(HistoryBuffer::new(0).is_err());
    }

    #[test]
    fn test_append_and_read_oldest_first() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        for i in 0..3 {
            buffer.append(ts(i as i64), &point(i).to_values()).unwrap();
        }

        let cpu = buffer.read(Series::Cpu);
        assert_eq!(cpu.len(), 3);
        assert_eq!(cpu[0].value, 0.0);
        assert_eq!(cpu[2].value, 2.0);
        assert_eq!(cpu[0].timestamp, ts(0));

        let energy = buffer.read(Series::Energy);
        assert_eq!(energy[2].value, 8.0);
    }

    #[test]
    fn test_eviction_keeps_series_aligned() {
        let max = HISTORY_MAX_POINTS;
        let mut buffer = HistoryBuffer::new(max).unwrap();
        for i in 0..max + 5 {
            buffer.append(ts(i as i64), &point(i).to_values()).unwrap();
        }

        assert_eq!(buffer.len(), max);
        let reads: Vec<Vec<SeriesPoint>> = Series::ALL.iter().map(|s| buffer.read(*s)).collect();
        for series in &reads {
            assert_eq!(series.len(), max);
        }
        for idx in 0..max {
            let stamp = reads[0][idx].timestamp;
            assert!(reads.iter().all(|series| series[idx].timestamp == stamp));
        }

        // Oldest five were evicted
        assert_eq!(reads[0][0].timestamp, ts(5));
        assert_eq!(reads[0][0].value, 5.0);
        assert_eq!(reads[2][0].value, 15.0);
    }

    #[test]
    fn test_missing_series_rejected_without_partial_write() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        buffer.append(ts(0), &point(1).to_values()).unwrap();

        let mut values = point(2).to_values();
        values.remove(&Series::Energy);

        let result = buffer.append(ts(1), &values);
        assert!(matches!(result, Err(CarbonError::MissingSeries(Series::Energy))));
        assert_eq!(buffer.len(), 1);
        for series in Series::ALL {
            assert_eq!(buffer.read(series).len(), 1);
        }
    }

    #[test]
    fn test_non_finite_value_rejected() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        let mut values = point(1).to_values();
        values.insert(Series::Network, f64::INFINITY);

        assert!(buffer.append(ts(0), &values).is_err());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_out_of_order_timestamp_rejected() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        buffer.append(ts(10), &point(1).to_values()).unwrap();

        assert!(buffer.append(ts(5), &point(2).to_values()).is_err());
        // Equal timestamps are allowed
        assert!(buffer.append(ts(10), &point(3).to_values()).is_ok());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_snapshot_columns() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        buffer.append(ts(0), &point(1).to_values()).unwrap();
        buffer.append(ts(1), &point(2).to_values()).unwrap();

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.timestamps, vec![ts(0), ts(1)]);
        assert_eq!(snapshot.cpu_usage, vec![1.0, 2.0]);
        assert_eq!(snapshot.network_mb, vec![2.0, 4.0]);
        assert_eq!(snapshot.carbon_emissions, vec![3.0, 6.0]);
        assert_eq!(snapshot.energy_consumption, vec![4.0, 8.0]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = HistoryBuffer::new(10).unwrap();
        buffer.append(ts(0), &point(1).to_values()).unwrap();
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.read(Series::Cpu).is_empty());
    }

    #[test]
    fn test_series_from_str() {
        assert_eq!("cpu".parse::<Series>().unwrap(), Series::Cpu);
        assert_eq!("energy".parse::<Series>().unwrap(), Series::Energy);
        assert!("disk".parse::<Series>().is_err());
    }

    #[tokio::test]
    async fn test_store_shared_between_clones() {
        let store = TimeSeriesStore::new(3).unwrap();
        let reader = store.clone();

        for i in 0..5 {
            store.push(ts(i as i64), point(i)).await.unwrap();
        }

        assert_eq!(reader.len().await, 3);
        let carbon = reader.read(Series::Carbon).await;
        assert_eq!(
            carbon.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![6.0, 9.0, 12.0]
        );

        store.clear().await;
        assert!(reader.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_aligned_sets() {
        let store = TimeSeriesStore::new(8).unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    store.push(ts(i as i64), point(i)).await.unwrap();
                    tokio::task::yield_now().await;
                }
            })
        };

        for _ in 0..200 {
            let snapshot = store.snapshot().await;
            let n = snapshot.len();
            assert!(n <= 8);
            assert_eq!(snapshot.cpu_usage.len(), n);
            assert_eq!(snapshot.network_mb.len(), n);
            assert_eq!(snapshot.carbon_emissions.len(), n);
            assert_eq!(snapshot.energy_consumption.len(), n);
            tokio::task::yield_now().await;
        }

        writer.await.unwrap();
    }
}
