//! Core data models for the carbon pipeline

use crate::error::{CarbonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Bytes in one gibibyte, used for every byte to GB conversion
pub const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Bytes in one mebibyte
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Host memory statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub usage_percent: f64,
}

impl MemoryStats {
    /// Build memory stats from total and available bytes
    pub fn from_total_available(total_bytes: u64, available_bytes: u64) -> Self {
        let used_bytes = total_bytes.saturating_sub(available_bytes);
        let usage_percent = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };

        Self {
            total_bytes,
            used_bytes,
            usage_percent,
        }
    }

    pub fn used_gb(&self) -> f64 {
        self.used_bytes as f64 / BYTES_PER_GB
    }

    pub fn total_gb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_GB
    }
}

/// Cumulative network counters across all non-loopback interfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCounters {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets: u64,
    pub active_connections: u32,
}

impl NetworkCounters {
    /// Total bytes moved in either direction
    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_received)
    }
}

/// Raw output of a [`SystemSampler`](crate::collector::SystemSampler)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub cpu_usage_percent: f64,
    pub memory: MemoryStats,
    pub network: NetworkCounters,
}

/// A running process as listed next to host stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Average CPU share over the process lifetime
    pub cpu_percent: f64,
    /// Resident memory as a share of total host memory
    pub memory_percent: f64,
}

/// One observation of host state, stamped with the instant it was taken
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    cpu_usage_percent: f64,
    memory: MemoryStats,
    network: NetworkCounters,
    timestamp: Instant,
}

impl Sample {
    /// Validate a snapshot and stamp it.
    ///
    /// Percentages above 100 are kept as reported; only non-finite or
    /// negative readings are rejected.
    pub fn new(snapshot: SystemSnapshot, timestamp: Instant) -> Result<Self> {
        ensure_non_negative("cpu_usage_percent", snapshot.cpu_usage_percent)?;
        ensure_non_negative("memory_usage_percent", snapshot.memory.usage_percent)?;

        Ok(Self {
            cpu_usage_percent: snapshot.cpu_usage_percent,
            memory: snapshot.memory,
            network: snapshot.network,
            timestamp,
        })
    }

    pub fn cpu_usage_percent(&self) -> f64 {
        self.cpu_usage_percent
    }

    pub fn memory_usage_percent(&self) -> f64 {
        self.memory.usage_percent
    }

    pub fn memory(&self) -> &MemoryStats {
        &self.memory
    }

    pub fn network(&self) -> &NetworkCounters {
        &self.network
    }

    pub fn network_bytes_total(&self) -> u64 {
        self.network.total_bytes()
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }
}

/// Power, energy and carbon figures derived from one sample.
///
/// `total_carbon_g` is always the exact sum of the CPU and network figures.
/// Deserialized readings go through the same validation as [`EmissionReading::new`]
/// and any incoming total is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReading")]
pub struct EmissionReading {
    power_watts: f64,
    energy_kwh: f64,
    cpu_carbon_g: f64,
    network_carbon_g: f64,
    total_carbon_g: f64,
    runtime_hours: f64,
}

impl EmissionReading {
    /// Assemble a reading, computing the total from its two components
    pub fn new(
        power_watts: f64,
        energy_kwh: f64,
        cpu_carbon_g: f64,
        network_carbon_g: f64,
        runtime_hours: f64,
    ) -> Result<Self> {
        ensure_non_negative("power_watts", power_watts)?;
        ensure_non_negative("energy_kwh", energy_kwh)?;
        ensure_non_negative("cpu_carbon_g", cpu_carbon_g)?;
        ensure_non_negative("network_carbon_g", network_carbon_g)?;
        ensure_non_negative("runtime_hours", runtime_hours)?;

        Ok(Self {
            power_watts,
            energy_kwh,
            cpu_carbon_g,
            network_carbon_g,
            total_carbon_g: cpu_carbon_g + network_carbon_g,
            runtime_hours,
        })
    }

    pub fn power_watts(&self) -> f64 {
        self.power_watts
    }

    pub fn energy_kwh(&self) -> f64 {
        self.energy_kwh
    }

    pub fn energy_wh(&self) -> f64 {
        self.energy_kwh * 1000.0
    }

    pub fn cpu_carbon_g(&self) -> f64 {
        self.cpu_carbon_g
    }

    pub fn network_carbon_g(&self) -> f64 {
        self.network_carbon_g
    }

    pub fn total_carbon_g(&self) -> f64 {
        self.total_carbon_g
    }

    pub fn total_carbon_kg(&self) -> f64 {
        self.total_carbon_g / 1000.0
    }

    pub fn runtime_hours(&self) -> f64 {
        self.runtime_hours
    }
}

/// Unvalidated wire form of an [`EmissionReading`]
#[derive(Deserialize)]
struct RawReading {
    power_watts: f64,
    energy_kwh: f64,
    cpu_carbon_g: f64,
    network_carbon_g: f64,
    runtime_hours: f64,
}

impl TryFrom<RawReading> for EmissionReading {
    type Error = CarbonError;

    fn try_from(raw: RawReading) -> Result<Self> {
        Self::new(
            raw.power_watts,
            raw.energy_kwh,
            raw.cpu_carbon_g,
            raw.network_carbon_g,
            raw.runtime_hours,
        )
    }
}

/// A sample together with the reading computed from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonSnapshot {
    pub sampled_at: DateTime<Utc>,
    pub cpu_usage_percent: f64,
    pub memory: MemoryStats,
    pub network: NetworkCounters,
    pub reading: EmissionReading,
}

impl CarbonSnapshot {
    pub fn new(sample: &Sample, reading: EmissionReading, sampled_at: DateTime<Utc>) -> Self {
        Self {
            sampled_at,
            cpu_usage_percent: sample.cpu_usage_percent(),
            memory: *sample.memory(),
            network: *sample.network(),
            reading,
        }
    }
}

pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(CarbonError::invalid_parameter(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}
