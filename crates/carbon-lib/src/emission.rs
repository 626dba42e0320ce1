//! Power, energy and carbon conversion model
//!
//! A deterministic, parameterized formula rather than a calibrated
//! measurement:
//! - CPU power scales linearly from idle draw up to idle + TDP
//! - Energy is power integrated over the pipeline runtime
//! - Network traffic is charged a fixed energy cost per GB
//! - Both energy figures are converted to CO₂ with one grid intensity

use crate::error::{CarbonError, Result};
use crate::models::{ensure_non_negative, EmissionReading, Sample, BYTES_PER_GB};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// System draw at 0% CPU, in watts
pub const IDLE_POWER_W: f64 = 50.0;

/// Additional CPU draw at 100% utilisation, in watts
pub const CPU_TDP_W: f64 = 65.0;

/// Network transfer energy cost, kWh per GB
pub const NETWORK_KWH_PER_GB: f64 = 0.06;

/// Average global grid carbon intensity, kg CO₂ per kWh
pub const GRID_INTENSITY_KG_PER_KWH: f64 = 0.5;

const SECS_PER_HOUR: f64 = 3600.0;

/// Tunable constants for the emission model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmissionConfig {
    pub idle_power_w: f64,
    pub cpu_tdp_w: f64,
    pub network_kwh_per_gb: f64,
    pub grid_intensity_kg_per_kwh: f64,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            idle_power_w: IDLE_POWER_W,
            cpu_tdp_w: CPU_TDP_W,
            network_kwh_per_gb: NETWORK_KWH_PER_GB,
            grid_intensity_kg_per_kwh: GRID_INTENSITY_KG_PER_KWH,
        }
    }
}

impl EmissionConfig {
    /// Reject constants that would make readings negative or non-finite
    pub fn validate(&self) -> Result<()> {
        ensure_non_negative("idle_power_w", self.idle_power_w)?;
        ensure_non_negative("cpu_tdp_w", self.cpu_tdp_w)?;
        ensure_non_negative("network_kwh_per_gb", self.network_kwh_per_gb)?;
        ensure_non_negative("grid_intensity_kg_per_kwh", self.grid_intensity_kg_per_kwh)?;
        Ok(())
    }
}

/// Pure conversion functions parameterized by an [`EmissionConfig`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionModel {
    config: EmissionConfig,
}

impl EmissionModel {
    pub fn new(config: EmissionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EmissionConfig {
        &self.config
    }

    /// Estimated system power draw at the given CPU utilisation.
    ///
    /// Values outside 0..=100 are not corrected; supplying a valid
    /// percentage is the caller's job.
    pub fn cpu_power(&self, cpu_percent: f64) -> f64 {
        self.config.idle_power_w + self.config.cpu_tdp_w * (cpu_percent / 100.0)
    }

    /// Energy in kWh consumed by `power_watts` over `runtime_hours`
    pub fn energy(&self, power_watts: f64, runtime_hours: f64) -> Result<f64> {
        if !runtime_hours.is_finite() || runtime_hours < 0.0 {
            return Err(CarbonError::invalid_parameter(format!(
                "runtime_hours must be non-negative, got {}",
                runtime_hours
            )));
        }
        ensure_non_negative("power_watts", power_watts)?;

        Ok(power_watts * runtime_hours / 1000.0)
    }

    /// Grams of CO₂ attributed to moving `bytes_transferred` over the network
    pub fn network_carbon(&self, bytes_transferred: u64) -> f64 {
        let gb = bytes_transferred as f64 / BYTES_PER_GB;
        let kwh = gb * self.config.network_kwh_per_gb;
        self.kwh_to_grams(kwh)
    }

    /// Grams of CO₂ for `energy_kwh` of CPU energy
    pub fn cpu_carbon(&self, energy_kwh: f64) -> Result<f64> {
        ensure_non_negative("energy_kwh", energy_kwh)?;
        Ok(self.kwh_to_grams(energy_kwh))
    }

    /// Compose every figure from a single sample
    pub fn reading(&self, sample: &Sample, runtime: Duration) -> Result<EmissionReading> {
        let runtime_hours = runtime.as_secs_f64() / SECS_PER_HOUR;

        let power_watts = self.cpu_power(sample.cpu_usage_percent());
        let energy_kwh = self.energy(power_watts, runtime_hours)?;
        let cpu_carbon_g = self.cpu_carbon(energy_kwh)?;
        let network_carbon_g = self.network_carbon(sample.network_bytes_total());

        EmissionReading::new(
            power_watts,
            energy_kwh,
            cpu_carbon_g,
            network_carbon_g,
            runtime_hours,
        )
    }

    fn kwh_to_grams(&self, kwh: f64) -> f64 {
        kwh * self.config.grid_intensity_kg_per_kwh * 1000.0
    }
}
