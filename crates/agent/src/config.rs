//! Agent configuration

use anyhow::{Context, Result};
use carbon_lib::emission::{
    EmissionConfig, CPU_TDP_W, GRID_INTENSITY_KG_PER_KWH, IDLE_POWER_W, NETWORK_KWH_PER_GB,
};
use carbon_lib::history::HISTORY_MAX_POINTS;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Host name reported in structured logs
    #[serde(default = "default_host_name")]
    pub host_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Points kept per history series
    #[serde(default = "default_history_max_points")]
    pub history_max_points: usize,

    #[serde(default = "default_idle_power")]
    pub idle_power_w: f64,

    #[serde(default = "default_cpu_tdp")]
    pub cpu_tdp_w: f64,

    #[serde(default = "default_network_kwh_per_gb")]
    pub network_kwh_per_gb: f64,

    #[serde(default = "default_grid_intensity")]
    pub grid_intensity_kg_per_kwh: f64,

    /// Window between the two CPU time reads, in milliseconds
    #[serde(default = "default_cpu_sample_window")]
    pub cpu_sample_window_ms: u64,

    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,

    #[serde(default = "default_sys_root")]
    pub sys_root: PathBuf,
}

fn default_host_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    5000
}

fn default_poll_interval() -> u64 {
    5
}

fn default_history_max_points() -> usize {
    HISTORY_MAX_POINTS
}

fn default_idle_power() -> f64 {
    IDLE_POWER_W
}

fn default_cpu_tdp() -> f64 {
    CPU_TDP_W
}

fn default_network_kwh_per_gb() -> f64 {
    NETWORK_KWH_PER_GB
}

fn default_grid_intensity() -> f64 {
    GRID_INTENSITY_KG_PER_KWH
}

fn default_cpu_sample_window() -> u64 {
    1000
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

fn default_sys_root() -> PathBuf {
    PathBuf::from("/sys")
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host_name: default_host_name(),
            api_port: default_api_port(),
            poll_interval_secs: default_poll_interval(),
            history_max_points: default_history_max_points(),
            idle_power_w: default_idle_power(),
            cpu_tdp_w: default_cpu_tdp(),
            network_kwh_per_gb: default_network_kwh_per_gb(),
            grid_intensity_kg_per_kwh: default_grid_intensity(),
            cpu_sample_window_ms: default_cpu_sample_window(),
            proc_root: default_proc_root(),
            sys_root: default_sys_root(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from `CARBON_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("CARBON").try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }

    /// Emission model constants from this configuration
    pub fn emission_config(&self) -> EmissionConfig {
        EmissionConfig {
            idle_power_w: self.idle_power_w,
            cpu_tdp_w: self.cpu_tdp_w,
            network_kwh_per_gb: self.network_kwh_per_gb,
            grid_intensity_kg_per_kwh: self.grid_intensity_kg_per_kwh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix("CARBON")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = AgentConfig::from_source(env(&[])).unwrap();

        assert_eq!(config.api_port, 5000);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.history_max_points, 100);
        assert_eq!(config.cpu_sample_window(), Duration::from_secs(1));
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert_eq!(config.emission_config(), EmissionConfig::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AgentConfig::from_source(env(&[
            ("CARBON_API_PORT", "8088"),
            ("CARBON_POLL_INTERVAL_SECS", "10"),
            ("CARBON_GRID_INTENSITY_KG_PER_KWH", "0.2"),
        ]))
        .unwrap();

        assert_eq!(config.api_port, 8088);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.emission_config().grid_intensity_kg_per_kwh, 0.2);
        assert_eq!(config.emission_config().cpu_tdp_w, 65.0);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let result = AgentConfig::from_source(env(&[("CARBON_API_PORT", "not-a-port")]));
        assert!(result.is_err());
    }
}
