//! Built-in optimization strategies and their savings estimates

use crate::error::CarbonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A carbon reduction strategy with a fixed projected reduction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    ReduceCpu,
    OptimizeNetwork,
    PowerManagement,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::ReduceCpu,
        Strategy::OptimizeNetwork,
        Strategy::PowerManagement,
    ];

    /// Stable identifier used in the API
    pub fn id(&self) -> &'static str {
        match self {
            Strategy::ReduceCpu => "reduce_cpu",
            Strategy::OptimizeNetwork => "optimize_network",
            Strategy::PowerManagement => "power_management",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ReduceCpu => "Reduce CPU Usage",
            Strategy::OptimizeNetwork => "Optimize Network Traffic",
            Strategy::PowerManagement => "Enable Power Management",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::ReduceCpu => "Limit background processes and CPU-intensive tasks",
            Strategy::OptimizeNetwork => {
                "Compress data, cache content, reduce unnecessary requests"
            }
            Strategy::PowerManagement => {
                "Use power-saving modes, reduce screen brightness, sleep idle processes"
            }
        }
    }

    /// Projected reduction, percent of total carbon
    pub fn reduction_percent(&self) -> f64 {
        match self {
            Strategy::ReduceCpu => 30.0,
            Strategy::OptimizeNetwork => 25.0,
            Strategy::PowerManagement => 40.0,
        }
    }

    /// Savings projected against a current total
    pub fn estimate_savings(&self, total_carbon_g: f64) -> SavingsEstimate {
        SavingsEstimate {
            strategy: *self,
            name: self.name().to_string(),
            description: self.description().to_string(),
            potential_reduction_percent: self.reduction_percent(),
            estimated_savings_g: total_carbon_g * self.reduction_percent() / 100.0,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Strategy {
    type Err = CarbonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.id() == s)
            .ok_or_else(|| CarbonError::UnknownStrategy(s.to_string()))
    }
}

/// Projected savings for one strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    pub strategy: Strategy,
    pub name: String,
    pub description: String,
    pub potential_reduction_percent: f64,
    pub estimated_savings_g: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_round_trips_through_id() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.id().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn test_unknown_strategy() {
        let err = "turbo_mode".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, CarbonError::UnknownStrategy(ref s) if s == "turbo_mode"));
    }

    #[test]
    fn test_reduction_percentages() {
        assert_eq!(Strategy::ReduceCpu.reduction_percent(), 30.0);
        assert_eq!(Strategy::OptimizeNetwork.reduction_percent(), 25.0);
        assert_eq!(Strategy::PowerManagement.reduction_percent(), 40.0);
    }

    #[test]
    fn test_estimate_savings() {
        let estimate = Strategy::PowerManagement.estimate_savings(200.0);
        assert_eq!(estimate.estimated_savings_g, 80.0);
        assert_eq!(estimate.potential_reduction_percent, 40.0);
        assert_eq!(estimate.name, "Enable Power Management");
    }

    #[test]
    fn test_serde_uses_ids() {
        let json = serde_json::to_string(&Strategy::OptimizeNetwork).unwrap();
        assert_eq!(json, "\"optimize_network\"");
    }
}
