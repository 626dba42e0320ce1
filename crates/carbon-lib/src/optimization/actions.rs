//! Side-effecting half of an optimization
//!
//! The shipped implementation is advisory: it inspects host state that is
//! readable without privileges and returns recommendations. It never runs
//! commands or writes to sysfs.

use super::Strategy;
use crate::collector::ProcSampler;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

const GOVERNOR_PATH: &str = "devices/system/cpu/cpu0/cpufreq/scaling_governor";
const LAPTOP_MODE_PATH: &str = "sys/vm/laptop_mode";

/// Outcome category of a single action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Info,
    Success,
    Recommendation,
}

/// One step taken or suggested by a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationAction {
    pub action: String,
    pub details: String,
    pub status: ActionStatus,
}

impl OptimizationAction {
    pub fn new(action: impl Into<String>, details: impl Into<String>, status: ActionStatus) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
            status,
        }
    }

    pub fn info(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(action, details, ActionStatus::Info)
    }

    pub fn recommend(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(action, details, ActionStatus::Recommendation)
    }
}

/// Performs the host-side part of a strategy
#[async_trait]
pub trait OptimizationActions: Send + Sync {
    async fn apply(&self, strategy: Strategy) -> Result<Vec<OptimizationAction>>;
}

/// Read-only advisor over /sys and /proc
pub struct AdvisoryActions {
    sys_root: PathBuf,
    proc: ProcSampler,
}

impl AdvisoryActions {
    pub fn new(sys_root: impl Into<PathBuf>, proc_root: impl Into<PathBuf>) -> Self {
        Self {
            sys_root: sys_root.into(),
            proc: ProcSampler::new(proc_root),
        }
    }

    async fn current_governor(&self) -> Option<String> {
        fs::read_to_string(self.sys_root.join(GOVERNOR_PATH))
            .await
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn governor_action(governor: Option<&str>) -> OptimizationAction {
        match governor {
            Some(governor) => OptimizationAction::info(
                "Power profile check",
                format!("Current CPU governor: {}", governor),
            ),
            None => OptimizationAction::info(
                "Power profile check",
                "CPU frequency scaling information not available",
            ),
        }
    }

    async fn reduce_cpu(&self) -> Vec<OptimizationAction> {
        let governor = self.current_governor().await;
        let mut actions = vec![Self::governor_action(governor.as_deref())];

        if governor.as_deref() != Some("powersave") {
            actions.push(OptimizationAction::recommend(
                "CPU frequency scaling",
                "Switch the CPU governor to powersave (cpupower frequency-set -g powersave)",
            ));
        }

        actions.push(OptimizationAction::recommend(
            "Process management recommendation",
            "Consider closing unnecessary applications and browser tabs",
        ));
        actions
    }

    async fn optimize_network(&self) -> Vec<OptimizationAction> {
        let connections = self.proc.active_connections().await;

        vec![
            OptimizationAction::info(
                "Network analysis",
                format!("Found {} active connections", connections),
            ),
            OptimizationAction::recommend(
                "Network optimization suggestions",
                "Enable browser compression, use content caching, limit background sync",
            ),
            OptimizationAction::recommend(
                "Traffic compression",
                "Consider using VPN with compression or CDN caching",
            ),
        ]
    }

    async fn power_management(&self) -> Vec<OptimizationAction> {
        let governor = self.current_governor().await;
        let mut actions = vec![
            Self::governor_action(governor.as_deref()),
            OptimizationAction::recommend(
                "Power management tools",
                "Install TLP for automatic power management",
            ),
        ];

        if let Ok(value) = fs::read_to_string(self.proc.proc_root().join(LAPTOP_MODE_PATH)).await {
            actions.push(OptimizationAction::info(
                "Laptop mode",
                format!("vm.laptop_mode is {}", value.trim()),
            ));
        }

        actions.push(OptimizationAction::recommend(
            "USB power saving",
            "Enable USB autosuspend for idle devices",
        ));
        actions.push(OptimizationAction::recommend(
            "Display optimization",
            "Reduce screen brightness to 50-70% for optimal power savings",
        ));
        actions
    }
}

impl Default for AdvisoryActions {
    fn default() -> Self {
        Self::new("/sys", "/proc")
    }
}

#[async_trait]
impl OptimizationActions for AdvisoryActions {
    async fn apply(&self, strategy: Strategy) -> Result<Vec<OptimizationAction>> {
        let actions = match strategy {
            Strategy::ReduceCpu => self.reduce_cpu().await,
            Strategy::OptimizeNetwork => self.optimize_network().await,
            Strategy::PowerManagement => self.power_management().await,
        };
        Ok(actions)
    }
}
