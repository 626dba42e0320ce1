//! Host metrics from the Linux proc filesystem
//!
//! Reads:
//! - /proc/stat for aggregate CPU time (sampled twice over a short window)
//! - /proc/meminfo for total and available memory
//! - /proc/net/dev for cumulative interface byte and packet counters
//! - /proc/net/tcp{,6} for established connection counts
//! - /proc/[pid]/stat and /proc/[pid]/comm for the process listing

use super::SystemSampler;
use crate::error::{CarbonError, Result};
use crate::models::{MemoryStats, NetworkCounters, ProcessInfo, SystemSnapshot};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Default window between the two /proc/stat reads
pub const DEFAULT_CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// TCP state code for ESTABLISHED in /proc/net/tcp
const TCP_ESTABLISHED: &str = "01";

/// Processes listed alongside host stats
pub const TOP_PROCESSES: usize = 10;

/// USER_HZ, fixed at 100 on Linux
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

const PAGE_SIZE_BYTES: u64 = 4096;

/// Fields of /proc/[pid]/stat used by the process listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidStat {
    pub comm: String,
    /// utime + stime, in clock ticks
    pub cpu_ticks: u64,
    /// Start time after boot, in clock ticks
    pub start_ticks: u64,
    pub rss_pages: u64,
}

/// Aggregate CPU jiffies from the first line of /proc/stat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub total: u64,
    pub idle: u64,
}

impl CpuTimes {
    /// Busy percentage between two readings; 0 if no time elapsed
    pub fn usage_percent_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        let idle = self.idle.saturating_sub(earlier.idle);

        if total == 0 {
            return 0.0;
        }

        total.saturating_sub(idle) as f64 / total as f64 * 100.0
    }
}

/// Sampler backed by /proc
pub struct ProcSampler {
    proc_root: PathBuf,
    cpu_window: Duration,
}

impl ProcSampler {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            cpu_window: DEFAULT_CPU_SAMPLE_WINDOW,
        }
    }

    /// Set the window between CPU time reads
    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Parse the aggregate `cpu` line of /proc/stat.
    ///
    /// Idle time includes iowait; guest time is already part of user time
    /// and is not summed again.
    pub fn parse_cpu_times(content: &str) -> Result<CpuTimes> {
        let line = content
            .lines()
            .find(|line| line.starts_with("cpu "))
            .ok_or_else(|| CarbonError::sampler_unavailable("no aggregate cpu line in stat"))?;

        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|v| v.parse().unwrap_or(0))
            .collect();

        if fields.len() < 4 {
            return Err(CarbonError::sampler_unavailable(format!(
                "malformed cpu line: '{}'",
                line
            )));
        }

        let idle = fields[3].saturating_add(fields.get(4).copied().unwrap_or(0));
        Ok(CpuTimes {
            total: fields.iter().fold(0u64, |acc, v| acc.saturating_add(*v)),
            idle,
        })
    }

    /// Parse MemTotal and MemAvailable (kB) from /proc/meminfo
    pub fn parse_meminfo(content: &str) -> Result<MemoryStats> {
        let mut total_kb = None;
        let mut available_kb = None;

        for line in content.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                match parts[0] {
                    "MemTotal:" => total_kb = parts[1].parse::<u64>().ok(),
                    "MemAvailable:" => available_kb = parts[1].parse::<u64>().ok(),
                    _ => {}
                }
            }
        }

        let total_kb =
            total_kb.ok_or_else(|| CarbonError::sampler_unavailable("MemTotal missing from meminfo"))?;
        let available_kb = available_kb
            .ok_or_else(|| CarbonError::sampler_unavailable("MemAvailable missing from meminfo"))?;

        Ok(MemoryStats::from_total_available(
            kb_to_bytes("MemTotal", total_kb)?,
            kb_to_bytes("MemAvailable", available_kb)?,
        ))
    }

    /// Sum byte and packet counters over every interface except `lo`
    pub fn parse_net_dev(content: &str) -> NetworkCounters {
        let mut counters = NetworkCounters::default();

        for line in content.lines() {
            let Some((name, stats)) = line.split_once(':') else {
                continue;
            };
            if name.trim() == "lo" {
                continue;
            }

            let fields: Vec<u64> = stats
                .split_whitespace()
                .map(|v| v.parse().unwrap_or(0))
                .collect();
            if fields.len() < 10 {
                continue;
            }

            counters.bytes_received = counters.bytes_received.saturating_add(fields[0]);
            counters.packets = counters
                .packets
                .saturating_add(fields[1])
                .saturating_add(fields[9]);
            counters.bytes_sent = counters.bytes_sent.saturating_add(fields[8]);
        }

        counters
    }

    /// Count ESTABLISHED rows in /proc/net/tcp or /proc/net/tcp6
    pub fn count_established(content: &str) -> u32 {
        content
            .lines()
            .skip(1)
            .filter(|line| line.split_whitespace().nth(3) == Some(TCP_ESTABLISHED))
            .count() as u32
    }

    /// Parse one /proc/[pid]/stat line.
    ///
    /// The command name sits in parentheses and may itself contain spaces
    /// or parentheses, so fields are counted from the last `)`.
    pub fn parse_pid_stat(content: &str) -> Option<PidStat> {
        let open = content.find('(')?;
        let close = content.rfind(')')?;
        if close < open {
            return None;
        }

        let comm = content[open + 1..close].to_string();
        // Field 3 (state) onwards
        let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();
        let field = |n: usize| fields.get(n - 3).and_then(|v| v.parse::<u64>().ok());

        Some(PidStat {
            comm,
            cpu_ticks: field(14)?.saturating_add(field(15)?),
            start_ticks: field(22)?,
            rss_pages: field(24)?,
        })
    }

    /// Seconds since boot from /proc/uptime
    pub fn parse_uptime(content: &str) -> Result<f64> {
        content
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| {
                CarbonError::sampler_unavailable(format!("malformed uptime: '{}'", content.trim()))
            })
    }

    /// Lifetime CPU and memory shares of one process
    pub fn process_info(
        pid: u32,
        name: String,
        stat: &PidStat,
        uptime_secs: f64,
        memory: &MemoryStats,
    ) -> ProcessInfo {
        let elapsed = uptime_secs - stat.start_ticks as f64 / CLOCK_TICKS_PER_SEC;
        let cpu_percent = if elapsed > 0.0 {
            stat.cpu_ticks as f64 / CLOCK_TICKS_PER_SEC / elapsed * 100.0
        } else {
            0.0
        };

        let memory_percent = if memory.total_bytes == 0 {
            0.0
        } else {
            stat.rss_pages.saturating_mul(PAGE_SIZE_BYTES) as f64 / memory.total_bytes as f64 * 100.0
        };

        ProcessInfo {
            pid,
            name,
            cpu_percent,
            memory_percent,
        }
    }

    /// Busiest processes by lifetime CPU share.
    ///
    /// Processes that exit or deny access while being read are skipped.
    pub async fn top_processes(&self, limit: usize) -> Result<Vec<ProcessInfo>> {
        let uptime = Self::parse_uptime(&self.read_proc("uptime").await?)?;
        let memory = Self::parse_meminfo(&self.read_proc("meminfo").await?)?;

        let unreadable = |e: std::io::Error| {
            CarbonError::sampler_unavailable(format!(
                "Failed to list {}: {}",
                self.proc_root.display(),
                e
            ))
        };
        let mut entries = fs::read_dir(&self.proc_root).await.map_err(&unreadable)?;

        let mut processes = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(&unreadable)? {
            let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                continue;
            };

            let stat = match self.read_proc(&format!("{}/stat", pid)).await {
                Ok(content) => Self::parse_pid_stat(&content),
                Err(e) => {
                    debug!(pid, error = %e, "Skipping process");
                    continue;
                }
            };
            let Some(stat) = stat else {
                debug!(pid, "Skipping process with malformed stat");
                continue;
            };

            let name = match self.read_proc(&format!("{}/comm", pid)).await {
                Ok(comm) if !comm.trim().is_empty() => comm.trim().to_string(),
                _ => stat.comm.clone(),
            };

            processes.push(Self::process_info(pid, name, &stat, uptime, &memory));
        }

        processes.sort_by(|a, b| {
            b.cpu_percent
                .total_cmp(&a.cpu_percent)
                .then(a.pid.cmp(&b.pid))
        });
        processes.truncate(limit);
        Ok(processes)
    }

    async fn read_proc(&self, relative: &str) -> Result<String> {
        let path = self.proc_root.join(relative);
        fs::read_to_string(&path).await.map_err(|e| {
            CarbonError::sampler_unavailable(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    async fn read_cpu_times(&self) -> Result<CpuTimes> {
        let content = self.read_proc("stat").await?;
        Self::parse_cpu_times(&content)
    }

    /// Established TCP connections over IPv4 and IPv6
    pub async fn active_connections(&self) -> u32 {
        let mut count = 0;
        for table in ["net/tcp", "net/tcp6"] {
            match self.read_proc(table).await {
                Ok(content) => count += Self::count_established(&content),
                Err(e) => debug!(error = %e, "Skipping connection table"),
            }
        }
        count
    }
}

fn kb_to_bytes(field: &str, kb: u64) -> Result<u64> {
    kb.checked_mul(1024).ok_or_else(|| {
        CarbonError::sampler_unavailable(format!("{} out of range: {} kB", field, kb))
    })
}

#[async_trait]
impl SystemSampler for ProcSampler {
    async fn sample(&self) -> Result<SystemSnapshot> {
        let before = self.read_cpu_times().await?;
        if !self.cpu_window.is_zero() {
            tokio::time::sleep(self.cpu_window).await;
        }
        let after = self.read_cpu_times().await?;
        let cpu_usage_percent = after.usage_percent_since(&before);

        let memory = Self::parse_meminfo(&self.read_proc("meminfo").await?)?;

        let mut network = Self::parse_net_dev(&self.read_proc("net/dev").await?);
        network.active_connections = self.active_connections().await;

        Ok(SystemSnapshot {
            cpu_usage_percent,
            memory,
            network,
        })
    }

    async fn processes(&self, limit: usize) -> Result<Vec<ProcessInfo>> {
        self.top_processes(limit).await
    }
}
