//! Integration tests for host sampling
//!
//! These tests build a fake proc tree in a temporary directory so parsing
//! and sampling can be checked without depending on the host.

#[cfg(test)]
mod parser_tests {
    use crate::collector::{CpuTimes, ProcSampler};
    use crate::error::CarbonError;
    use crate::models::MemoryStats;

    const STAT: &str = "cpu  100 0 50 800 50 0 0 0 0 0
cpu0 50 0 25 400 25 0 0 0 0 0
intr 12345
ctxt 67890
";

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  999999     100    0    0    0     0          0         0   999999     100    0    0    0     0       0          0
  eth0: 1000000    2000    0    0    0     0          0         0   500000    1500    0    0    0     0       0          0
 wlan0:    2048      10    0    0    0     0          0         0     1024       5    0    0    0     0       0          0
";

    const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1234 1
   1: 0A00000A:D2F0 5DB8D822:01BB 01 00000000:00000000 02:00000A1F 00000000  1000        0 5678 2
   2: 0A00000A:D2F2 5DB8D822:01BB 01 00000000:00000000 02:00000A1F 00000000  1000        0 5679 2
   3: 0A00000A:D2F4 5DB8D822:01BB 06 00000000:00000000 00:00000000 00000000     0        0 0 3
";

    #[test]
    fn test_parse_cpu_times() {
        let times = ProcSampler::parse_cpu_times(STAT).unwrap();

        assert_eq!(times.total, 1000);
        // idle + iowait
        assert_eq!(times.idle, 850);
    }

    #[test]
    fn test_parse_cpu_times_missing_line() {
        assert!(ProcSampler::parse_cpu_times("intr 1\nctxt 2\n").is_err());
        assert!(ProcSampler::parse_cpu_times("cpu  1 2\n").is_err());
    }

    #[test]
    fn test_cpu_usage_between_readings() {
        let before = CpuTimes { total: 1000, idle: 800 };
        let after = CpuTimes { total: 1200, idle: 950 };

        assert!((after.usage_percent_since(&before) - 25.0).abs() < 1e-9);
        assert_eq!(before.usage_percent_since(&before), 0.0);
    }

    #[test]
    fn test_cpu_usage_counter_reset() {
        let before = CpuTimes { total: 1000, idle: 800 };
        let after = CpuTimes { total: 10, idle: 5 };

        assert_eq!(after.usage_percent_since(&before), 0.0);
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "MemTotal:       16384000 kB
MemFree:         2048000 kB
MemAvailable:    4096000 kB
Buffers:          512000 kB
";
        let memory = ProcSampler::parse_meminfo(meminfo).unwrap();

        assert_eq!(memory.total_bytes, 16_384_000 * 1024);
        assert_eq!(memory.used_bytes, (16_384_000 - 4_096_000) * 1024);
        assert!((memory.usage_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_meminfo_missing_available() {
        let result = ProcSampler::parse_meminfo("MemTotal: 1024 kB\nMemFree: 512 kB\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_meminfo_overflow_is_unavailable() {
        let result =
            ProcSampler::parse_meminfo("MemTotal: 18446744073709551615 kB\nMemAvailable: 1 kB\n");
        assert!(matches!(result, Err(CarbonError::SamplerUnavailable(_))));

        let result =
            ProcSampler::parse_meminfo("MemTotal: 1024 kB\nMemAvailable: 18446744073709551615 kB\n");
        assert!(matches!(result, Err(CarbonError::SamplerUnavailable(_))));
    }

    #[test]
    fn test_huge_counters_saturate() {
        let max = u64::MAX;
        let stat = format!("cpu  {max} 0 {max} {max} {max} 0 0 0\n");
        let times = ProcSampler::parse_cpu_times(&stat).unwrap();
        assert_eq!(times.total, u64::MAX);
        assert_eq!(times.idle, u64::MAX);

        let net_dev = format!(
            "  eth0: {max} {max} 0 0 0 0 0 0 {max} {max} 0 0 0 0 0 0\n  eth1: 5 5 0 0 0 0 0 0 5 5 0 0 0 0 0 0\n"
        );
        let counters = ProcSampler::parse_net_dev(&net_dev);
        assert_eq!(counters.bytes_received, u64::MAX);
        assert_eq!(counters.bytes_sent, u64::MAX);
        assert_eq!(counters.packets, u64::MAX);
    }

    #[test]
    fn test_parse_net_dev_skips_loopback() {
        let counters = ProcSampler::parse_net_dev(NET_DEV);

        assert_eq!(counters.bytes_received, 1_002_048);
        assert_eq!(counters.bytes_sent, 501_024);
        assert_eq!(counters.packets, 2000 + 1500 + 10 + 5);
        assert_eq!(counters.total_bytes(), 1_503_072);
    }

    #[test]
    fn test_parse_net_dev_ignores_short_lines() {
        let counters = ProcSampler::parse_net_dev("eth0: 1 2 3\n");
        assert_eq!(counters.total_bytes(), 0);
    }

    const PID_STAT: &str = "42 (my (odd) app) S 1 42 42 0 -1 4194560 100 0 0 0 300 200 0 0 20 0 1 0 1000 1000000 2048 18446744073709551615 1 1 0 0 0 0 0 0 0 0 0 0 17 3 0 0 0 0 0\n";

    #[test]
    fn test_parse_pid_stat() {
        let stat = ProcSampler::parse_pid_stat(PID_STAT).unwrap();

        assert_eq!(stat.comm, "my (odd) app");
        assert_eq!(stat.cpu_ticks, 500);
        assert_eq!(stat.start_ticks, 1000);
        assert_eq!(stat.rss_pages, 2048);
    }

    #[test]
    fn test_parse_pid_stat_truncated() {
        assert!(ProcSampler::parse_pid_stat("42 (app) S 1 42").is_none());
        assert!(ProcSampler::parse_pid_stat("42 app S").is_none());
        assert!(ProcSampler::parse_pid_stat("").is_none());
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(ProcSampler::parse_uptime("350735.47 234388.90\n").unwrap(), 350735.47);
        assert!(matches!(
            ProcSampler::parse_uptime("garbage"),
            Err(CarbonError::SamplerUnavailable(_))
        ));
    }

    #[test]
    fn test_process_info_lifetime_shares() {
        let stat = ProcSampler::parse_pid_stat(PID_STAT).unwrap();
        let memory = MemoryStats::from_total_available(2048 * 4096 * 4, 0);

        // 5 s of CPU over the 10 s since the process started at 10 s
        let info = ProcSampler::process_info(42, "app".into(), &stat, 20.0, &memory);
        assert!((info.cpu_percent - 50.0).abs() < 1e-9);
        assert!((info.memory_percent - 25.0).abs() < 1e-9);

        // Started in the same instant as the uptime read
        let info = ProcSampler::process_info(42, "app".into(), &stat, 10.0, &memory);
        assert_eq!(info.cpu_percent, 0.0);
    }

    #[test]
    fn test_count_established() {
        assert_eq!(ProcSampler::count_established(TCP), 2);
        assert_eq!(ProcSampler::count_established(""), 0);
    }
}

#[cfg(test)]
mod mock_proc_tests {
    use crate::collector::{ProcSampler, SystemSampler, TOP_PROCESSES};
    use crate::error::CarbonError;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::fs;

    /// Helper to create a fake proc tree
    async fn create_mock_proc(root: &Path) {
        fs::create_dir_all(root.join("net")).await.unwrap();

        fs::write(root.join("stat"), "cpu  100 0 100 700 100 0 0 0 0 0\n")
            .await
            .unwrap();
        fs::write(
            root.join("meminfo"),
            "MemTotal:       8000000 kB\nMemAvailable:   2000000 kB\n",
        )
        .await
        .unwrap();
        fs::write(
            root.join("net/dev"),
            "Inter-|   Receive |  Transmit\n face |bytes packets|bytes packets\n  eth0: 4096 4 0 0 0 0 0 0 1024 2 0 0 0 0 0 0\n",
        )
        .await
        .unwrap();
        fs::write(
            root.join("net/tcp"),
            "  sl  local_address rem_address   st\n   0: 0A00000A:D2F0 5DB8D822:01BB 01 0\n",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_sample_from_mock_proc() {
        let temp_dir = TempDir::new().unwrap();
        create_mock_proc(temp_dir.path()).await;

        let sampler = ProcSampler::new(temp_dir.path()).with_cpu_window(Duration::ZERO);
        let snapshot = sampler.sample().await.unwrap();

        // Identical stat reads over a zero window
        assert_eq!(snapshot.cpu_usage_percent, 0.0);
        assert!((snapshot.memory.usage_percent - 75.0).abs() < 1e-9);
        assert_eq!(snapshot.network.bytes_received, 4096);
        assert_eq!(snapshot.network.bytes_sent, 1024);
        assert_eq!(snapshot.network.packets, 6);
        // tcp6 is missing and skipped
        assert_eq!(snapshot.network.active_connections, 1);
    }

    fn pid_stat(pid: u32, comm: &str, cpu_ticks: u64, start_ticks: u64, rss_pages: u64) -> String {
        format!(
            "{} ({}) S 1 {} {} 0 -1 4194560 0 0 0 0 {} 0 0 0 20 0 1 0 {} 1000000 {} 0\n",
            pid, comm, pid, pid, cpu_ticks, start_ticks, rss_pages
        )
    }

    async fn add_process(root: &Path, pid: u32, stat: &str, comm: Option<&str>) {
        let dir = root.join(pid.to_string());
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join("stat"), stat).await.unwrap();
        if let Some(comm) = comm {
            fs::write(dir.join("comm"), format!("{}\n", comm)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_top_processes_from_mock_proc() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_mock_proc(root).await;
        fs::write(root.join("uptime"), "110.00 200.00\n").await.unwrap();

        // Started 10 s after boot, so 100 s of lifetime each
        add_process(root, 7, &pid_stat(7, "busy", 5000, 1000, 200_000), Some("busy-worker")).await;
        add_process(root, 12, &pid_stat(12, "light", 1000, 1000, 0), None).await;
        add_process(root, 30, &pid_stat(30, "idle", 0, 1000, 0), Some("idle")).await;
        add_process(root, 99, "99 (gone", None).await;

        let sampler = ProcSampler::new(root);
        let processes = sampler.processes(2).await.unwrap();

        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].pid, 7);
        assert_eq!(processes[0].name, "busy-worker");
        assert!((processes[0].cpu_percent - 50.0).abs() < 1e-9);
        // 200000 pages of 4 KiB over 8000000 kB
        assert!((processes[0].memory_percent - 10.0).abs() < 1e-9);

        // No comm file, so the name comes from stat
        assert_eq!(processes[1].pid, 12);
        assert_eq!(processes[1].name, "light");
        assert!((processes[1].cpu_percent - 10.0).abs() < 1e-9);

        let all = sampler.processes(TOP_PROCESSES).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].pid, 30);
    }

    #[tokio::test]
    async fn test_top_processes_without_uptime_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        create_mock_proc(temp_dir.path()).await;

        let sampler = ProcSampler::new(temp_dir.path());
        let result = sampler.top_processes(TOP_PROCESSES).await;
        assert!(matches!(result, Err(CarbonError::SamplerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_sample_missing_proc_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let sampler =
            ProcSampler::new(temp_dir.path().join("missing")).with_cpu_window(Duration::ZERO);

        let result = sampler.sample().await;
        assert!(matches!(result, Err(CarbonError::SamplerUnavailable(_))));
    }

    #[tokio::test]
    async fn test_active_connections_sums_tables() {
        let temp_dir = TempDir::new().unwrap();
        create_mock_proc(temp_dir.path()).await;
        fs::write(
            temp_dir.path().join("net/tcp6"),
            "  sl  local_address rem_address   st\n   0: A:1 B:2 01 0\n   1: A:1 B:3 01 0\n",
        )
        .await
        .unwrap();

        let sampler = ProcSampler::new(temp_dir.path());
        assert_eq!(sampler.active_connections().await, 3);
    }
}
