//! Current reading command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ProcessStats, StatsResponse};
use crate::output::{
    color_usage, format_carbon, format_megabytes, format_percent, print_json, print_table, OutputFormat,
};

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "PID")]
    pid: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "CPU %")]
    cpu: String,
    #[tabled(rename = "Memory %")]
    memory: String,
}

fn process_rows(processes: &[ProcessStats]) -> Vec<ProcessRow> {
    processes
        .iter()
        .map(|p| ProcessRow {
            pid: p.pid,
            name: p.name.clone(),
            cpu: format_percent(p.cpu_percent),
            memory: format_percent(p.memory_percent),
        })
        .collect()
}

/// Show the agent's current reading
pub async fn show_stats(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let stats: StatsResponse = client.get("api/stats").await?;

    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Table => {
            println!("{}", "Carbon Footprint".bold());
            println!("{}", "=".repeat(50));
            println!("Sampled at:             {}", stats.timestamp.dimmed());
            println!();

            println!("{}", "System".bold());
            println!("{}", "-".repeat(50));
            println!("CPU:                    {}", color_usage(stats.system.cpu_percent));
            println!(
                "Memory:                 {} ({:.2} / {:.2} GB)",
                format_percent(stats.system.memory_percent),
                stats.system.memory_used_gb,
                stats.system.memory_total_gb
            );
            println!();

            println!("{}", "Network".bold());
            println!("{}", "-".repeat(50));
            println!("Sent:                   {}", format_megabytes(stats.network.bytes_sent_mb));
            println!("Received:               {}", format_megabytes(stats.network.bytes_received_mb));
            println!("Packets:                {}", stats.network.packets);
            println!("Connections:            {}", stats.network.active_connections);
            println!();

            println!("{}", "Energy".bold());
            println!("{}", "-".repeat(50));
            println!("CPU power:              {:.1} W", stats.energy.cpu_power_w);
            println!("Energy:                 {:.4} kWh", stats.energy.total_energy_kwh);
            println!("Runtime:                {:.2} h", stats.energy.runtime_hours);
            println!();

            println!("{}", "Carbon".bold());
            println!("{}", "-".repeat(50));
            println!("CPU:                    {}", format_carbon(stats.carbon.cpu_carbon_g));
            println!("Network:                {}", format_carbon(stats.carbon.network_carbon_g));
            println!(
                "{}                  {}",
                "Total:".bold(),
                format_carbon(stats.carbon.total_carbon_g).green().bold()
            );

            if !stats.processes.is_empty() {
                println!();
                println!("{}", "Top Processes".bold());
                print_table(&process_rows(&stats.processes));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_rows() {
        let processes = vec![ProcessStats {
            pid: 412,
            name: "postgres".to_string(),
            cpu_percent: 3.4,
            memory_percent: 12.0,
        }];

        let rows = process_rows(&processes);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pid, 412);
        assert_eq!(rows[0].cpu, "3.4%");
        assert_eq!(rows[0].memory, "12.0%");
    }
}
