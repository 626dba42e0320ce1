//! History commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, History, HistoryResponse, SeriesResponse};
use crate::output::{format_optional, print_info, print_json, print_table, OutputFormat};

/// Row for the combined history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU %")]
    cpu: String,
    #[tabled(rename = "Network MB")]
    network: String,
    #[tabled(rename = "Carbon g")]
    carbon: String,
    #[tabled(rename = "Energy Wh")]
    energy: String,
}

/// Row for a single series table
#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Show recorded history, optionally for one series
pub async fn show_history(client: &ApiClient, series: Option<String>, format: OutputFormat) -> Result<()> {
    match series {
        Some(series) => show_series(client, &series, format).await,
        None => show_all(client, format).await,
    }
}

async fn show_all(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: HistoryResponse = client.get("api/history").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let history = &response.history;
            if history.timestamps.is_empty() {
                print_info("No history recorded yet; the agent samples every few seconds");
                return Ok(());
            }

            let rows = history_rows(history);

            println!("{}", "Carbon History".bold());
            print_table(&rows);
            println!("{} points", rows.len());
        }
    }

    Ok(())
}

/// One row per timestamp; a column shorter than the timestamps shows `-`
fn history_rows(history: &History) -> Vec<HistoryRow> {
    fn column(values: &[f64], i: usize, format: fn(f64) -> String) -> String {
        format_optional(values.get(i).copied(), format)
    }

    history
        .timestamps
        .iter()
        .enumerate()
        .map(|(i, ts)| HistoryRow {
            time: format_time(ts),
            cpu: column(&history.cpu_usage, i, |v| format!("{:.1}", v)),
            network: column(&history.network_mb, i, |v| format!("{:.2}", v)),
            carbon: column(&history.carbon_emissions, i, |v| format!("{:.3}", v)),
            energy: column(&history.energy_consumption, i, |v| format!("{:.3}", v)),
        })
        .collect()
}

async fn show_series(client: &ApiClient, series: &str, format: OutputFormat) -> Result<()> {
    let path = format!("api/history/{}", series);
    let response: SeriesResponse = client.get(&path).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<SeriesRow> = response
                .points
                .iter()
                .map(|point| SeriesRow {
                    time: format_time(&point.timestamp),
                    value: format!("{:.3} {}", point.value, response.unit),
                })
                .collect();

            println!("{} {}", "Series:".bold(), response.series.cyan());
            print_table(&rows);
        }
    }

    Ok(())
}

/// Format an RFC 3339 timestamp as local wall-clock time
fn format_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_falls_back_to_raw() {
        assert_eq!(format_time("yesterday"), "yesterday");
        assert_eq!(format_time("2024-01-15T10:30:00Z").len(), 8);
    }

    #[test]
    fn test_history_rows_tolerate_short_columns() {
        let history = History {
            timestamps: vec!["t1".into(), "t2".into(), "t3".into()],
            cpu_usage: vec![12.0, 40.5, 7.25],
            network_mb: vec![1.0],
            carbon_emissions: vec![0.5, 0.75],
            energy_consumption: Vec::new(),
        };

        let rows = history_rows(&history);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].cpu, "40.5");
        assert_eq!(rows[0].network, "1.00");
        assert_eq!(rows[1].network, "-");
        assert_eq!(rows[1].carbon, "0.750");
        assert_eq!(rows[2].carbon, "-");
        assert_eq!(rows[0].energy, "-");
    }
}
