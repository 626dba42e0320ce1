//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of rows
pub fn print_table<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any response as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format grams of CO₂, switching to kg above 1000 g
pub fn format_carbon(grams: f64) -> String {
    if grams.abs() >= 1000.0 {
        format!("{:.3} kg", grams / 1000.0)
    } else {
        format!("{:.2} g", grams)
    }
}

/// Format megabytes, switching to GB above 1024 MB
pub fn format_megabytes(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{:.2} MB", mb)
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// Format an optional figure, dashing out missing values
pub fn format_optional(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "-".to_string())
}

/// Color action status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "success" => status.green().to_string(),
        "info" => status.blue().to_string(),
        "recommendation" => status.yellow().to_string(),
        _ => status.to_string(),
    }
}

/// Color CPU usage by load
pub fn color_usage(percent: f64) -> String {
    let formatted = format_percent(percent);
    if percent >= 80.0 {
        formatted.red().to_string()
    } else if percent >= 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}
