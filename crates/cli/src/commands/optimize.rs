//! Optimization commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{
    ApiClient, OptimizationDataResponse, OptimizeRequest, OptimizeResponse, SavingsResponse,
};
use crate::output::{
    color_status, format_carbon, format_optional, format_percent, print_info, print_json,
    print_success, print_table, print_warning, OutputFormat,
};

/// Row for the actions table
#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Row for the savings table
#[derive(Tabled)]
struct SavingsRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Reduction")]
    reduction: String,
    #[tabled(rename = "Est. Savings")]
    savings: String,
}

/// Apply a strategy on the agent
pub async fn apply(client: &ApiClient, strategy: &str, format: OutputFormat) -> Result<()> {
    let request = OptimizeRequest {
        optimization_type: strategy.to_string(),
    };
    let result: OptimizeResponse = client.post("api/optimize", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.success {
                print_success(&format!(
                    "Applied {} (estimated reduction {})",
                    result.optimization_type, result.estimated_reduction
                ));
            } else {
                print_warning(&format!(
                    "Recorded {} but actions failed: {}",
                    result.optimization_type,
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }

            let rows: Vec<ActionRow> = result
                .actions
                .iter()
                .map(|a| ActionRow {
                    action: a.action.clone(),
                    status: color_status(&a.status),
                    details: a.details.clone(),
                })
                .collect();
            if !rows.is_empty() {
                print_table(&rows);
            }

            println!();
            println!(
                "Before:                 {}",
                format_optional(result.before_carbon_g, format_carbon)
            );
            println!(
                "After (projected):      {}",
                format_optional(result.after_carbon_g, format_carbon).green()
            );
            println!(
                "Reduction:              {} ({})",
                format_optional(result.reduction_g, format_carbon),
                format_optional(result.reduction_percent, format_percent)
            );
        }
    }

    Ok(())
}

/// Show the most recent optimization record
pub async fn show_optimization(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: OptimizationDataResponse = client.get("api/optimization-data").await?;
    let data = &response.optimization_data;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            if !data.applied {
                print_info("No optimization has been applied yet");
                return Ok(());
            }

            println!("{}", "Last Optimization".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Strategy:               {}",
                data.strategy_id.as_deref().unwrap_or("-").cyan()
            );
            if let Some(applied_at) = &data.applied_at {
                println!("Applied at:             {}", applied_at.dimmed());
            }
            println!(
                "Before:                 {}",
                format_optional(data.before_carbon_g, format_carbon)
            );
            println!(
                "After (projected):      {}",
                format_optional(data.after_carbon_g, format_carbon).green()
            );
            println!(
                "{}             {} ({})",
                "Reduction:".bold(),
                format_optional(data.reduction_g, format_carbon).green().bold(),
                format_optional(data.reduction_percent, format_percent)
            );
        }
    }

    Ok(())
}

/// Show projected savings for every strategy
pub async fn show_savings(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: SavingsResponse = client.get("api/savings").await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<SavingsRow> = response
                .savings
                .iter()
                .map(|(id, estimate)| SavingsRow {
                    strategy: id.clone(),
                    name: estimate.name.clone(),
                    reduction: format_percent(estimate.potential_reduction_percent),
                    savings: format_carbon(estimate.estimated_savings_g),
                })
                .collect();

            println!("{}", "Projected Savings".bold());
            print_table(&rows);
        }
    }

    Ok(())
}
