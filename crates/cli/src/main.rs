//! Carbon Monitor CLI
//!
//! A command-line tool for reading the carbon agent's current figures,
//! history and optimization records.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{history, optimize, stats};

/// Carbon Monitor CLI
#[derive(Parser)]
#[command(name = "carbonctl")]
#[command(author, version, about = "CLI for the Carbon Monitor agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via CARBON_API_URL env var)
    #[arg(long, env = "CARBON_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current CPU, network, energy and carbon reading
    Stats,

    /// Show recorded history
    History {
        /// Only show one series (cpu, network, carbon, energy)
        #[arg(long, short)]
        series: Option<String>,
    },

    /// Apply an optimization strategy
    Optimize {
        /// Strategy (reduce_cpu, optimize_network, power_management)
        #[arg(default_value = "reduce_cpu")]
        strategy: String,
    },

    /// Show the last optimization's before/after figures
    Optimization,

    /// Show projected savings for each strategy
    Savings,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Stats => stats::show_stats(&client, cli.format).await?,
        Commands::History { series } => history::show_history(&client, series, cli.format).await?,
        Commands::Optimize { strategy } => optimize::apply(&client, &strategy, cli.format).await?,
        Commands::Optimization => optimize::show_optimization(&client, cli.format).await?,
        Commands::Savings => optimize::show_savings(&client, cli.format).await?,
    }

    Ok(())
}
