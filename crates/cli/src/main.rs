//! PCOS prediction CLI
//!
//! A command-line client for the prediction server: list the expected
//! inputs, submit a form, review the stored history and download it as CSV.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{features, history, predict};
use std::path::PathBuf;

/// PCOS prediction CLI
#[derive(Parser)]
#[command(name = "pcos")]
#[command(author, version, about = "CLI for the PCOS prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PCOS_API_URL env var)
    #[arg(long, env = "PCOS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the inputs the classifier expects
    Features,

    /// Submit one form and show the prediction
    Predict {
        /// JSON object of feature name to value
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Set one feature, e.g. --set "AMH(ng/mL)=6.2" (repeatable)
        #[arg(long = "set", value_name = "NAME=VALUE", value_parser = predict::parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Show the stored prediction history
    History,

    /// Download the prediction history as CSV
    Export {
        /// Output file path
        #[arg(long, short, default_value = history::EXPORT_FILE_NAME)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;
    let format = config.format(cli.format)?;

    // Initialize client
    let client = client::ApiClient::new(&config.api_url(cli.api_url))?;

    // Execute command
    match cli.command {
        Commands::Features => {
            features::list_features(&client, format).await?;
        }
        Commands::Predict { input, assignments } => {
            predict::run_prediction(&client, input.as_deref(), assignments, format).await?;
        }
        Commands::History => {
            history::show_history(&client, format).await?;
        }
        Commands::Export { output } => {
            history::export_history(&client, &output).await?;
        }
    }

    Ok(())
}
