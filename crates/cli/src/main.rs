//! Obesity Level Prediction CLI
//!
//! A command-line tool for requesting predictions and inspecting the
//! prediction service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{info, predict};
use std::path::PathBuf;

/// Obesity Level Prediction CLI
#[derive(Parser)]
#[command(name = "obp")]
#[command(author, version, about = "CLI for the Obesity Level Prediction API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (falls back to the config file, then http://localhost:8000)
    #[arg(long, env = "OBP_API_URL")]
    pub api_url: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, env = "OBP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict the obesity level for one JSON record
    Predict {
        /// JSON file with the 16 answers, or - for stdin
        #[arg(long, short = 'i', default_value = "-")]
        file: PathBuf,
    },

    /// Show service health
    Health,

    /// List the predicted labels and their class codes
    Labels,

    /// Describe the accepted input features
    Features,

    /// Manage the CLI configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,

    /// Store defaults in the configuration file
    Set {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        default_format: Option<output::OutputFormat>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut file_config = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            file_config
                .default_format
                .as_deref()
                .and_then(output::OutputFormat::from_name)
        })
        .unwrap_or_default();

    let api_url = file_config.resolve_api_url(cli.api_url);
    let api_key = file_config.resolve_api_key(cli.api_key);

    let connect = || client::ApiClient::new(&api_url, api_key.clone());

    match cli.command {
        Commands::Predict { file } => predict::predict(&connect()?, &file, format).await?,
        Commands::Health => info::health(&connect()?, format).await?,
        Commands::Labels => info::labels(&connect()?, format).await?,
        Commands::Features => info::features(&connect()?, format).await?,
        Commands::Config(ConfigCommands::Show) => {
            println!("api_url:        {}", api_url);
            println!(
                "api_key:        {}",
                if api_key.is_some() { "(set)" } else { "(not set)" }
            );
            println!("format:         {:?}", format);
            println!("config file:    {}", config::Config::config_path()?.display());
        }
        Commands::Config(ConfigCommands::Set {
            api_url,
            api_key,
            default_format,
        }) => {
            if api_url.is_some() {
                file_config.api_url = api_url;
            }
            if api_key.is_some() {
                file_config.api_key = api_key;
            }
            if let Some(format) = default_format {
                file_config.default_format = Some(format!("{:?}", format).to_lowercase());
            }
            let path = file_config.save()?;
            output::print_success(&format!("Saved {}", path.display()));
        }
    }

    Ok(())
}
