mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dnalens")]
#[command(about = "Benchmark ad creatives against the Winning DNA of top competitors")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synthesize and persist the Winning DNA from a competitor CSV
    Synthesize {
        /// Competitor dataset (Advertiser App, Impression Share, Creative URL, Duration)
        dataset: PathBuf,
        /// Rows to analyze, overriding DNALENS_TOP_N
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Print the persisted Winning DNA
    Profile,
    /// Print the analyzer prompt built from the persisted Winning DNA
    Prompt,
    /// Score a creative (local path or URL) against the Winning DNA
    Report {
        creative: String,
        /// Re-synthesize from this dataset first
        #[arg(long)]
        dataset: Option<PathBuf>,
        /// Print the report and creative insight as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = dnalens_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Synthesize { dataset, top_n }) => {
            commands::run_synthesize(&config, &dataset, top_n).await?;
        }
        Some(Commands::Profile) => commands::run_profile(&config)?,
        Some(Commands::Prompt) => commands::run_prompt(&config)?,
        Some(Commands::Report {
            creative,
            dataset,
            json,
        }) => commands::run_report(&config, &creative, dataset.as_deref(), json).await?,
        None => println!("dnalens: run with --help for available commands"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
