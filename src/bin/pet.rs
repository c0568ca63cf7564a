use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use pet_rs::config::{load_config, Config};
use pet_rs::pipeline;

/// Priestley-Taylor potential evapotranspiration from a CSV of site observations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV with timestamp, air temperature and radiation columns
    input: PathBuf,
    /// Output CSV of timestamp and PET
    output: PathBuf,
    /// JSON configuration (site, method, column names)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Also write daily mean PET to this CSV
    #[arg(long)]
    daily: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path).context("Failed to load configuration")?,
        None => Config::default(),
    };

    let daily = cli.daily.as_deref();
    let summary = pipeline::run(&cli.input, &cli.output, daily, &config)
        .with_context(|| format!("Failed to process {}", cli.input.display()))?;

    if summary.rejected > 0 {
        warn!(
            "{} of {} records were rejected",
            summary.rejected, summary.records
        );
    }
    info!(
        "done: {} estimates from {} records",
        summary.estimated, summary.records
    );
    Ok(())
}
