use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::io::{read_observations, write_daily, write_estimates, InputRow, IoError, OutputRow};
use crate::pet::priestley_taylor::{self, Params};
use crate::summary::daily_means;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub records: usize,
    pub estimated: usize,
    pub rejected: usize,
    pub written: usize,
    pub days: usize,
}

/// Turn parsed input rows into output rows, logging each rejection.
pub fn process(inputs: Vec<InputRow>, params: &Params) -> Vec<OutputRow> {
    inputs
        .into_iter()
        .map(|row| {
            let estimate = match row.observation {
                Ok(observation) => priestley_taylor::estimate(&observation, params),
                Err(reason) => Err(reason),
            };
            if let Err(reason) = &estimate {
                warn!(
                    "line {} ({}): record rejected: {}",
                    row.line, row.raw_timestamp, reason
                );
            }
            OutputRow {
                timestamp: row.timestamp,
                raw_timestamp: row.raw_timestamp,
                estimate,
            }
        })
        .collect()
}

/// Read `input`, estimate PET for every record and write `output`
/// (and the daily table when `daily` is given).
pub fn run(
    input: &Path,
    output: &Path,
    daily: Option<&Path>,
    config: &Config,
) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let delimiter = config.delimiter_byte()?;

    info!("reading observations from {}", input.display());
    let rows = read_observations(input, config)?;
    let records = rows.len();

    let processed = process(rows, &config.params());
    let estimated = processed.iter().filter_map(OutputRow::estimated).count();
    let written = write_estimates(output, &processed, config.invalid_records, delimiter)?;
    info!(
        "wrote {written} rows to {} ({estimated} of {records} records estimated)",
        output.display()
    );

    let days = match daily {
        Some(path) => {
            let days = daily_means(processed.iter().filter_map(OutputRow::estimated));
            write_daily(path, &days, delimiter)?;
            info!("wrote {} daily values to {}", days.len(), path.display());
            days.len()
        }
        None => 0,
    };

    Ok(RunSummary {
        records,
        estimated,
        rejected: records - estimated,
        written,
        days,
    })
}
