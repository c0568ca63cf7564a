use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DEFAULT_ALBEDO;
use crate::pet::priestley_taylor::{Alpha, OutputUnits, Params, SoilHeatFlux};
use crate::radiation::RadiationUnits;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("IO error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// What to do with records that cannot produce an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRecords {
    /// Drop them from the output.
    #[default]
    Skip,
    /// Keep the row with an empty value and the reason in a `flag` column.
    Flag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// metres above sea level
    pub elevation: f64,
    /// decimal degrees, south negative
    pub latitude: Option<f64>,
    pub albedo: f64,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            elevation: 0.,
            latitude: None,
            albedo: DEFAULT_ALBEDO,
        }
    }
}

/// Input column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    pub timestamp: String,
    pub air_temperature: String,
    pub net_radiation: String,
    pub solar_radiation: String,
    pub extraterrestrial_radiation: String,
    pub relative_humidity: String,
    pub pressure: String,
    pub soil_heat_flux: String,
    pub surface_temperature: String,
    pub surface_humidity: String,
}

impl Default for Columns {
    fn default() -> Self {
        Columns {
            timestamp: "timestamp".to_string(),
            air_temperature: "air_temperature".to_string(),
            net_radiation: "net_radiation".to_string(),
            solar_radiation: "solar_radiation".to_string(),
            extraterrestrial_radiation: "extraterrestrial_radiation".to_string(),
            relative_humidity: "relative_humidity".to_string(),
            pressure: "pressure".to_string(),
            soil_heat_flux: "soil_heat_flux".to_string(),
            surface_temperature: "surface_temperature".to_string(),
            surface_humidity: "surface_humidity".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: Site,
    pub alpha: Alpha,
    pub soil_heat_flux: SoilHeatFlux,
    pub radiation_units: RadiationUnits,
    pub output_units: OutputUnits,
    pub clamp_negative: bool,
    pub invalid_records: InvalidRecords,
    /// chrono format string; the common layouts are tried when unset
    pub timestamp_format: Option<String>,
    pub delimiter: String,
    pub null_markers: Vec<String>,
    pub columns: Columns,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            site: Site::default(),
            alpha: Alpha::default(),
            soil_heat_flux: SoilHeatFlux::default(),
            radiation_units: RadiationUnits::default(),
            output_units: OutputUnits::default(),
            clamp_negative: false,
            invalid_records: InvalidRecords::default(),
            timestamp_format: None,
            delimiter: ",".to_string(),
            null_markers: ["", "NA", "NaN", "-9999"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            columns: Columns::default(),
        }
    }
}

impl Config {
    pub fn params(&self) -> Params {
        Params {
            elevation: self.site.elevation,
            latitude: self.site.latitude,
            albedo: self.site.albedo,
            alpha: self.alpha,
            soil_heat_flux: self.soil_heat_flux,
            output_units: self.output_units,
            clamp_negative: self.clamp_negative,
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(ConfigError::Invalid {
                field: "delimiter",
                message: format!(
                    "expected a single-byte delimiter, got '{}'",
                    self.delimiter
                ),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("site.elevation", self.site.elevation, -500., 9000.)?;
        if let Some(latitude) = self.site.latitude {
            check_range("site.latitude", latitude, -90., 90.)?;
        }
        check_range("site.albedo", self.site.albedo, 0., 1.)?;
        if let Alpha::Fixed(alpha) = self.alpha {
            if !(alpha > 0. && alpha <= 3.) {
                return Err(ConfigError::Invalid {
                    field: "alpha",
                    message: format!("{alpha} is not in (0, 3]"),
                });
            }
        }
        if let SoilHeatFlux::Fraction(fraction) = self.soil_heat_flux {
            check_range("soil_heat_flux.fraction", fraction, 0., 1.)?;
        }
        self.delimiter_byte()?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            message: format!("{value} is not in [{min}, {max}]"),
        })
    }
}

/// Load and validate a JSON configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let config: Config = serde_json::from_reader(reader).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    debug!("loaded configuration from {}: {:?}", path.display(), config);
    Ok(config)
}
