use chrono::NaiveDateTime;
use thiserror::Error;

#[cfg(feature = "python")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Why a single record could not produce an estimate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidInput {
    #[error("missing value for '{0}'")]
    Missing(&'static str),
    #[error("could not parse '{value}' for '{field}'")]
    Unparsable { field: &'static str, value: String },
    #[error("'{field}' is not finite (got {value})")]
    NonFinite { field: &'static str, value: f64 },
    #[error("'{field}' = {value} is outside the physical range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{0}")]
    Undefined(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("temperature and net_radiation must have the same length (got {0} and {1})")]
    LengthMismatch(usize, usize),
    #[error("invalid parameters: {0}")]
    InvalidParams(#[from] InvalidInput),
}

#[cfg(feature = "python")]
impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// One time step of site meteorology.
///
/// Radiation terms are in MJ m^-2 day^-1, temperatures in degrees Celsius,
/// humidities in percent and pressure in kPa.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub air_temperature: f64,
    pub net_radiation: Option<f64>,
    pub solar_radiation: Option<f64>,
    pub extraterrestrial_radiation: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub soil_heat_flux: Option<f64>,
    pub surface_temperature: Option<f64>,
    pub surface_humidity: Option<f64>,
}

impl Observation {
    /// Record with only the fields the fixed-alpha equation needs.
    pub fn new(timestamp: NaiveDateTime, air_temperature: f64, net_radiation: f64) -> Self {
        Observation {
            timestamp,
            air_temperature,
            net_radiation: Some(net_radiation),
            solar_radiation: None,
            extraterrestrial_radiation: None,
            relative_humidity: None,
            pressure: None,
            soil_heat_flux: None,
            surface_temperature: None,
            surface_humidity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PetEstimate {
    pub timestamp: NaiveDateTime,
    pub pet: f64,
}

pub(crate) fn require(field: &'static str, value: Option<f64>) -> Result<f64, InvalidInput> {
    let value = value.ok_or(InvalidInput::Missing(field))?;
    finite(field, value)
}

pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, InvalidInput> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidInput::NonFinite { field, value })
    }
}

pub(crate) fn within(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, InvalidInput> {
    let value = finite(field, value)?;
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(InvalidInput::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, InvalidInput> {
    within(field, value, 0., f64::INFINITY)
}
