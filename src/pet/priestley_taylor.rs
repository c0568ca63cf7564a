use chrono::{Datelike, NaiveDateTime};
use ndarray::{Array1, ArrayView1, Zip};
use serde::{Deserialize, Serialize};

#[cfg(feature = "python")]
use numpy::{PyArray1, PyReadonlyArray1, ToPyArray};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3_stub_gen::derive::gen_stub_pyfunction;

use crate::atmosphere::{
    actual_vapor_pressure, alpha_from_bowen, bowen_ratio, latent_heat, pressure_from_elevation,
    psychrometric_constant, vapor_pressure_slope,
};
use crate::constants::{DEFAULT_ALBEDO, PRIESTLEY_TAYLOR_ALPHA, ZERO_CELSIUS_IN_KELVIN};
use crate::model::{
    finite, non_negative, require, within, Error, InvalidInput, Observation, PetEstimate,
};
use crate::radiation::{cloudiness, extraterrestrial_radiation, net_emissivity, net_radiation};

const ABSOLUTE_ZERO: f64 = -ZERO_CELSIUS_IN_KELVIN;
const TEMPERATURE_RANGE: (f64, f64) = (-90., 60.);
const PRESSURE_RANGE: (f64, f64) = (f64::MIN_POSITIVE, 120.);
const NET_RADIATION_LIMIT: f64 = 120.;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alpha {
    Fixed(f64),
    /// Derived per record from air/surface temperature and humidity.
    BowenRatio,
}

impl Default for Alpha {
    fn default() -> Self {
        Alpha::Fixed(PRIESTLEY_TAYLOR_ALPHA)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilHeatFlux {
    #[default]
    Zero,
    /// Fixed fraction of net radiation.
    Fraction(f64),
    /// Taken from the observation.
    Measured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputUnits {
    /// Evaporated water depth (mm/day).
    #[default]
    MmPerDay,
    /// Latent heat flux equivalent (MJ m^-2 day^-1).
    MjPerM2Day,
}

/// Site and method settings shared by every record of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Site elevation (m), used when a record carries no pressure.
    pub elevation: f64,
    /// Site latitude (degrees), needed to derive extraterrestrial radiation.
    pub latitude: Option<f64>,
    pub albedo: f64,
    pub alpha: Alpha,
    pub soil_heat_flux: SoilHeatFlux,
    pub output_units: OutputUnits,
    pub clamp_negative: bool,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            elevation: 0.,
            latitude: None,
            albedo: DEFAULT_ALBEDO,
            alpha: Alpha::default(),
            soil_heat_flux: SoilHeatFlux::default(),
            output_units: OutputUnits::default(),
            clamp_negative: false,
        }
    }
}

impl Params {
    /// Check the settings that do not depend on the data.
    pub fn validate(&self) -> Result<(), InvalidInput> {
        if let Some(latitude) = self.latitude {
            within("latitude", latitude, -90., 90.)?;
        }
        within("albedo", self.albedo, 0., 1.)?;
        if let Alpha::Fixed(alpha) = self.alpha {
            positive_alpha(alpha)?;
        }
        if let SoilHeatFlux::Fraction(fraction) = self.soil_heat_flux {
            within("soil_heat_flux_fraction", fraction, 0., 1.)?;
        }
        Ok(())
    }
}

/// Priestley-Taylor evaporation as latent heat flux (MJ m^-2 day^-1).
pub fn priestley_taylor(
    alpha: f64,
    delta: f64,
    gamma: f64,
    net_radiation: f64,
    soil_heat_flux: f64,
) -> f64 {
    alpha * delta / (delta + gamma) * (net_radiation - soil_heat_flux)
}

/// Potential evapotranspiration for one record.
pub fn estimate(observation: &Observation, params: &Params) -> Result<PetEstimate, InvalidInput> {
    params.validate()?;
    let t = temperature("air_temperature", observation.air_temperature)?;

    let lambda = latent_heat(t);
    let delta = vapor_pressure_slope(t);
    let pressure = match observation.pressure {
        Some(p) => p,
        None => pressure_from_elevation(params.elevation),
    };
    let pressure = within("pressure", pressure, PRESSURE_RANGE.0, PRESSURE_RANGE.1)?;
    let gamma = psychrometric_constant(pressure, lambda);

    let rn = resolve_net_radiation(observation, params, t)?;
    let g = match params.soil_heat_flux {
        SoilHeatFlux::Zero => 0.,
        SoilHeatFlux::Fraction(fraction) => fraction * rn,
        SoilHeatFlux::Measured => require("soil_heat_flux", observation.soil_heat_flux)?,
    };
    let alpha = match params.alpha {
        Alpha::Fixed(alpha) => alpha,
        Alpha::BowenRatio => bowen_alpha(observation, t, delta, gamma)?,
    };

    let energy = priestley_taylor(alpha, delta, gamma, rn, g);
    let pet = match params.output_units {
        OutputUnits::MmPerDay => energy / lambda,
        OutputUnits::MjPerM2Day => energy,
    };
    let pet = if params.clamp_negative { pet.max(0.) } else { pet };

    Ok(PetEstimate {
        timestamp: observation.timestamp,
        pet: finite("pet", pet)?,
    })
}

/// Estimates for every record, in input order.
pub fn estimate_all(
    observations: &[Observation],
    params: &Params,
) -> Vec<Result<PetEstimate, InvalidInput>> {
    observations
        .iter()
        .map(|observation| estimate(observation, params))
        .collect()
}

/// Array form: invalid time steps come back as NaN, invalid `params` fail
/// the whole call.
pub fn simulate(
    temperature: ArrayView1<f64>,
    net_radiation: ArrayView1<f64>,
    params: &Params,
) -> Result<Array1<f64>, Error> {
    let len = temperature.len();
    if net_radiation.len() != len {
        return Err(Error::LengthMismatch(len, net_radiation.len()));
    }
    params.validate()?;
    let timestamp = NaiveDateTime::default();
    let pet = Zip::from(&temperature)
        .and(&net_radiation)
        .map_collect(|&t, &rn| {
            estimate(&Observation::new(timestamp, t, rn), params)
                .map_or(f64::NAN, |estimate| estimate.pet)
        });
    Ok(pet)
}

fn temperature(field: &'static str, t: f64) -> Result<f64, InvalidInput> {
    let t = finite(field, t)?;
    if t <= ABSOLUTE_ZERO {
        let message = format!("{field} {t} degC is below absolute zero");
        return Err(InvalidInput::Undefined(message));
    }
    within(field, t, TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1)
}

fn positive_alpha(alpha: f64) -> Result<f64, InvalidInput> {
    if alpha.is_finite() && alpha > 0. {
        return Ok(alpha);
    }
    let message = format!("alpha must be positive, got {alpha}");
    Err(InvalidInput::Undefined(message))
}

/// Rs and Ra may be sustained rates, so only their sign is checked.
fn resolve_net_radiation(
    observation: &Observation,
    params: &Params,
    t: f64,
) -> Result<f64, InvalidInput> {
    let rn = match (observation.net_radiation, observation.solar_radiation) {
        (Some(rn), _) => rn,
        (None, Some(rs)) => {
            let rs = non_negative("solar_radiation", rs)?;
            let ra = match observation.extraterrestrial_radiation {
                Some(ra) => non_negative("extraterrestrial_radiation", ra)?,
                None => {
                    let latitude = params.latitude.ok_or(InvalidInput::Missing("latitude"))?;
                    let day_of_year = observation.timestamp.ordinal();
                    extraterrestrial_radiation(day_of_year as f64, latitude)
                }
            };
            net_radiation(params.albedo, rs, cloudiness(rs, ra), net_emissivity(t), t)
        }
        (None, None) => return Err(InvalidInput::Missing("net_radiation")),
    };
    within("net_radiation", rn, -NET_RADIATION_LIMIT, NET_RADIATION_LIMIT)
}

fn bowen_alpha(
    observation: &Observation,
    t: f64,
    delta: f64,
    gamma: f64,
) -> Result<f64, InvalidInput> {
    let rh = require("relative_humidity", observation.relative_humidity)?;
    let rh = within("relative_humidity", rh, 0., 100.)?;
    let surface_t = require("surface_temperature", observation.surface_temperature)?;
    let surface_t = temperature("surface_temperature", surface_t)?;
    let surface_rh = require("surface_humidity", observation.surface_humidity)?;
    let surface_rh = within("surface_humidity", surface_rh, 0., 100.)?;

    let air_vapor = actual_vapor_pressure(t, rh);
    let surface_vapor = actual_vapor_pressure(surface_t, surface_rh);
    let beta = bowen_ratio(gamma, t, surface_t, air_vapor, surface_vapor)?;
    // beta < -1 would make evaporation fall as net radiation rises
    positive_alpha(alpha_from_bowen(delta, gamma, beta)?)
}

#[cfg(feature = "python")]
#[gen_stub_pyfunction(module = "pet_rs.pet.priestley_taylor")]
#[pyfunction]
#[pyo3(name = "simulate")]
#[pyo3(signature = (
    temperature,
    net_radiation,
    elevation = 0.0,
    alpha = PRIESTLEY_TAYLOR_ALPHA,
    soil_heat_flux_fraction = 0.0
))]
pub fn py_simulate<'py>(
    py: Python<'py>,
    temperature: PyReadonlyArray1<'py, f64>,
    net_radiation: PyReadonlyArray1<'py, f64>,
    elevation: f64,
    alpha: f64,
    soil_heat_flux_fraction: f64,
) -> PyResult<Bound<'py, PyArray1<f64>>> {
    let params = Params {
        elevation,
        alpha: Alpha::Fixed(alpha),
        soil_heat_flux: SoilHeatFlux::Fraction(soil_heat_flux_fraction),
        ..Params::default()
    };
    let pet = simulate(temperature.as_array(), net_radiation.as_array(), &params)?;
    Ok(pet.to_pyarray(py))
}

#[cfg(feature = "python")]
pub fn make_module(py: Python<'_>) -> PyResult<Bound<'_, PyModule>> {
    let m = PyModule::new(py, "priestley_taylor")?;
    m.add_function(wrap_pyfunction!(py_simulate, &m)?)?;
    Ok(m)
}
