use crate::constants::{PRESSURE_LAPSE, PSYCHROMETRIC_COEFFICIENT, SEA_LEVEL_PRESSURE};
use crate::model::InvalidInput;

/// Latent heat of vaporization (MJ/kg) at air temperature `t` (degC).
pub fn latent_heat(t: f64) -> f64 {
    2.501 - 0.002361 * t
}

/// Saturation vapor pressure (kPa), Tetens form.
pub fn saturation_vapor_pressure(t: f64) -> f64 {
    0.6108 * (17.27 * t / (t + 237.3)).exp()
}

/// Actual vapor pressure (kPa) from temperature (degC) and relative humidity (%).
pub fn actual_vapor_pressure(t: f64, relative_humidity: f64) -> f64 {
    relative_humidity * saturation_vapor_pressure(t) / 100.
}

/// Slope of the saturation vapor pressure curve (kPa/degC).
pub fn vapor_pressure_slope(t: f64) -> f64 {
    4098. * saturation_vapor_pressure(t) / (t + 237.3).powi(2)
}

/// Atmospheric pressure (kPa) at `elevation` metres above sea level.
pub fn pressure_from_elevation(elevation: f64) -> f64 {
    SEA_LEVEL_PRESSURE - PRESSURE_LAPSE * elevation
}

/// Psychrometric constant (kPa/degC) for pressure `p` (kPa) and latent heat `lambda` (MJ/kg).
pub fn psychrometric_constant(p: f64, lambda: f64) -> f64 {
    PSYCHROMETRIC_COEFFICIENT * p / lambda
}

/// Bowen ratio between the air and an evaporating surface.
pub fn bowen_ratio(
    gamma: f64,
    air_temperature: f64,
    surface_temperature: f64,
    air_vapor_pressure: f64,
    surface_vapor_pressure: f64,
) -> Result<f64, InvalidInput> {
    let vapor_gradient = air_vapor_pressure - surface_vapor_pressure;
    if vapor_gradient == 0. {
        let message = "Bowen ratio is undefined when air and surface vapor pressures are equal";
        return Err(InvalidInput::Undefined(message.to_string()));
    }
    Ok(gamma * (air_temperature - surface_temperature) / vapor_gradient)
}

/// Priestley-Taylor coefficient implied by a Bowen ratio `beta`.
///
/// The sign is not checked here: a ratio below -1 gives a negative alpha.
pub fn alpha_from_bowen(delta: f64, gamma: f64, beta: f64) -> Result<f64, InvalidInput> {
    let denominator = delta * (1. + beta);
    let alpha = (delta + gamma) / denominator;
    if denominator == 0. || !alpha.is_finite() {
        let message = format!("alpha is undefined for Bowen ratio {beta}");
        return Err(InvalidInput::Undefined(message));
    }
    Ok(alpha)
}
