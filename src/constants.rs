/// Priestley-Taylor coefficient for a well-watered surface.
pub const PRIESTLEY_TAYLOR_ALPHA: f64 = 1.26;

/// Stefan-Boltzmann constant (MJ m^-2 day^-1 K^-4)
pub const STEFAN_BOLTZMANN: f64 = 4.89e-9;

/// Solar constant (MJ m^-2 min^-1)
pub const SOLAR_CONSTANT: f64 = 0.082;

/// c_p / epsilon for air (MJ kg^-1 degC^-1) scaled so that gamma = k * P / lambda.
pub const PSYCHROMETRIC_COEFFICIENT: f64 = 0.00163;

/// Sea-level standard pressure (kPa)
pub const SEA_LEVEL_PRESSURE: f64 = 101.3;

/// Linear pressure lapse with elevation (kPa m^-1)
pub const PRESSURE_LAPSE: f64 = 0.01055;

pub const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;

/// W m^-2 sustained over one day, expressed in MJ m^-2 day^-1.
pub const W_M2_TO_MJ_M2_DAY: f64 = 0.0864;

// Angstrom-type cloudiness coefficients
pub const CLOUDINESS_AC: f64 = 0.72;
pub const CLOUDINESS_BC: f64 = 0.28;

pub const DEFAULT_ALBEDO: f64 = 0.23;
