use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::{
    CLOUDINESS_AC, CLOUDINESS_BC, SOLAR_CONSTANT, STEFAN_BOLTZMANN, W_M2_TO_MJ_M2_DAY,
    ZERO_CELSIUS_IN_KELVIN,
};

/// Units radiation columns are supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RadiationUnits {
    #[default]
    MjPerM2Day,
    WPerM2,
}

impl RadiationUnits {
    pub fn to_mj_per_m2_day(self, value: f64) -> f64 {
        match self {
            RadiationUnits::MjPerM2Day => value,
            RadiationUnits::WPerM2 => value * W_M2_TO_MJ_M2_DAY,
        }
    }
}

/// Extraterrestrial radiation (MJ m^-2 day^-1) for a day of year and a
/// latitude in degrees.
pub fn extraterrestrial_radiation(day_of_year: f64, latitude: f64) -> f64 {
    let lat_rad = PI * latitude / 180.;
    let ds = 0.409 * (2. * PI / 365. * day_of_year - 1.39).sin(); // solar declination (rad)
    let dr = 1. + 0.033 * (day_of_year * 2. * PI / 365.).cos(); // inverse Earth-Sun distance
    let omega = (-lat_rad.tan() * ds.tan()).clamp(-1., 1.).acos(); // sunset hour angle (rad)
    let daylight = omega * lat_rad.sin() * ds.sin() + lat_rad.cos() * ds.cos() * omega.sin();
    24. * 60. / PI * SOLAR_CONSTANT * dr * daylight
}

/// Cloudiness factor from the ratio of measured to extraterrestrial radiation.
pub fn cloudiness(solar_radiation: f64, extraterrestrial_radiation: f64) -> f64 {
    // polar night: no sun at the top of the atmosphere either
    let ratio = if extraterrestrial_radiation != 0. {
        solar_radiation / extraterrestrial_radiation
    } else {
        0.
    };
    CLOUDINESS_AC * ratio + CLOUDINESS_BC
}

/// Net emissivity between the surface and the atmosphere at air temperature `t` (degC).
pub fn net_emissivity(t: f64) -> f64 {
    0.261 * (-7.77e-4 * t.powi(2)).exp() - 0.02
}

/// Net radiation (MJ m^-2 day^-1): absorbed shortwave minus net longwave loss.
pub fn net_radiation(
    albedo: f64,
    solar_radiation: f64,
    cloudiness: f64,
    emissivity: f64,
    t: f64,
) -> f64 {
    let t_k = t + ZERO_CELSIUS_IN_KELVIN;
    (1. - albedo) * solar_radiation - cloudiness * emissivity * STEFAN_BOLTZMANN * t_k.powi(4)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn extraterrestrial_radiation_reference_day() {
        // 3 September at 20 degrees south
        let ra = extraterrestrial_radiation(246., -20.);
        assert_abs_diff_eq!(ra, 32.2, epsilon = 0.05);
    }

    #[test]
    fn extraterrestrial_radiation_is_zero_in_polar_night() {
        assert_abs_diff_eq!(extraterrestrial_radiation(355., 70.), 0., epsilon = 1e-9);
        assert!(extraterrestrial_radiation(172., 70.) > 40.);
    }

    #[test]
    fn cloudiness_bounds() {
        assert_abs_diff_eq!(cloudiness(0., 30.), CLOUDINESS_BC);
        assert_abs_diff_eq!(cloudiness(30., 30.), 1., epsilon = 1e-12);
        assert_abs_diff_eq!(cloudiness(5., 0.), CLOUDINESS_BC);
    }

    #[test]
    fn net_emissivity_decreases_away_from_zero() {
        assert_abs_diff_eq!(net_emissivity(0.), 0.241, epsilon = 1e-12);
        assert!(net_emissivity(20.) < net_emissivity(0.));
        assert_abs_diff_eq!(net_emissivity(20.), 0.17128, epsilon = 1e-5);
    }

    #[test]
    fn net_radiation_clear_summer_day() {
        let ra = extraterrestrial_radiation(180., 40.);
        let c = cloudiness(20., ra);
        let rn = net_radiation(0.23, 20., c, net_emissivity(20.), 20.);
        assert_abs_diff_eq!(rn, 11.5336, epsilon = 1e-3);
    }

    #[test]
    fn watts_convert_to_daily_energy() {
        let daily = RadiationUnits::WPerM2.to_mj_per_m2_day(100.);
        assert_abs_diff_eq!(daily, 8.64, epsilon = 1e-12);
        assert_abs_diff_eq!(RadiationUnits::MjPerM2Day.to_mj_per_m2_day(8.64), 8.64);
    }
}
