//! Atmosphere approximations used by the flight model.

use std::fmt;

use crate::{Position, Speed};

#[cfg(test)]
mod tests;

/// Atmospheric pressure, stored in hectopascals.
#[derive(Clone, Copy, PartialEq, PartialOrd, serde::Serialize, serde::Deserialize)]
pub struct Pressure(f32);

impl Pressure {
    #[must_use]
    pub const fn from_hpa(hpa: f32) -> Self { Self(hpa) }

    #[must_use]
    pub const fn into_hpa(self) -> f32 { self.0 }
}

impl fmt::Debug for Pressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:.2} hPa", self.0) }
}

/// The datum that pressure altitudes and flight levels are referenced to.
pub const STANDARD_PRESSURE: Pressure = Pressure::from_hpa(1013.25);

/// Altitude change per hectopascal of pressure difference near sea level.
pub const FEET_PER_HPA: f32 = 28.;

/// Converts an altitude above mean sea level under the local QNH into pressure altitude.
#[must_use]
pub fn pressure_altitude(amsl: Position<f32>, qnh: Pressure) -> Position<f32> {
    Position::from_feet(amsl.feet() - (qnh.0 - STANDARD_PRESSURE.0) * FEET_PER_HPA)
}

/// Converts a pressure altitude into an altitude above mean sea level under the local QNH.
#[must_use]
pub fn amsl_altitude(pressure_alt: Position<f32>, qnh: Pressure) -> Position<f32> {
    Position::from_feet(pressure_alt.feet() + (qnh.0 - STANDARD_PRESSURE.0) * FEET_PER_HPA)
}

/// Altitude below which indicated airspeed equals true airspeed.
pub const TAS_FLOOR: Position<f32> = Position::from_feet(0.);
/// Altitude above which the true airspeed gain per altitude is damped.
pub const TAS_CEILING: Position<f32> = Position::from_feet(25000.);

const TAS_GAIN_PER_KFT: f32 = 0.02;
const TAS_GAIN_PER_KFT_ABOVE_CEILING: f32 = 0.01;

/// Multiplier from indicated to true airspeed at the given pressure altitude.
#[must_use]
pub fn true_airspeed_factor(altitude: Position<f32>) -> f32 {
    let feet = altitude.feet();
    let below_ceiling = feet.clamp(TAS_FLOOR.feet(), TAS_CEILING.feet()) - TAS_FLOOR.feet();
    let above_ceiling = (feet - TAS_CEILING.feet()).max(0.);
    1. + below_ceiling / 1000. * TAS_GAIN_PER_KFT
        + above_ceiling / 1000. * TAS_GAIN_PER_KFT_ABOVE_CEILING
}

#[must_use]
pub fn true_airspeed(indicated: Speed<f32>, altitude: Position<f32>) -> Speed<f32> {
    indicated * true_airspeed_factor(altitude)
}

#[must_use]
pub fn indicated_airspeed(true_airspeed: Speed<f32>, altitude: Position<f32>) -> Speed<f32> {
    true_airspeed / true_airspeed_factor(altitude)
}
