use super::{
    Pressure, STANDARD_PRESSURE, amsl_altitude, pressure_altitude, true_airspeed,
    true_airspeed_factor,
};
use crate::{Position, Speed};

#[test]
fn standard_pressure_is_identity() {
    let alt = Position::from_feet(4500.);
    assert!((pressure_altitude(alt, STANDARD_PRESSURE).feet() - 4500.).abs() < 1e-3);
}

#[test]
fn high_qnh_lowers_pressure_altitude() {
    let qnh = Pressure::from_hpa(1023.25);
    let pressure_alt = pressure_altitude(Position::from_feet(3000.), qnh);
    assert!((pressure_alt.feet() - 2720.).abs() < 1e-2, "{pressure_alt:?}");
    assert!((amsl_altitude(pressure_alt, qnh).feet() - 3000.).abs() < 1e-2);
}

#[test]
fn tas_factor_profile() {
    assert!((true_airspeed_factor(Position::from_feet(-500.)) - 1.).abs() < 1e-6);
    assert!((true_airspeed_factor(Position::from_feet(10000.)) - 1.2).abs() < 1e-5);
    assert!((true_airspeed_factor(Position::from_feet(25000.)) - 1.5).abs() < 1e-5);
    assert!((true_airspeed_factor(Position::from_feet(35000.)) - 1.6).abs() < 1e-5);
}

#[test]
fn tas_from_ias() {
    let tas = true_airspeed(Speed::from_knots(250.), Position::from_feet(5000.));
    assert!((tas.into_knots() - 275.).abs() < 1e-2, "{tas:?}");
}
