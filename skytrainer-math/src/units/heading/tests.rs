use bevy_math::Vec2;

use super::{Heading, TurnDirection};
use crate::units::Angle;

fn assert_almost_eq(left: Heading, right: Heading, message: &str) {
    let delta = (left.0 - right.0).abs();
    assert!(
        delta.0 < 1e-4 || (Angle::FULL - delta).abs().0 < 1e-4,
        "{left:?} != {right:?}: {message}"
    );
}

fn assert_delta(left: Angle, right: Angle, message: &str) {
    assert!((left - right).abs().0 < 1e-4, "{left:?} != {right:?}: {message}");
}

#[test]
fn heading_from_vec2() {
    assert_almost_eq(Heading::from_vec2(Vec2::new(1., 0.)), Heading::EAST, "(1, 0) is eastward");
    assert_almost_eq(Heading::from_vec2(Vec2::new(-1., 0.)), Heading::WEST, "(-1, 0) is westward");
    assert_almost_eq(Heading::from_vec2(Vec2::new(0., 1.)), Heading::NORTH, "(0, 1) is northward");
    assert_almost_eq(
        Heading::from_vec2(Vec2::new(0., -1.)),
        Heading::SOUTH,
        "(0, -1) is southward",
    );
}

#[test]
fn heading_from_degrees() {
    assert_almost_eq(Heading::from_degrees(-90.), Heading::WEST, "-90 degrees is westward");
    assert_almost_eq(Heading::from_degrees(-270.), Heading::EAST, "-270 degrees is eastward");
    assert_almost_eq(Heading::from_degrees(360.), Heading::NORTH, "360 degrees is northward");
    assert_almost_eq(Heading::from_degrees(270.), Heading::WEST, "270 degrees is westward");
    assert_almost_eq(Heading::from_degrees(180.), Heading::SOUTH, "180 degrees is southward");
}

#[test]
fn heading_distance() {
    assert_delta(
        Heading::WEST.distance(Heading::NORTH, TurnDirection::Clockwise),
        Angle::RIGHT,
        "90 degrees right from west to north",
    );
    assert_delta(
        Heading::WEST.distance(Heading::NORTH, TurnDirection::CounterClockwise),
        -Angle::RIGHT * 3.,
        "270 degrees left from west to north",
    );
    assert_delta(
        Heading::from_degrees(350.).closest_distance(Heading::from_degrees(10.)),
        Angle::from_degrees(20.),
        "closest turn crosses north",
    );
}

#[test]
fn restricted_turn_stops_at_target() {
    let max = Angle::from_degrees(3.);
    let mut heading = Heading::from_degrees(80.);
    for _ in 0..4 {
        heading = heading.restricted_turn(Heading::from_degrees(90.), max);
    }
    assert_eq!(heading, Heading::from_degrees(90.), "target is reached exactly");

    let again = heading.restricted_turn(Heading::from_degrees(90.), max);
    assert_eq!(again, heading, "turn is idempotent at target");
}

#[test]
fn restricted_turn_in_forced_direction() {
    let turned = Heading::from_degrees(10.).restricted_turn_in(
        Heading::from_degrees(20.),
        TurnDirection::CounterClockwise,
        Angle::from_degrees(5.),
    );
    assert_almost_eq(turned, Heading::from_degrees(5.), "turns left the long way round");
}

#[test]
fn display_three_digits() {
    assert_eq!(Heading::from_degrees(5.).to_string(), "005");
    assert_eq!(Heading::NORTH.to_string(), "360");
    assert_eq!(Heading::from_degrees(271.4).to_string(), "271");
}
