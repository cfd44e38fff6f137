use std::f32::consts::{FRAC_PI_2, PI};
use std::{fmt, ops};

use bevy_math::{Dir2, Vec2};

use super::Angle;

#[cfg(test)]
mod tests;

/// An absolute directional bearing, clockwise from true north.
#[derive(Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Heading(
    Angle, // always -PI < heading <= PI
);

impl Heading {
    /// Heading north.
    pub const NORTH: Self = Self(Angle::new(0.));
    /// Heading east.
    pub const EAST: Self = Self(Angle::new(FRAC_PI_2));
    /// Heading south.
    pub const SOUTH: Self = Self(Angle::new(PI));
    /// Heading west.
    pub const WEST: Self = Self(Angle::new(-FRAC_PI_2));

    /// Returns the heading of the vector, with north as +y and east as +x.
    ///
    /// Returns a NaN heading if and only if the argument is zero or contains NaN components.
    #[must_use]
    pub fn from_vec2(vec: Vec2) -> Self { Self(Angle::new(vec.x.atan2(vec.y))) }

    /// Converts the heading into a direction vector.
    #[must_use]
    pub fn into_dir2(self) -> Dir2 {
        let (x, y) = self.0.0.sin_cos();
        Dir2::from_xy_unchecked(x, y)
    }

    /// Creates a heading from an absolute bearing.
    #[must_use]
    pub fn from_degrees(degrees: f32) -> Self { Self::NORTH + Angle::from_degrees(degrees) }

    /// Returns the heading in degrees in the range 0..360.
    #[must_use]
    pub fn degrees(self) -> f32 {
        let degrees = self.0.into_degrees();
        if degrees < 0. { degrees + 360. } else { degrees }
    }

    /// Returns the heading in radians in the range `-STRAIGHT < value <= STRAIGHT`.
    #[must_use]
    pub fn radians(self) -> Angle { self.0 }

    /// Radians to turn from `self` to `other` in the given direction.
    /// The output is always in the range [0, FULL) for `Clockwise`,
    /// or (-FULL, 0] for `CounterClockwise`.
    #[must_use]
    pub fn distance(self, other: Heading, dir: TurnDirection) -> Angle {
        let mut output = (other.0 - self.0) % Angle::FULL;
        match dir {
            TurnDirection::Clockwise => {
                if output.is_negative() {
                    output += Angle::FULL;
                }
            }
            TurnDirection::CounterClockwise => {
                if output.is_positive() {
                    output -= Angle::FULL;
                }
            }
        }

        output
    }

    /// Returns the signed angle closest to zero such that
    /// adding it to `self` approximately returns `other`.
    #[must_use]
    pub fn closest_distance(self, other: Heading) -> Angle { other - self }

    /// Returns the closer direction to turn towards `other`.
    ///
    /// The result is unspecified if `a` and `b` are exactly opposite or equal.
    #[must_use]
    pub fn closer_direction_to(self, other: Heading) -> TurnDirection {
        if self.distance(other, TurnDirection::Clockwise) < Angle::STRAIGHT {
            TurnDirection::Clockwise
        } else {
            TurnDirection::CounterClockwise
        }
    }

    /// Returns the opposite direction of this heading.
    #[must_use]
    pub fn opposite(self) -> Self { self + Angle::STRAIGHT }

    /// Turns towards the desired heading, but does not exceed the maximum turn angle.
    ///
    /// `max_turn` must be non-negative.
    /// Returns exactly `desired` once it is within `max_turn`.
    #[must_use]
    pub fn restricted_turn(self, desired: Heading, max_turn: Angle) -> Self {
        let delta = self.closest_distance(desired);
        if delta.abs() <= max_turn { desired } else { self + max_turn * delta.signum() }
    }

    /// Turns towards `desired` in the forced direction `dir`,
    /// not exceeding `max_turn`.
    #[must_use]
    pub fn restricted_turn_in(self, desired: Heading, dir: TurnDirection, max_turn: Angle) -> Self {
        let delta = self.distance(desired, dir);
        if delta.abs() <= max_turn { desired } else { self + max_turn * dir }
    }

    /// Whether `other` is within `tolerance` of this heading in either direction.
    #[must_use]
    pub fn is_within(self, other: Heading, tolerance: Angle) -> bool {
        self.closest_distance(other).abs() <= tolerance
    }
}

impl PartialEq for Heading {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}

impl fmt::Debug for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heading").field("degrees", &self.degrees()).finish()
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.degrees().round();
        let rounded = if rounded == 0. { 360. } else { rounded };
        write!(f, "{rounded:03.0}")
    }
}

/// Returns the shortest bearing change such that
/// adding the return value to `other` approximately yields `self`.
impl ops::Sub for Heading {
    type Output = Angle;
    fn sub(self, other: Self) -> Angle {
        if (self.0 - other.0).abs() <= Angle::STRAIGHT {
            self.0 - other.0
        } else if self.0 > other.0 {
            self.0 - (other.0 + Angle::FULL)
        } else {
            self.0 + Angle::FULL - other.0
        }
    }
}

impl ops::Add<Angle> for Heading {
    type Output = Self;
    /// Offsets `self` by `angle` clockwise.
    fn add(mut self, angle: Angle) -> Self {
        self.0 += angle;
        self.0 %= Angle::FULL;
        if self.0 > Angle::STRAIGHT {
            self.0 -= Angle::FULL;
        } else if self.0 <= -Angle::STRAIGHT {
            self.0 += Angle::FULL;
        }
        self
    }
}

impl ops::AddAssign<Angle> for Heading {
    fn add_assign(&mut self, angle: Angle) { *self = *self + angle; }
}

impl ops::Sub<Angle> for Heading {
    type Output = Self;
    /// Offsets `self` by `angle` counter-clockwise.
    fn sub(self, angle: Angle) -> Self { self + (-angle) }
}

/// The direction for yaw change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
pub enum TurnDirection {
    /// A left, counter-clockwise turn generating negative yaw speed.
    #[strum(to_string = "left")]
    CounterClockwise,
    /// A right, clockwise turn generating positive yaw speed.
    #[strum(to_string = "right")]
    Clockwise,
}

impl ops::Neg for TurnDirection {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            TurnDirection::CounterClockwise => TurnDirection::Clockwise,
            TurnDirection::Clockwise => TurnDirection::CounterClockwise,
        }
    }
}

impl ops::Mul<TurnDirection> for Angle {
    type Output = Self;

    fn mul(self, dir: TurnDirection) -> Self {
        match dir {
            TurnDirection::CounterClockwise => -self,
            TurnDirection::Clockwise => self,
        }
    }
}
