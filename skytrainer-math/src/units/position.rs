use std::{fmt, ops};

use bevy_math::Vec2;

use super::Length;

/// An absolute position.
///
/// `Position<Vec2>` is a point on a local tangent plane, in nautical miles east/north of its origin.
/// `Position<f32>` is an altitude, in feet above the datum it is referenced to.
#[derive(Clone, Copy, PartialEq, PartialOrd, serde::Serialize)]
pub struct Position<T>(pub Length<T>);

impl<'de, T: serde::Deserialize<'de> + super::IsFinite> serde::Deserialize<'de> for Position<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        <Length<T> as serde::Deserialize<'de>>::deserialize(d).map(Self)
    }
}

impl<T> Position<T> {
    pub const fn new(value: T) -> Self { Position(Length::new(value)) }

    pub fn get(self) -> T { self.0.0 }
}

impl Position<f32> {
    pub const SEA_LEVEL: Self = Self(Length::new(0.));

    #[must_use]
    pub const fn from_feet(feet: f32) -> Self { Position(Length::from_feet(feet)) }

    #[must_use]
    pub const fn feet(self) -> f32 { self.0.into_feet() }

    /// The altitude in whole feet, as reported on the radio and in snapshots.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "altitudes are far below i32::MAX feet")]
    pub fn rounded_feet(self) -> i32 { self.feet().round() as i32 }

    /// Height of `self` above `base`.
    #[must_use]
    pub fn height_above(self, base: Self) -> Length<f32> { self - base }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0)) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0)) }
}

impl Position<Vec2> {
    pub const ORIGIN: Self = Self(Length::new(Vec2::new(0., 0.)));

    #[must_use]
    pub fn from_origin_nm(x: f32, y: f32) -> Self { Position(Length::new(Vec2 { x, y })) }

    #[must_use]
    pub fn distance_exact(self, other: Self) -> Length<f32> { (self - other).magnitude_exact() }
}

impl fmt::Debug for Position<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position").field("feet", &self.feet()).finish()
    }
}

impl fmt::Debug for Position<Vec2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position").field("x", &self.0.0.x).field("y", &self.0.0.y).finish()
    }
}

impl<T: ops::AddAssign> ops::Add<Length<T>> for Position<T> {
    type Output = Self;

    fn add(mut self, rhs: Length<T>) -> Self::Output {
        self.0 += rhs;
        self
    }
}

impl<T: ops::AddAssign> ops::AddAssign<Length<T>> for Position<T> {
    fn add_assign(&mut self, rhs: Length<T>) { self.0 += rhs; }
}

impl<T: ops::SubAssign> ops::Sub<Length<T>> for Position<T> {
    type Output = Self;

    fn sub(mut self, rhs: Length<T>) -> Self::Output {
        self.0 -= rhs;
        self
    }
}

impl<T: ops::Sub<Output = T>> ops::Sub for Position<T> {
    type Output = Length<T>;

    fn sub(self, rhs: Self) -> Length<T> { self.0 - rhs.0 }
}
