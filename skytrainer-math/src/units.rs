use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::marker::PhantomData;
use std::time::Duration;
use std::{cmp, fmt, iter, ops};

use bevy_math::{Dir2, Vec2};


mod heading;
pub use heading::{Heading, TurnDirection};
mod position;
pub use position::Position;

/// Converts nautical miles to feet.
pub const FEET_PER_NM: f32 = 6076.12;
/// Converts nautical miles to meter.
pub const METERS_PER_NM: f32 = 1852.;
/// Converts minutes to seconds.
pub const SECONDS_PER_MINUTE: f32 = 60.;
/// Converts hours to seconds.
pub const SECONDS_PER_HOUR: f32 = 3600.;

/// A dimensioned value.
///
/// `Base` identifies the physical dimension,
/// `Dt` identifies how many times it has been differentiated over time.
pub struct Quantity<T, Base, Dt>(pub T, pub PhantomData<(Base, Dt)>);

impl<T, Base, Dt> Quantity<T, Base, Dt> {
    pub const fn new(value: T) -> Self { Self(value, PhantomData) }
}

impl<T: Default, Base, Dt> Default for Quantity<T, Base, Dt> {
    fn default() -> Self { Self(T::default(), PhantomData) }
}

impl<T: Clone, Base, Dt> Clone for Quantity<T, Base, Dt> {
    fn clone(&self) -> Self { Self(self.0.clone(), PhantomData) }
}

impl<T: Copy, Base, Dt> Copy for Quantity<T, Base, Dt> {}

impl<T: PartialEq, Base, Dt> PartialEq for Quantity<T, Base, Dt> {
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}

impl<T: PartialOrd, Base, Dt> PartialOrd for Quantity<T, Base, Dt> {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { self.0.partial_cmp(&other.0) }
}

impl<T: ops::Add<Output = T>, Base, Dt> ops::Add for Quantity<T, Base, Dt> {
    type Output = Self;

    fn add(self, other: Self) -> Self { Self(self.0 + other.0, PhantomData) }
}

impl<T: ops::AddAssign, Base, Dt> ops::AddAssign for Quantity<T, Base, Dt> {
    fn add_assign(&mut self, other: Self) { self.0 += other.0; }
}

impl<T: ops::Sub<Output = T>, Base, Dt> ops::Sub for Quantity<T, Base, Dt> {
    type Output = Self;

    fn sub(self, other: Self) -> Self { Self(self.0 - other.0, PhantomData) }
}

impl<T: ops::SubAssign, Base, Dt> ops::SubAssign for Quantity<T, Base, Dt> {
    fn sub_assign(&mut self, other: Self) { self.0 -= other.0; }
}

impl<T: ops::Mul<f32, Output = T>, Base, Dt> ops::Mul<f32> for Quantity<T, Base, Dt> {
    type Output = Self;

    fn mul(self, other: f32) -> Self { Self(self.0 * other, PhantomData) }
}

impl<T: ops::Div<f32, Output = T>, Base, Dt> ops::Div<f32> for Quantity<T, Base, Dt> {
    type Output = Self;

    fn div(self, other: f32) -> Self { Self(self.0 / other, PhantomData) }
}

impl<T: ops::Div, Base, Dt> ops::Div for Quantity<T, Base, Dt> {
    type Output = T::Output;

    fn div(self, other: Self) -> Self::Output { self.0 / other.0 }
}

impl<T: ops::Rem<Output = T>, Base, Dt> ops::Rem for Quantity<T, Base, Dt> {
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output { Self(self.0 % rhs.0, PhantomData) }
}

impl<T: ops::RemAssign, Base, Dt> ops::RemAssign for Quantity<T, Base, Dt> {
    fn rem_assign(&mut self, rhs: Self) { self.0 %= rhs.0; }
}

impl<T: ops::Neg<Output = T>, Base, Dt> ops::Neg for Quantity<T, Base, Dt> {
    type Output = Self;

    fn neg(self) -> Self { Self(-self.0, PhantomData) }
}

impl<T: Default + ops::Add<Output = T>, Base, Dt> iter::Sum for Quantity<T, Base, Dt> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |sum, value| sum + value)
    }
}

/// Used as `Dt` in `Quantity` to indicate that the unit is not a rate of change.
pub struct DtZero;
/// Used as `Dt` in `Quantity` to indicate that the unit is the rate of change of `Quantity<Dt=Dt>`.
pub struct Ddt<Dt>(Dt);

pub type DtOne = Ddt<DtZero>;
pub type DtTwo = Ddt<DtOne>;

impl<T: ops::Mul<f32, Output = T>, Base, Dt> ops::Mul<Duration> for Quantity<T, Base, Ddt<Dt>> {
    type Output = Quantity<T, Base, Dt>;

    fn mul(self, other: Duration) -> Self::Output {
        Quantity(self.0 * other.as_secs_f32(), PhantomData)
    }
}

impl<T: ops::Div<f32, Output = T>, Base, Dt> ops::Div<Duration> for Quantity<T, Base, Dt> {
    type Output = Quantity<T, Base, Ddt<Dt>>;

    fn div(self, other: Duration) -> Self::Output {
        Quantity(self.0 / other.as_secs_f32(), PhantomData)
    }
}

impl<Base, Dt> Quantity<f32, Base, Dt> {
    pub const ZERO: Self = Self(0., PhantomData);

    #[must_use]
    pub fn is_positive(self) -> bool { self.0 > 0. }

    #[must_use]
    pub fn is_negative(self) -> bool { self.0 < 0. }

    #[must_use]
    pub fn is_zero(self) -> bool { self.0 == 0. }

    #[must_use]
    pub fn abs(self) -> Self { Self(self.0.abs(), PhantomData) }

    #[must_use]
    pub fn signum(self) -> f32 { self.0.signum() }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0), PhantomData) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0), PhantomData) }

    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0), PhantomData)
    }

    /// Directs a scalar magnitude along a heading.
    #[must_use]
    pub fn with_heading(self, heading: Heading) -> Quantity<Vec2, Base, Dt> {
        Quantity(heading.into_dir2() * self.0, PhantomData)
    }
}

impl<Base, Dt> Quantity<Vec2, Base, Dt> {
    #[must_use]
    pub fn x(self) -> Quantity<f32, Base, Dt> { Quantity(self.0.x, PhantomData) }

    #[must_use]
    pub fn y(self) -> Quantity<f32, Base, Dt> { Quantity(self.0.y, PhantomData) }

    /// Heading of the vector, with north as +y and east as +x.
    #[must_use]
    pub fn heading(self) -> Heading { Heading::from_vec2(self.0) }

    #[must_use]
    pub fn magnitude_exact(self) -> Quantity<f32, Base, Dt> {
        Quantity(self.0.length(), PhantomData)
    }

    /// Returns the vector component projected along `dir`.
    #[must_use]
    pub fn project_onto_dir(self, dir: Dir2) -> Quantity<f32, Base, Dt> {
        Quantity(self.0.dot(*dir), PhantomData)
    }

    #[must_use]
    pub fn rotate_right_angle_clockwise(self) -> Self {
        Self(Vec2::new(self.0.y, -self.0.x), PhantomData)
    }
}

impl<Dt> ops::Mul<Heading> for Quantity<f32, LengthBase, Dt> {
    type Output = Quantity<Vec2, LengthBase, Dt>;

    fn mul(self, other: Heading) -> Self::Output { self.with_heading(other) }
}

pub struct LengthBase;

/// A distance quantity. Internal representation is in nautical miles.
pub type Length<T> = Quantity<T, LengthBase, DtZero>;

/// A linear speed (rate of [length](Length) change) quantity.
pub type Speed<T> = Quantity<T, LengthBase, DtOne>;

/// A linear acceleration (rate of linear [speed](Speed) change) quantity.
pub type Accel<T> = Quantity<T, LengthBase, DtTwo>;

pub struct AngleBase;

/// A relative angle. Internal representation is in radians.
pub type Angle = Quantity<f32, AngleBase, DtZero>;

/// An angular speed (rate of [angle](Angle) change) quantity.
/// Always in rad/s.
pub type AngularSpeed = Quantity<f32, AngleBase, DtOne>;

impl fmt::Debug for Length<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("nm", &self.into_nm())
            .field("feet", &self.into_feet())
            .finish()
    }
}

impl fmt::Debug for Length<Vec2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("x.nm", &self.x().into_nm())
            .field("y.nm", &self.y().into_nm())
            .finish()
    }
}

impl fmt::Debug for Speed<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("knots", &self.into_knots())
            .field("fpm", &self.into_fpm())
            .finish()
    }
}

impl fmt::Debug for Speed<Vec2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("x.knots", &self.x().into_knots())
            .field("y.knots", &self.y().into_knots())
            .finish()
    }
}

impl fmt::Debug for Accel<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accel").field("knots/s", &self.into_knots_per_sec()).finish()
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Angle").field("degrees", &self.into_degrees()).finish()
    }
}

impl fmt::Debug for AngularSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AngularSpeed").field("degrees/s", &self.into_degrees_per_sec()).finish()
    }
}

impl Length<f32> {
    #[must_use]
    pub const fn into_nm(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_nm(nm: f32) -> Self { Self(nm, PhantomData) }

    #[must_use]
    pub const fn into_feet(self) -> f32 { self.0 * FEET_PER_NM }

    #[must_use]
    pub const fn from_feet(feet: f32) -> Self { Self(feet / FEET_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_meters(self) -> f32 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meters(meters: f32) -> Self { Self(meters / METERS_PER_NM, PhantomData) }
}

impl Length<Vec2> {
    #[must_use]
    pub const fn into_nm(self) -> Vec2 { self.0 }
}

impl Speed<f32> {
    #[must_use]
    pub const fn into_knots(self) -> f32 { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub const fn from_knots(knots: f32) -> Self { Self(knots / SECONDS_PER_HOUR, PhantomData) }

    #[must_use]
    pub const fn into_meter_per_sec(self) -> f32 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meter_per_sec(mps: f32) -> Self { Self(mps / METERS_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_fpm(self) -> f32 { self.0 * (SECONDS_PER_MINUTE * FEET_PER_NM) }

    #[must_use]
    pub const fn from_fpm(fpm: f32) -> Self {
        Self(fpm / (SECONDS_PER_MINUTE * FEET_PER_NM), PhantomData)
    }
}

impl Accel<f32> {
    #[must_use]
    pub const fn into_knots_per_sec(self) -> f32 { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub const fn from_knots_per_sec(knots: f32) -> Self {
        Self(knots / SECONDS_PER_HOUR, PhantomData)
    }
}

impl Angle {
    pub const RIGHT: Self = Self(FRAC_PI_2, PhantomData);
    pub const STRAIGHT: Self = Self(PI, PhantomData);
    pub const FULL: Self = Self(TAU, PhantomData);

    #[must_use]
    pub const fn from_radians(radians: f32) -> Self { Self(radians, PhantomData) }

    #[must_use]
    pub const fn into_radians(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_degrees(degrees: f32) -> Self { Self(degrees.to_radians(), PhantomData) }

    #[must_use]
    pub fn into_degrees(self) -> f32 { self.0.to_degrees() }

    #[must_use]
    pub fn sin(self) -> f32 { self.0.sin() }

    #[must_use]
    pub fn cos(self) -> f32 { self.0.cos() }

    /// Slope of a line whose angle of elevation is the receiver value.
    #[must_use]
    pub fn tan(self) -> f32 { self.0.tan() }
}

impl AngularSpeed {
    #[must_use]
    pub fn into_degrees_per_sec(self) -> f32 { self.0.to_degrees() }

    #[must_use]
    pub const fn from_degrees_per_sec(degrees: f32) -> Self {
        Self(degrees.to_radians(), PhantomData)
    }
}

pub trait IsFinite: Copy {
    fn is_finite(self) -> bool;
}

impl IsFinite for f32 {
    fn is_finite(self) -> bool { f32::is_finite(self) }
}

impl IsFinite for Vec2 {
    fn is_finite(self) -> bool { Vec2::is_finite(self) }
}

impl<T: serde::Serialize, Base, Dt> serde::Serialize for Quantity<T, Base, Dt> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T, Base, Dt> serde::Deserialize<'de> for Quantity<T, Base, Dt>
where
    T: serde::Deserialize<'de> + IsFinite,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let value = T::deserialize(deserializer)?;

        if !value.is_finite() {
            return Err(<D::Error as serde::de::Error>::custom("non-finite quantity"));
        }

        Ok(Self(value, PhantomData))
    }
}

/// Config metadata for a dimensioned scalar.
#[derive(Clone)]
pub struct QuantityMetadata<T> {
    pub default: T,
    pub min:     T,
    pub max:     T,
}

pub type LengthMetadata = QuantityMetadata<Length<f32>>;

impl Default for LengthMetadata {
    fn default() -> Self {
        Self {
            default: Length::from_nm(1.0),
            min:     Length::from_nm(0.0),
            max:     Length::from_nm(100.0),
        }
    }
}

bevy_mod_config::impl_scalar_config_field!(
    Length<f32>,
    LengthMetadata,
    |metadata: &LengthMetadata| metadata.default,
    'a => Length<f32>,
    |&value: &Length<f32>| value,
);

pub type SpeedMetadata = QuantityMetadata<Speed<f32>>;

impl Default for SpeedMetadata {
    fn default() -> Self {
        Self {
            default: Speed::from_knots(200.0),
            min:     Speed::from_knots(0.0),
            max:     Speed::from_knots(500.0),
        }
    }
}

bevy_mod_config::impl_scalar_config_field!(
    Speed<f32>,
    SpeedMetadata,
    |metadata: &SpeedMetadata| metadata.default,
    'a => Speed<f32>,
    |&value: &Speed<f32>| value,
);

pub type AngleMetadata = QuantityMetadata<Angle>;

impl Default for AngleMetadata {
    fn default() -> Self { Self { default: Angle::ZERO, min: Angle::ZERO, max: Angle::RIGHT } }
}

bevy_mod_config::impl_scalar_config_field!(
    Angle,
    AngleMetadata,
    |metadata: &AngleMetadata| metadata.default,
    'a => Angle,
    |&value: &Angle| value,
);
