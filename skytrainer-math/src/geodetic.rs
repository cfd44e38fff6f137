//! Great-circle geometry on a spherical earth.
//!
//! Latitudes and longitudes are stored in degrees as `f64`
//! since `f32` loses meter-level precision at typical longitudes.

use std::fmt;

use bevy_math::Vec2;

use crate::{Heading, Length, Position};

/// Mean earth radius.
pub const EARTH_RADIUS: Length<f32> = Length::from_nm(3440.065);

const EARTH_RADIUS_NM: f64 = 3440.065;

/// A point on the earth surface.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeoPosition {
    /// Latitude in degrees, north positive.
    pub lat: f64,
    /// Longitude in degrees, east positive.
    pub lon: f64,
}

impl fmt::Debug for GeoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl GeoPosition {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self { Self { lat, lon } }

    /// Whether both coordinates are finite and within their valid ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Great-circle distance to `other` by the haversine formula.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "distances on earth fit in f32")]
    pub fn distance(self, other: Self) -> Length<f32> {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.).sin().powi(2);
        let c = 2. * a.sqrt().atan2((1. - a).max(0.).sqrt());
        Length::from_nm((EARTH_RADIUS_NM * c) as f32)
    }

    /// Initial great-circle bearing from `self` towards `other`.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "bearing precision is bounded by f32 angles")]
    pub fn bearing_to(self, other: Self) -> Heading {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlon = (other.lon - self.lon).to_radians();

        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        Heading::from_degrees(y.atan2(x).to_degrees() as f32)
    }

    /// The destination reached by travelling `distance` from `self` along the great circle
    /// with initial bearing `course`.
    #[must_use]
    pub fn moved(self, course: Heading, distance: Length<f32>) -> Self {
        let delta = f64::from(distance.into_nm()) / EARTH_RADIUS_NM;
        let theta = f64::from(course.degrees()).to_radians();
        let lat1 = self.lat.to_radians();
        let lon1 = self.lon.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        Self { lat: lat2.to_degrees(), lon: normalize_lon(lon2.to_degrees()) }
    }

    /// Projects `self` onto the local tangent plane centered at `origin`.
    ///
    /// Uses an equirectangular projection, accurate within the few dozen nautical miles
    /// around an airfield.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "local offsets fit in f32")]
    pub fn to_local(self, origin: Self) -> Position<Vec2> {
        let mean_lat = ((self.lat + origin.lat) / 2.).to_radians();
        let dx = normalize_lon(self.lon - origin.lon).to_radians() * mean_lat.cos();
        let dy = (self.lat - origin.lat).to_radians();
        Position::from_origin_nm((dx * EARTH_RADIUS_NM) as f32, (dy * EARTH_RADIUS_NM) as f32)
    }

    /// Inverse of [`to_local`](Self::to_local).
    #[must_use]
    pub fn from_local(local: Position<Vec2>, origin: Self) -> Self {
        let nm = local.get();
        let lat = origin.lat + (f64::from(nm.y) / EARTH_RADIUS_NM).to_degrees();
        let mean_lat = ((lat + origin.lat) / 2.).to_radians();
        let lon = origin.lon + (f64::from(nm.x) / EARTH_RADIUS_NM / mean_lat.cos()).to_degrees();
        Self { lat, lon: normalize_lon(lon) }
    }
}

fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.).rem_euclid(360.) - 180.;
    if wrapped == -180. && lon > 0. { 180. } else { wrapped }
}
