//! Static airfield data: runways and navpoints.

use bevy::ecs::resource::Resource;
use math::{Angle, GeoPosition, Heading, Length, Position};

/// The airfield the simulation is centered on.
#[derive(Debug, Clone, Resource)]
pub struct Airfield {
    /// ICAO code of the airfield.
    pub code:      String,
    /// Aerodrome reference point.
    pub position:  GeoPosition,
    /// Field elevation above mean sea level.
    pub elevation: Position<f32>,
    pub runways:   Vec<RunwayPair>,
}

impl Airfield {
    /// Finds the runway direction with the given name, e.g. `27L`.
    #[must_use]
    pub fn runway(&self, name: &str) -> Option<(&Runway, RunwaySpec)> {
        self.runways.iter().find_map(|pair| {
            pair.directions.iter().find(|rwy| rwy.name == name).map(|rwy| (rwy, pair.spec()))
        })
    }

    /// Returns the physical runway containing the named direction.
    #[must_use]
    pub fn runway_spec(&self, name: &str) -> Option<RunwaySpec> {
        self.runway(name).map(|(_, spec)| spec)
    }
}

/// The two directions of a physical runway.
#[derive(Debug, Clone)]
pub struct RunwayPair {
    pub directions: [Runway; 2],
}

impl RunwayPair {
    #[must_use]
    pub fn spec(&self) -> RunwaySpec {
        let [a, b] = &self.directions;
        RunwaySpec::new(&a.name, &b.name)
    }
}

/// One usable direction of a runway.
#[derive(Debug, Clone)]
pub struct Runway {
    /// Runway designator, e.g. `27L`.
    pub name:      String,
    pub threshold: GeoPosition,
    /// True heading of the runway centerline.
    pub heading:   Heading,
    /// Threshold elevation above mean sea level.
    pub elevation: Position<f32>,
    pub length:    Length<f32>,
    /// Glide path angle of the final approach.
    pub fpa:       Angle,
    pub ils:       bool,
}

impl Runway {
    /// Default glide path angle.
    pub const DEFAULT_FPA: Angle = Angle::from_degrees(3.);

    /// The opposite end of the runway.
    #[must_use]
    pub fn end(&self) -> GeoPosition { self.threshold.moved(self.heading, self.length) }
}

/// Names a physical runway by both of its directions, e.g. `09R/27L`.
///
/// The lower-numbered direction always comes first,
/// so both directions of the same runway produce equal specs.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    derive_more::Display,
)]
pub struct RunwaySpec(String);

impl RunwaySpec {
    #[must_use]
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b { Self(format!("{a}/{b}")) } else { Self(format!("{b}/{a}")) }
    }

    /// Whether `name` is one of the two directions of this runway.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.0.split('/').any(|dir| dir == name) }

    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

/// A named navigational reference.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Navpoint {
    pub code:     String,
    pub kind:     NavpointKind,
    pub position: GeoPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display)]
pub enum NavpointKind {
    Airfield,
    #[strum(to_string = "VOR")]
    Vor,
    #[strum(to_string = "NDB")]
    Ndb,
    Fix,
    #[strum(to_string = "RNAV")]
    Rnav,
}
