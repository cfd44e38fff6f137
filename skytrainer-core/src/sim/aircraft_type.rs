//! Aircraft performance data keyed by ICAO type designator.

use std::collections::HashMap;

use bevy::ecs::component::Component;
use bevy::ecs::resource::Resource;
use enum_map::{Enum, EnumMap, enum_map};
use math::{Length, Position, Speed};

/// Wake turbulence category.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Enum,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum WakeCategory {
    #[strum(to_string = "L")]
    Light,
    #[strum(to_string = "M")]
    Medium,
    #[strum(to_string = "H")]
    Heavy,
    #[strum(to_string = "J")]
    Super,
}

impl WakeCategory {
    /// Radius around a grounded aircraft that other ground traffic must not close in on.
    #[must_use]
    pub fn ground_radius(self) -> Length<f32> {
        let radii: EnumMap<WakeCategory, Length<f32>> = enum_map! {
            WakeCategory::Light => Length::from_meters(25.),
            WakeCategory::Medium => Length::from_meters(40.),
            WakeCategory::Heavy => Length::from_meters(60.),
            WakeCategory::Super => Length::from_meters(80.),
        };
        radii[self]
    }
}

/// Broad aircraft category, used to match parking positions.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Props,
    Turboprops,
    Jets,
    Heavy,
}

/// Performance of an aircraft type.
///
/// All speeds are indicated airspeeds.
/// Agents carry a copy of the performance of their type.
#[derive(Debug, Clone, PartialEq, Component, serde::Serialize, serde::Deserialize)]
pub struct Performance {
    pub cruise_ias:  Speed<f32>,
    pub takeoff_ias: Speed<f32>,
    pub landing_ias: Speed<f32>,
    pub min_ias:     Speed<f32>,
    pub max_ias:     Speed<f32>,
    /// Service ceiling in pressure altitude.
    pub ceiling:     Position<f32>,
    pub wake:        WakeCategory,
    pub category:    Category,
}

/// The table of known aircraft types.
#[derive(Debug, Clone, Resource)]
pub struct AircraftTypes {
    types: HashMap<String, Performance>,
}

impl AircraftTypes {
    /// A table without any aircraft types.
    #[must_use]
    pub fn empty() -> Self { Self { types: HashMap::new() } }

    /// Adds or replaces the performance of a type.
    pub fn insert(&mut self, code: impl Into<String>, performance: Performance) {
        self.types.insert(code.into(), performance);
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&Performance> { self.types.get(code) }
}

impl Default for AircraftTypes {
    fn default() -> Self {
        let mut table = Self::empty();
        for (code, cruise, takeoff, landing, min, max, ceiling, wake, category) in [
            ("C172", 110., 55., 65., 50., 160., 14000., WakeCategory::Light, Category::Props),
            ("PA28", 115., 60., 70., 55., 170., 14000., WakeCategory::Light, Category::Props),
            ("AT76", 240., 110., 115., 100., 250., 25000., WakeCategory::Medium, Category::Turboprops),
            ("DH8D", 280., 115., 120., 105., 285., 27000., WakeCategory::Medium, Category::Turboprops),
            ("E190", 290., 135., 130., 120., 320., 41000., WakeCategory::Medium, Category::Jets),
            ("A320", 300., 145., 135., 125., 350., 39000., WakeCategory::Medium, Category::Jets),
            ("B738", 300., 150., 145., 130., 340., 41000., WakeCategory::Medium, Category::Jets),
            ("A333", 300., 155., 140., 135., 330., 41000., WakeCategory::Heavy, Category::Heavy),
            ("B744", 310., 165., 155., 145., 365., 45000., WakeCategory::Heavy, Category::Heavy),
            ("B77W", 310., 165., 150., 145., 330., 43000., WakeCategory::Heavy, Category::Heavy),
            ("A388", 310., 160., 145., 140., 340., 43000., WakeCategory::Super, Category::Heavy),
        ] {
            table.insert(
                code,
                Performance {
                    cruise_ias: Speed::from_knots(cruise),
                    takeoff_ias: Speed::from_knots(takeoff),
                    landing_ias: Speed::from_knots(landing),
                    min_ias: Speed::from_knots(min),
                    max_ias: Speed::from_knots(max),
                    ceiling: Position::from_feet(ceiling),
                    wake,
                    category,
                },
            );
        }
        table
    }
}
