//! The environment the agents fly in.
//!
//! Weather and terrain are owned by the host.
//! Agents only read them through [`EnvironmentProvider`].

use bevy::ecs::resource::Resource;
use math::{GeoPosition, Length, Position, Pressure, STANDARD_PRESSURE, Wind};

pub trait EnvironmentProvider: Send + Sync + 'static {
    /// Wind at the given position and pressure altitude, if any.
    fn wind(&self, position: GeoPosition, altitude: Position<f32>) -> Option<Wind>;

    /// Local sea-level pressure used to convert between altitudes and flight levels.
    fn qnh(&self) -> Pressure;

    /// Ground elevation above mean sea level.
    fn ground_elevation(&self, position: GeoPosition) -> Position<f32>;

    /// Whether the position is still covered by the simulation.
    fn in_range(&self, position: GeoPosition) -> bool;
}

/// The environment provider used by all agents.
#[derive(Resource)]
pub struct Environment(pub Box<dyn EnvironmentProvider>);

impl Environment {
    pub fn new(provider: impl EnvironmentProvider) -> Self { Self(Box::new(provider)) }
}

impl Default for Environment {
    fn default() -> Self { Self::new(StaticEnvironment::default()) }
}

impl std::ops::Deref for Environment {
    type Target = dyn EnvironmentProvider;

    fn deref(&self) -> &Self::Target { &*self.0 }
}

/// Uniform weather over flat terrain within a circular coverage.
#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    pub wind:      Option<Wind>,
    pub qnh:       Pressure,
    pub elevation: Position<f32>,
    pub center:    GeoPosition,
    pub range:     Length<f32>,
}

impl Default for StaticEnvironment {
    fn default() -> Self {
        Self {
            wind:      None,
            qnh:       STANDARD_PRESSURE,
            elevation: Position::SEA_LEVEL,
            center:    GeoPosition::new(0., 0.),
            range:     Length::from_nm(100.),
        }
    }
}

impl EnvironmentProvider for StaticEnvironment {
    fn wind(&self, _: GeoPosition, _: Position<f32>) -> Option<Wind> { self.wind }

    fn qnh(&self) -> Pressure { self.qnh }

    fn ground_elevation(&self, _: GeoPosition) -> Position<f32> { self.elevation }

    fn in_range(&self, position: GeoPosition) -> bool {
        self.center.distance(position) <= self.range
    }
}
