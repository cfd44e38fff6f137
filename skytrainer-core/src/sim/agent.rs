//! Agent components and construction.
//!
//! An agent is an entity with all components of [`Comps`].
//! Hosts spawn agents with [`spawn`] and remove them by despawning the entity.

use bevy::ecs::bundle::Bundle;
use bevy::ecs::component::Component;
use bevy::ecs::entity::Entity;
use bevy::ecs::world::World;
use math::{GeoPosition, Heading, Length, Position, Pressure, Speed, TurnDirection, amsl_altitude};

use super::aircraft_type::{AircraftTypes, Performance};
use super::airfield::Navpoint;
use super::instr::{AltitudeSpec, Queued};
use super::status::{Excursion, Status};


/// Identity of an agent.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    /// Unique callsign, immutable after construction.
    pub callsign:  String,
    /// ICAO aircraft type designator.
    pub type_code: String,
}

/// A four-digit octal transponder code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, derive_more::Display,
)]
#[display("{_0:04o}")]
pub struct Squawk(u16);

impl Squawk {
    /// The conventional code for aircraft not assigned a discrete code.
    pub const CONSPICUITY: Self = Self(0o2000);

    /// Parses a code of exactly four octal digits.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        if code.len() != 4 || !code.bytes().all(|digit| (b'0'..=b'7').contains(&digit)) {
            return None;
        }
        u16::from_str_radix(code, 8).ok().map(Self)
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, strum::Display,
)]
pub enum TransponderMode {
    #[strum(to_string = "off")]
    Off,
    #[strum(to_string = "standby")]
    Standby,
    #[default]
    #[strum(to_string = "mode C")]
    ModeC,
    #[strum(to_string = "mode S")]
    ModeS,
}

/// Physical and procedural state of an agent.
#[derive(Component, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FlightParams {
    pub position:    GeoPosition,
    /// Pressure altitude, referenced to the standard pressure.
    pub altitude:    Position<f32>,
    /// True heading.
    pub heading:     Heading,
    /// Indicated airspeed, or ground speed while on the ground.
    pub ias:         Speed<f32>,
    pub squawk:      Squawk,
    pub transponder: TransponderMode,
    pub status:      Status,
    pub excursion:   Excursion,
}

impl FlightParams {
    /// Altitude above mean sea level under the given QNH.
    #[must_use]
    pub fn amsl(&self, qnh: Pressure) -> Position<f32> { amsl_altitude(self.altitude, qnh) }
}

/// The underlying intention of an agent.
#[derive(Component, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Goal {
    None,
    /// Inbound for landing, with an instrument or visual approach.
    Landing { ils: bool },
    /// Taxiing to the parking position.
    Parking(String),
    /// Leaving the airspace through a navpoint at a level.
    Navpoint { navpoint: Navpoint, level: AltitudeSpec },
    /// Departing to another airfield.
    Destination(String),
}

impl Goal {
    #[must_use]
    pub fn is_landing(&self) -> bool { matches!(self, Self::Landing { .. }) }

    /// Whether the agent is an arrival at the simulated airfield.
    #[must_use]
    pub fn is_arrival(&self) -> bool { matches!(self, Self::Landing { .. } | Self::Parking(_)) }
}

/// Lifecycle flags of an agent.
#[derive(Component, Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Flags {
    /// The agent has been handed over and is removed at the end of the tick.
    pub handed_over:         bool,
    /// Climbing at the fast rate after a missed approach.
    pub going_around:        bool,
    /// The agent skids off the runway after its next touchdown.
    pub skid_off_runway:     bool,
    /// The agent has stopped on the runway and requested to backtrack.
    pub backtrack_requested: bool,
    /// The agent has stopped on the runway without any exit.
    pub unable_to_vacate:    bool,
}

/// The ordered queue of instructions an agent is following.
#[derive(Component, Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Instructions(pub Vec<Queued>);

/// State of multi-tick maneuvers not represented in the instruction queue.
#[derive(Component, Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Maneuver {
    /// Rolling off a runway that has no ground network.
    pub wild_roll: Option<WildRoll>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WildRoll {
    pub heading:   Heading,
    /// Remaining distance to roll before stopping.
    pub remaining: Length<f32>,
}

/// Targets decided for the current tick.
///
/// Recomputed from scratch every tick.
/// `None` fields keep the current value.
#[derive(Component, Debug, Clone, Default)]
pub struct Targets {
    pub heading:     Option<HeadingTarget>,
    pub altitude:    Option<AltitudeTarget>,
    pub speed:       Option<SpeedTarget>,
    /// Moves along the heading regardless of wind.
    pub ignore_wind: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingTarget {
    pub heading: Heading,
    /// Forces the direction of turn, otherwise turns in the closer direction.
    pub turn:    Option<TurnDirection>,
    /// Turns at the fast rate.
    pub fast:    bool,
}

impl HeadingTarget {
    #[must_use]
    pub fn normal(heading: Heading) -> Self { Self { heading, turn: None, fast: false } }

    #[must_use]
    pub fn fast(heading: Heading) -> Self { Self { heading, turn: None, fast: true } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeTarget {
    /// Target pressure altitude.
    pub altitude: Position<f32>,
    pub fast:     bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedTarget {
    pub ias:  Speed<f32>,
    pub fast: bool,
}

#[derive(Bundle)]
pub struct Comps {
    pub agent:        Agent,
    pub params:       FlightParams,
    pub goal:         Goal,
    pub flags:        Flags,
    pub instructions: Instructions,
    pub maneuver:     Maneuver,
    pub targets:      Targets,
    pub performance:  Performance,
}

/// Parameters to construct an agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub callsign:  String,
    pub type_code: String,
    pub params:    FlightParams,
    pub goal:      Goal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpawnError {
    #[error("unknown aircraft type {0}")]
    UnknownType(String),
    #[error("callsign {0} is already in use")]
    DuplicateCallsign(String),
    #[error("agent cannot start in phase {0}")]
    IllegalPhase(Status),
}

/// Spawns a new agent.
///
/// The agent must start taxiing, ready for departure or airborne.
pub fn spawn(world: &mut World, spec: AgentSpec) -> Result<Entity, SpawnError> {
    if !spec.params.status.is_initial() {
        return Err(SpawnError::IllegalPhase(spec.params.status));
    }
    insert(world, spec, Flags::default(), Instructions::default(), Maneuver::default())
}

/// Spawns an agent in any phase with existing state.
pub(super) fn insert(
    world: &mut World,
    spec: AgentSpec,
    flags: Flags,
    instructions: Instructions,
    maneuver: Maneuver,
) -> Result<Entity, SpawnError> {
    let AgentSpec { callsign, type_code, params, goal } = spec;

    let Some(performance) =
        world.get_resource::<AircraftTypes>().and_then(|types| types.get(&type_code)).cloned()
    else {
        return Err(SpawnError::UnknownType(type_code));
    };

    if find_by_callsign(world, &callsign).is_some() {
        return Err(SpawnError::DuplicateCallsign(callsign));
    }

    bevy::log::info!("Spawning {type_code} {callsign} in phase {}", params.status);
    let entity = world
        .spawn(Comps {
            agent: Agent { callsign, type_code },
            params,
            goal,
            flags,
            instructions,
            maneuver,
            targets: Targets::default(),
            performance,
        })
        .id();
    Ok(entity)
}

/// Finds the agent with the given callsign.
pub fn find_by_callsign(world: &mut World, callsign: &str) -> Option<Entity> {
    let mut query = world.query::<(Entity, &Agent)>();
    query.iter(world).find(|(_, agent)| agent.callsign == callsign).map(|(entity, _)| entity)
}
