//! Binary snapshots of agents.
//!
//! A snapshot contains everything needed to respawn an agent mid-flight,
//! including its instruction queue.
//! Targets are not stored since they are recomputed every tick.

use std::io;

use bevy::ecs::entity::Entity;
use bevy::ecs::world::World;

use super::agent::{self, Agent, AgentSpec, Flags, FlightParams, Goal, Instructions, Maneuver, SpawnError};
use super::instr::Queued;


#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AgentSnapshot {
    pub callsign:     String,
    pub type_code:    String,
    pub params:       FlightParams,
    pub goal:         Goal,
    pub flags:        Flags,
    pub instructions: Vec<Queued>,
    pub maneuver:     Maneuver,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("entity {0} is not an agent")]
    NoAgent(Entity),
    #[error("encode snapshot: {0}")]
    Encode(#[from] ciborium::ser::Error<io::Error>),
    #[error("decode snapshot: {0}")]
    Decode(#[from] ciborium::de::Error<io::Error>),
    #[error("restore agent: {0}")]
    Spawn(#[from] SpawnError),
}

impl AgentSnapshot {
    /// Captures the current state of an agent.
    pub fn capture(world: &World, entity: Entity) -> Result<Self, SnapshotError> {
        let (Some(agent), Some(params), Some(goal), Some(flags), Some(instructions), Some(maneuver)) = (
            world.get::<Agent>(entity),
            world.get::<FlightParams>(entity),
            world.get::<Goal>(entity),
            world.get::<Flags>(entity),
            world.get::<Instructions>(entity),
            world.get::<Maneuver>(entity),
        ) else {
            return Err(SnapshotError::NoAgent(entity));
        };

        Ok(Self {
            callsign:     agent.callsign.clone(),
            type_code:    agent.type_code.clone(),
            params:       params.clone(),
            goal:         goal.clone(),
            flags:        flags.clone(),
            instructions: instructions.0.clone(),
            maneuver:     maneuver.clone(),
        })
    }

    /// Captures all agents in the world, ordered by callsign.
    pub fn capture_all(world: &mut World) -> Vec<Self> {
        let entities: Vec<Entity> =
            world.query_filtered::<Entity, bevy::ecs::query::With<Agent>>().iter(world).collect();
        let mut snapshots: Vec<Self> = entities
            .into_iter()
            .filter_map(|entity| match Self::capture(world, entity) {
                Ok(snapshot) => Some(snapshot),
                Err(err) => {
                    bevy::log::error!("Cannot capture agent {entity:?}: {err}");
                    None
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.callsign.cmp(&b.callsign));
        snapshots
    }

    pub fn encode(&self, writer: impl io::Write) -> Result<(), SnapshotError> {
        ciborium::into_writer(self, writer)?;
        Ok(())
    }

    pub fn decode(reader: impl io::Read) -> Result<Self, SnapshotError> {
        Ok(ciborium::from_reader(reader)?)
    }

    /// Spawns a new agent from the snapshot.
    ///
    /// The aircraft type is resolved against the current performance table,
    /// and the callsign must not be in use.
    pub fn restore(self, world: &mut World) -> Result<Entity, SnapshotError> {
        let Self { callsign, type_code, params, goal, flags, instructions, maneuver } = self;
        let entity = agent::insert(
            world,
            AgentSpec { callsign, type_code, params, goal },
            flags,
            Instructions(instructions),
            maneuver,
        )?;
        Ok(entity)
    }
}
