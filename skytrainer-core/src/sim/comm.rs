//! Radio transmissions from agents.

use bevy::app::{App, Plugin};
use bevy::ecs::entity::Entity;
use bevy::ecs::message::{Message, MessageWriter};
use bevy::ecs::system::SystemParam;
use bevy::ecs::world::World;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.add_message::<RadioMessage>();
        app.add_message::<AgentRemoved>();
    }
}

/// A transmission from an agent to the controller.
#[derive(Debug, Clone, Message)]
pub struct RadioMessage {
    /// The transmitting agent.
    pub agent:    Entity,
    pub callsign: String,
    /// The message content, without the callsign.
    pub content:  String,
    /// Classify the message by urgency.
    pub class:    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Class {
    /// Verbose information that does not need acknowledgement,
    /// e.g. a readback.
    VerboseInfo,
    /// Normal transmission that needs response,
    /// e.g. ready for departure.
    NeedAck,
    /// Information from abnormal events, e.g. a missed approach.
    AnomalyInfo,
    /// Transmission that needs urgent response,
    /// e.g. a runway excursion.
    Urgent,
}

impl RadioMessage {
    fn log(&self) {
        let Self { agent, callsign, content, class } = self;
        match class {
            Class::VerboseInfo => bevy::log::debug!("{callsign} ({agent:?}): {content}"),
            Class::NeedAck => bevy::log::info!("{callsign} ({agent:?}): {content}"),
            Class::AnomalyInfo | Class::Urgent => {
                bevy::log::warn!("{callsign} ({agent:?}) [{class}]: {content}");
            }
        }
    }
}

/// Writes and logs radio messages from systems.
#[derive(SystemParam)]
pub struct Radio<'w> {
    writer: MessageWriter<'w, RadioMessage>,
}

impl Radio<'_> {
    pub fn send(&mut self, agent: Entity, callsign: &str, content: impl Into<String>, class: Class) {
        let message =
            RadioMessage { agent, callsign: callsign.to_owned(), content: content.into(), class };
        message.log();
        self.writer.write(message);
    }
}

/// Writes and logs a radio message outside systems.
pub fn send(world: &mut World, agent: Entity, callsign: &str, content: impl Into<String>, class: Class) {
    let message =
        RadioMessage { agent, callsign: callsign.to_owned(), content: content.into(), class };
    message.log();
    world.write_message(message);
}

/// An agent left the simulation and its entity was despawned.
#[derive(Debug, Clone, Message)]
pub struct AgentRemoved {
    pub agent:    Entity,
    pub callsign: String,
    pub reason:   RemovalReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RemovalReason {
    #[strum(to_string = "handed over")]
    HandedOver,
    #[strum(to_string = "out of range")]
    OutOfRange,
}
