//! ATC instructions and the per-agent instruction queue.
//!
//! Instructions are ingested in batches through [`instruct`].
//! A batch is staged on a copy of the queue first,
//! so a rejected instruction leaves the queue untouched.

use std::fmt;

use bevy::ecs::entity::Entity;
use bevy::ecs::world::World;
use itertools::Itertools;
use math::{
    Heading, Length, Position, Pressure, STANDARD_PRESSURE, Speed, TurnDirection, pressure_altitude,
};

use super::agent::{Agent, Flags, FlightParams, Goal, Instructions, Squawk, TransponderMode};
use super::aircraft_type::Performance;
use super::airfield::{Airfield, Navpoint};
use super::comm;
use super::env::Environment;
use super::ground::{GroundNetwork, NodeId};
use super::status::Status;
use crate::WorldTryLog;

#[cfg(test)]
mod tests;

/// A target altitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AltitudeSpec {
    /// Feet above mean sea level.
    Feet(f32),
    /// Hundreds of feet of pressure altitude.
    FlightLevel(u16),
}

impl AltitudeSpec {
    /// The pressure altitude of this target under the given QNH.
    #[must_use]
    pub fn pressure_altitude(self, qnh: Pressure) -> Position<f32> {
        match self {
            Self::Feet(feet) => pressure_altitude(Position::from_feet(feet), qnh),
            Self::FlightLevel(level) => Position::from_feet(f32::from(level) * 100.),
        }
    }
}

impl fmt::Display for AltitudeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feet(feet) => write!(f, "{feet:.0} ft"),
            Self::FlightLevel(level) => write!(f, "FL{level:03}"),
        }
    }
}

/// An instruction from ATC.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, strum::EnumDiscriminants)]
#[strum_discriminants(name(Kind), derive(Hash, strum::Display))]
pub enum Instruction {
    HeadingVector { heading: Heading, turn: Option<TurnDirection> },
    AltitudeVector(AltitudeSpec),
    SpeedVector(Speed<f32>),
    DirectTo(Navpoint),
    CancelSpeedVector,
    /// Flies direct to each navpoint in order.
    FollowRoute(Vec<Navpoint>),
    Hold { fix: Navpoint, turn: TurnDirection },
    /// Sets the transponder code, and the transponder mode if given.
    Squawk { code: String, mode: Option<TransponderMode> },
    HandOver,
    CancelApproach,
    LineUp,
    /// Intercepts the course through the navaid along the radial.
    InterceptNavaid { navaid: Navpoint, radial: Heading },
    InterceptLocalizer(String),
    ExpectRunway(String),
    /// Taxis along the nodes in order, then into the parking position if given.
    Taxi { route: Vec<NodeId>, parking: Option<String> },
    HoldPosition,
    ClearedApproach,
    ClearedTakeoff,
    ClearedToLand,
    SayIntentions,
}

const HEADING_FAMILY: &[Kind] = &[
    Kind::HeadingVector,
    Kind::DirectTo,
    Kind::FollowRoute,
    Kind::Hold,
    Kind::InterceptNavaid,
    Kind::InterceptLocalizer,
];

impl Kind {
    /// Whether this kind of instruction decides the lateral navigation of an airborne agent.
    #[must_use]
    pub fn is_heading_family(self) -> bool { HEADING_FAMILY.contains(&self) }

    /// Kinds of queued instructions removed when an instruction of this kind is ingested.
    #[must_use]
    pub fn supersedes(self) -> &'static [Kind] {
        match self {
            Kind::HeadingVector | Kind::DirectTo | Kind::FollowRoute | Kind::Hold => {
                HEADING_FAMILY
            }
            Kind::InterceptNavaid | Kind::InterceptLocalizer => &[
                Kind::DirectTo,
                Kind::FollowRoute,
                Kind::Hold,
                Kind::InterceptNavaid,
                Kind::InterceptLocalizer,
            ],
            Kind::AltitudeVector => &[Kind::AltitudeVector],
            Kind::SpeedVector | Kind::CancelSpeedVector => {
                &[Kind::SpeedVector, Kind::CancelSpeedVector]
            }
            Kind::Squawk => &[Kind::Squawk],
            Kind::CancelApproach => {
                &[Kind::ClearedApproach, Kind::ClearedToLand, Kind::InterceptLocalizer]
            }
            Kind::LineUp => &[Kind::LineUp, Kind::HoldPosition],
            Kind::ExpectRunway => &[Kind::ExpectRunway],
            Kind::Taxi => &[Kind::Taxi, Kind::HoldPosition, Kind::LineUp],
            Kind::HoldPosition => &[Kind::HoldPosition, Kind::ClearedTakeoff, Kind::LineUp],
            Kind::ClearedApproach => &[Kind::ClearedApproach, Kind::Hold, Kind::FollowRoute],
            Kind::ClearedTakeoff => &[Kind::ClearedTakeoff, Kind::HoldPosition, Kind::LineUp],
            Kind::ClearedToLand => &[Kind::ClearedToLand],
            Kind::HandOver | Kind::SayIntentions => &[],
        }
    }
}

impl Instruction {
    #[must_use]
    pub fn kind(&self) -> Kind { self.into() }

    /// Whether the instruction has no further effect and can leave the queue.
    ///
    /// A direct-to is complete within `arrival` of its navpoint.
    #[must_use]
    pub fn is_done(&self, params: &FlightParams, arrival: Length<f32>) -> bool {
        match self {
            Self::CancelSpeedVector
            | Self::Squawk { .. }
            | Self::HandOver
            | Self::CancelApproach
            | Self::SayIntentions => true,
            Self::HeadingVector { .. }
            | Self::AltitudeVector(_)
            | Self::SpeedVector(_)
            | Self::Hold { .. }
            | Self::InterceptNavaid { .. }
            | Self::InterceptLocalizer(_)
            | Self::HoldPosition => false,
            Self::DirectTo(navpoint) => params.position.distance(navpoint.position) <= arrival,
            Self::FollowRoute(route) => route.is_empty(),
            Self::LineUp => matches!(params.status, Status::LinedUp(_)),
            Self::ExpectRunway(_) => {
                matches!(params.status, Status::Ready(_) | Status::LinedUp(_))
            }
            Self::Taxi { route, parking } => route.is_empty() && parking.is_none(),
            Self::ClearedApproach | Self::ClearedToLand => params.status.is_on_ground(),
            Self::ClearedTakeoff => params.status.is_airborne(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeadingVector { heading, turn: Some(turn) } => {
                write!(f, "turn {turn} heading {heading}")
            }
            Self::HeadingVector { heading, turn: None } => write!(f, "fly heading {heading}"),
            Self::AltitudeVector(altitude) => write!(f, "altitude {altitude}"),
            Self::SpeedVector(speed) => write!(f, "speed {:.0} knots", speed.into_knots()),
            Self::DirectTo(navpoint) => write!(f, "direct {}", navpoint.code),
            Self::CancelSpeedVector => write!(f, "resume normal speed"),
            Self::FollowRoute(route) => {
                write!(f, "route {}", route.iter().map(|navpoint| &navpoint.code).join(" "))
            }
            Self::Hold { fix, turn } => write!(f, "hold at {}, {turn} turns", fix.code),
            Self::Squawk { code, mode: Some(mode) } => write!(f, "squawk {code} {mode}"),
            Self::Squawk { code, mode: None } => write!(f, "squawk {code}"),
            Self::HandOver => write!(f, "good day"),
            Self::CancelApproach => write!(f, "cancel approach"),
            Self::LineUp => write!(f, "line up and wait"),
            Self::InterceptNavaid { navaid, radial } => {
                write!(f, "intercept {} radial {radial}", navaid.code)
            }
            Self::InterceptLocalizer(rwy) => write!(f, "intercept localizer runway {rwy}"),
            Self::ExpectRunway(rwy) => write!(f, "expect runway {rwy}"),
            Self::Taxi { route, parking } => {
                write!(f, "taxi via {} nodes", route.len())?;
                if let Some(parking) = parking {
                    write!(f, " to {parking}")?;
                }
                Ok(())
            }
            Self::HoldPosition => write!(f, "hold position"),
            Self::ClearedApproach => write!(f, "cleared for approach"),
            Self::ClearedTakeoff => write!(f, "cleared for takeoff"),
            Self::ClearedToLand => write!(f, "cleared to land"),
            Self::SayIntentions => write!(f, "say intentions"),
        }
    }
}

/// Metadata of an instruction recognized from speech.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VoiceMeta {
    pub recognised_text: String,
    /// Recognition confidence between 0 and 1.
    pub confidence:      f32,
}

/// An instruction in the queue of an agent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Queued {
    pub instruction: Instruction,
    pub voice:       Option<VoiceMeta>,
}

impl From<Instruction> for Queued {
    fn from(instruction: Instruction) -> Self { Self { instruction, voice: None } }
}

impl Instructions {
    /// Whether an instruction of the kind is queued.
    #[must_use]
    pub fn has(&self, kind: Kind) -> bool { self.0.iter().any(|q| q.instruction.kind() == kind) }

    /// Removes all queued instructions of the given kinds.
    pub fn remove_kinds(&mut self, kinds: &[Kind]) {
        self.0.retain(|q| !kinds.contains(&q.instruction.kind()));
    }

    /// Appends an instruction decided by the agent itself, superseding queued instructions.
    pub fn push_internal(&mut self, instruction: Instruction) {
        self.remove_kinds(instruction.kind().supersedes());
        self.0.push(instruction.into());
    }

    /// The runway the agent expects to land on or depart from.
    #[must_use]
    pub fn expected_runway(&self) -> Option<&str> { expected_runway(&self.0) }
}

fn expected_runway(queue: &[Queued]) -> Option<&str> {
    queue.iter().rev().find_map(|q| match &q.instruction {
        Instruction::ExpectRunway(rwy) | Instruction::InterceptLocalizer(rwy) => Some(rwy.as_str()),
        _ => None,
    })
}

/// Reasons for an agent to reject an instruction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("not a time for vectors")]
    NotAirborne,
    #[error("already cleared for approach")]
    ApproachCleared,
    #[error("unable to change speed on the ground")]
    SpeedOnGround,
    #[error("speed is too low")]
    SpeedTooLow,
    #[error("speed is too high")]
    SpeedTooHigh,
    #[error("{0} is above our ceiling")]
    AboveCeiling(AltitudeSpec),
    #[error("route is empty")]
    EmptyRoute,
    #[error("invalid squawk code {0}")]
    InvalidSquawk(String),
    #[error("approach not cleared")]
    ApproachNotCleared,
    #[error("not ready for departure")]
    NotReady,
    #[error("unknown runway {0}")]
    UnknownRunway(String),
    #[error("runway {0} has no ILS")]
    NoIls(String),
    #[error("inbound for landing")]
    Arriving,
    #[error("established on final approach")]
    OnFinal,
    #[error("on the runway")]
    OnRunway,
    #[error("airborne")]
    Airborne,
    #[error("taking off")]
    TakingOff,
    #[error("still rolling")]
    Rolling,
    #[error("unknown taxi node {0}")]
    UnknownNode(NodeId),
    #[error("unknown parking position {0}")]
    UnknownParking(String),
    #[error("parking position {0} is not suitable for the aircraft")]
    UnsuitedParking(String),
    #[error("not on the ground")]
    NotOnGround,
    #[error("not inbound for landing")]
    NotLanding,
    #[error("no runway to expect")]
    NoExpectedRunway,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InstructionError {
    #[error("entity {0} is not an agent")]
    NoAgent(Entity),
    #[error("instruction #{index} rejected: {reason}")]
    Rejected { index: usize, reason: RejectReason },
}

/// The agent state that ingestion validates instructions against.
pub struct Context<'a> {
    pub params:      &'a FlightParams,
    pub goal:        &'a Goal,
    pub performance: &'a Performance,
    pub airfield:    Option<&'a Airfield>,
    pub ground:      Option<&'a GroundNetwork>,
    pub qnh:         Pressure,
}

impl Context<'_> {
    fn known_runway(&self, rwy: &str) -> Result<(), RejectReason> {
        match self.airfield.and_then(|airfield| airfield.runway(rwy)) {
            Some(_) => Ok(()),
            None => Err(RejectReason::UnknownRunway(rwy.to_owned())),
        }
    }
}

fn approach_cleared(status: &Status, queue: &[Queued]) -> bool {
    matches!(status, Status::Landing(_))
        || queue.iter().any(|q| q.instruction.kind() == Kind::ClearedApproach)
}

/// Validates `queued` against the agent state and the staged queue,
/// then removes superseded instructions and appends it.
pub fn ingest(queue: &mut Vec<Queued>, ctx: &Context, queued: Queued) -> Result<(), RejectReason> {
    check(queue, ctx, &queued.instruction)?;

    let superseded = queued.instruction.kind().supersedes();
    queue.retain(|q| !superseded.contains(&q.instruction.kind()));
    queue.push(queued);
    Ok(())
}

fn check(queue: &[Queued], ctx: &Context, instruction: &Instruction) -> Result<(), RejectReason> {
    let status = &ctx.params.status;
    let require_airborne = || {
        if status.is_airborne() { Ok(()) } else { Err(RejectReason::NotAirborne) }
    };
    let require_not_cleared = || {
        if approach_cleared(status, queue) { Err(RejectReason::ApproachCleared) } else { Ok(()) }
    };

    match instruction {
        Instruction::AltitudeVector(spec) => {
            require_airborne()?;
            require_not_cleared()?;
            if spec.pressure_altitude(ctx.qnh) > ctx.performance.ceiling {
                return Err(RejectReason::AboveCeiling(*spec));
            }
        }
        Instruction::HeadingVector { .. }
        | Instruction::DirectTo(_)
        | Instruction::Hold { .. }
        | Instruction::InterceptNavaid { .. } => {
            require_airborne()?;
            require_not_cleared()?;
        }
        Instruction::FollowRoute(route) => {
            require_airborne()?;
            if route.is_empty() {
                return Err(RejectReason::EmptyRoute);
            }
            require_not_cleared()?;
        }
        Instruction::SpeedVector(speed) => {
            if status.is_on_ground() {
                return Err(RejectReason::SpeedOnGround);
            }
            if *speed < ctx.performance.min_ias {
                return Err(RejectReason::SpeedTooLow);
            }
            if *speed > ctx.performance.max_ias {
                return Err(RejectReason::SpeedTooHigh);
            }
        }
        Instruction::CancelSpeedVector | Instruction::HandOver | Instruction::SayIntentions => {}
        Instruction::Squawk { code, .. } => {
            if Squawk::parse(code).is_none() {
                return Err(RejectReason::InvalidSquawk(code.clone()));
            }
        }
        Instruction::CancelApproach => {
            if !approach_cleared(status, queue) {
                return Err(RejectReason::ApproachNotCleared);
            }
        }
        Instruction::LineUp => {
            if !matches!(status, Status::Ready(_)) {
                return Err(RejectReason::NotReady);
            }
        }
        Instruction::InterceptLocalizer(rwy) => {
            require_airborne()?;
            let runway = ctx
                .airfield
                .and_then(|airfield| airfield.runway(rwy))
                .ok_or_else(|| RejectReason::UnknownRunway(rwy.clone()))?;
            if !runway.0.ils {
                return Err(RejectReason::NoIls(rwy.clone()));
            }
        }
        Instruction::ExpectRunway(rwy) => {
            ctx.known_runway(rwy)?;
            if matches!(status, Status::Landing(_)) {
                return Err(RejectReason::OnFinal);
            }
            if status.is_on_ground() {
                if ctx.goal.is_arrival() {
                    return Err(RejectReason::Arriving);
                }
                if status.is_rolling() || matches!(status, Status::LinedUp(_)) {
                    return Err(RejectReason::OnRunway);
                }
            }
        }
        Instruction::Taxi { route, parking } => check_taxi(ctx, route, parking.as_deref())?,
        Instruction::HoldPosition => {
            if !status.is_on_ground() {
                return Err(RejectReason::NotOnGround);
            }
            if matches!(status, Status::TakeoffRoll(_)) {
                return Err(RejectReason::TakingOff);
            }
        }
        Instruction::ClearedApproach => {
            require_airborne()?;
            if !ctx.goal.is_landing() {
                return Err(RejectReason::NotLanding);
            }
            if expected_runway(queue).is_none() {
                return Err(RejectReason::NoExpectedRunway);
            }
        }
        Instruction::ClearedTakeoff => {
            if !matches!(status, Status::Ready(_) | Status::LinedUp(_)) {
                return Err(RejectReason::NotReady);
            }
        }
        Instruction::ClearedToLand => {
            if !ctx.goal.is_landing() {
                return Err(RejectReason::NotLanding);
            }
            if !approach_cleared(status, queue) {
                return Err(RejectReason::ApproachNotCleared);
            }
        }
    }
    Ok(())
}

fn check_taxi(ctx: &Context, route: &[NodeId], parking: Option<&str>) -> Result<(), RejectReason> {
    let params = ctx.params;
    match &params.status {
        status if !status.is_on_ground() => return Err(RejectReason::Airborne),
        Status::TakeoffRoll(_) => return Err(RejectReason::TakingOff),
        Status::LinedUp(_) | Status::LandingRoll(_) if params.ias.is_positive() => {
            return Err(RejectReason::Rolling);
        }
        _ => {}
    }

    for &node in route {
        if ctx.ground.and_then(|ground| ground.node(node)).is_none() {
            return Err(RejectReason::UnknownNode(node));
        }
    }

    if let Some(parking) = parking {
        let position = ctx
            .ground
            .and_then(|ground| ground.parking(parking))
            .ok_or_else(|| RejectReason::UnknownParking(parking.to_owned()))?;
        if !position.categories.accepts(ctx.performance.category) {
            return Err(RejectReason::UnsuitedParking(parking.to_owned()));
        }
    }
    Ok(())
}

/// Submits a batch of instructions to an agent.
///
/// Either all instructions are accepted, or none of them.
/// The agent reads back or rejects the batch on the radio.
pub fn instruct<I>(
    world: &mut World,
    agent: Entity,
    batch: impl IntoIterator<Item = I>,
) -> Result<(), InstructionError>
where
    I: Into<Queued>,
{
    let batch: Vec<Queued> = batch.into_iter().map(Into::into).collect();

    let Some(callsign) = world.get::<Agent>(agent).map(|agent| agent.callsign.clone()) else {
        return Err(InstructionError::NoAgent(agent));
    };

    let staged = {
        let (Some(params), Some(goal), Some(performance), Some(queue)) = (
            world.log_get::<FlightParams>(agent),
            world.log_get::<Goal>(agent),
            world.log_get::<Performance>(agent),
            world.log_get::<Instructions>(agent),
        ) else {
            return Err(InstructionError::NoAgent(agent));
        };

        let ctx = Context {
            params,
            goal,
            performance,
            airfield: world.get_resource::<Airfield>(),
            ground: world.get_resource::<GroundNetwork>(),
            qnh: world.get_resource::<Environment>().map_or(STANDARD_PRESSURE, |env| env.qnh()),
        };

        let mut staged = queue.0.clone();
        batch.iter().enumerate().try_for_each(|(index, queued)| {
            ingest(&mut staged, &ctx, queued.clone())
                .map_err(|reason| InstructionError::Rejected { index, reason })
        })
        .map(|()| staged)
    };

    let staged = match staged {
        Ok(staged) => staged,
        Err(err) => {
            if let InstructionError::Rejected { reason, .. } = &err {
                comm::send(world, agent, &callsign, format!("unable, {reason}"), comm::Class::NeedAck);
            }
            return Err(err);
        }
    };

    if let Some(mut queue) = world.log_get_mut::<Instructions>(agent) {
        queue.0 = staged;
    }

    let mut replies = Vec::new();
    for queued in &batch {
        commit(world, agent, &queued.instruction, &mut replies);
    }

    let readback = batch.iter().map(|queued| queued.instruction.to_string()).join(", ");
    comm::send(world, agent, &callsign, readback, comm::Class::VerboseInfo);
    for reply in replies {
        comm::send(world, agent, &callsign, reply, comm::Class::NeedAck);
    }
    Ok(())
}

/// Applies the immediate effects of an accepted instruction.
fn commit(world: &mut World, agent: Entity, instruction: &Instruction, replies: &mut Vec<String>) {
    match instruction {
        Instruction::Squawk { code, mode } => {
            if let (Some(code), Some(mut params)) =
                (Squawk::parse(code), world.log_get_mut::<FlightParams>(agent))
            {
                params.squawk = code;
                if let Some(mode) = mode {
                    params.transponder = *mode;
                }
            }
        }
        Instruction::HandOver => {
            if let Some(mut flags) = world.log_get_mut::<Flags>(agent) {
                flags.handed_over = true;
            }
        }
        Instruction::Hold { .. } => {
            // a new pattern restarts with the entry to its fix
            if let Some(mut params) = world.log_get_mut::<FlightParams>(agent)
                && matches!(params.status, Status::Holding { .. })
            {
                params.status = Status::Airborne;
            }
        }
        Instruction::CancelApproach => {
            if let Some(mut params) = world.log_get_mut::<FlightParams>(agent)
                && matches!(params.status, Status::Landing(_))
            {
                params.status = Status::Airborne;
            }
        }
        Instruction::SayIntentions => {
            if let Some(goal) = world.log_get::<Goal>(agent) {
                replies.push(intentions(goal));
            }
        }
        _ => {}
    }
}

fn intentions(goal: &Goal) -> String {
    match goal {
        Goal::None => "no particular intentions".into(),
        Goal::Landing { ils: true } => "inbound for ILS approach".into(),
        Goal::Landing { ils: false } => "inbound for visual approach".into(),
        Goal::Parking(parking) => format!("taxiing to {parking}"),
        Goal::Navpoint { navpoint, level } => format!("leaving via {} at {level}", navpoint.code),
        Goal::Destination(destination) => format!("departing for {destination}"),
    }
}

pub trait WorldInstructExt {
    /// See [`instruct`].
    fn instruct<I: Into<Queued>>(
        &mut self,
        agent: Entity,
        batch: impl IntoIterator<Item = I>,
    ) -> Result<(), InstructionError>;
}

impl WorldInstructExt for World {
    fn instruct<I: Into<Queued>>(
        &mut self,
        agent: Entity,
        batch: impl IntoIterator<Item = I>,
    ) -> Result<(), InstructionError> {
        instruct(self, agent, batch)
    }
}
