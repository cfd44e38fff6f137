//! Ground movement procedures: taxiing along routes, parking, lining up and holding short.

use bevy::app::{self, App, Plugin};
use bevy::ecs::entity::Entity;
use bevy::ecs::query::QueryData;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Query, Res};
use bevy::time::{self, Time};
use bevy_mod_config::ReadConfig;
use math::{Angle, GeoPosition, Heading, Length, Speed};

use super::agent::{Agent, Flags, FlightParams, HeadingTarget, Instructions, SpeedTarget, Targets};
use super::airfield::Airfield;
use super::comm::{Class, Radio};
use super::ground::GroundNetwork;
use super::instr::{Instruction, Kind};
use super::status::Status;
use super::{SystemSets, pilot};
use crate::try_log;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.add_systems(app::Update, taxi_system.in_set(SystemSets::Procedure));
    }
}

/// Heading error beyond which an agent stops to turn on the spot.
const MAX_MOVING_TURN: Angle = Angle::from_degrees(60.);
/// Heading tolerance for aligning with a runway or parking position.
pub const ALIGNED: Angle = Angle::from_degrees(0.5);
/// Distance from the line-up point within which a stopped agent is holding short of the runway.
const HOLDING_SHORT: Length<f32> = Length::from_meters(150.);

/// Targets towards a ground position at the taxi speed,
/// slowing down in proportion to the heading error.
pub fn steer_to(params: &FlightParams, target: GeoPosition, taxi_speed: Speed<f32>) -> Targets {
    let bearing = params.position.bearing_to(target);
    let error = params.heading.closest_distance(bearing).abs();
    let speed = if error > MAX_MOVING_TURN { Speed::ZERO } else { taxi_speed * error.cos() };
    Targets {
        heading: Some(HeadingTarget::fast(bearing)),
        speed: Some(SpeedTarget { ias: speed, fast: true }),
        ..Targets::default()
    }
}

/// Stops the agent, then turns it on the spot to `heading`.
///
/// Returns whether the agent is stopped and aligned.
pub fn stop_and_align(params: &FlightParams, targets: &mut Targets, heading: Heading) -> bool {
    targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: true });
    if params.ias.is_positive() {
        return false;
    }
    targets.heading = Some(HeadingTarget::fast(heading));
    params.heading.is_within(heading, ALIGNED)
}

/// Moves the agent onto the line-up point of `rwy` and aligns it with the runway.
///
/// Without a ground network, the agent aligns where it is.
/// Returns whether the agent is lined up.
pub fn line_up(
    params: &FlightParams,
    targets: &mut Targets,
    rwy: &str,
    airfield: &Airfield,
    ground: Option<&GroundNetwork>,
    conf: &pilot::ConfRead,
) -> bool {
    let (runway, spec) =
        try_log!(airfield.runway(rwy), expect "runway {rwy} to line up on must exist" or return false);

    if let Some(ground) = ground
        && let Some(point) = ground.line_up_point(&spec, params.position)
        && let Some(position) = ground.node_position(point)
        && params.position.distance(position) > conf.taxi_arrival
    {
        *targets = steer_to(params, position, conf.taxi_speed);
        return false;
    }

    stop_and_align(params, targets, runway.heading)
}

/// Whether the agent is short of runway `rwy`, close to its line-up point.
///
/// Without a ground network, any position counts as holding short.
fn is_holding_short(
    params: &FlightParams,
    rwy: &str,
    airfield: Option<&Airfield>,
    ground: Option<&GroundNetwork>,
) -> bool {
    let Some(ground) = ground else { return true };
    let Some((_, spec)) = airfield.and_then(|airfield| airfield.runway(rwy)) else { return false };
    ground
        .line_up_point(&spec, params.position)
        .and_then(|point| ground.node_position(point))
        .is_some_and(|point| params.position.distance(point) <= HOLDING_SHORT)
}

#[derive(QueryData)]
#[query_data(mutable)]
pub(super) struct TaxiQueryData {
    entity:       Entity,
    agent:        &'static Agent,
    params:       &'static mut FlightParams,
    flags:        &'static mut Flags,
    instructions: &'static mut Instructions,
    targets:      &'static mut Targets,
}

pub(super) fn taxi_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<pilot::Conf>,
    airfield: Option<Res<Airfield>>,
    ground: Option<Res<GroundNetwork>>,
    mut radio: Radio,
    mut query: Query<TaxiQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let ground = ground.as_deref();
    let airfield = airfield.as_deref();

    for mut data in &mut query {
        let callsign = &data.agent.callsign;
        let params = &mut *data.params;

        match &params.status {
            Status::TakeoffRoll(_) => continue,
            Status::LandingRoll(_) if !data.instructions.has(Kind::Taxi) => continue,
            status if !status.is_on_ground() => continue,
            _ => {}
        }

        if data.instructions.has(Kind::HoldPosition) {
            data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: true });
            continue;
        }

        if let Some(Instruction::Taxi { route, parking }) = data
            .instructions
            .0
            .iter_mut()
            .map(|q| &mut q.instruction)
            .find(|instr| matches!(instr, Instruction::Taxi { .. }))
        {
            let ground = try_log!(ground, expect "a taxi instruction requires a ground network" or continue);

            if matches!(params.status, Status::Ready(_) | Status::LinedUp(_)) {
                bevy::log::debug!("{callsign} leaves {} to taxi", params.status);
                params.status = Status::Taxiing;
            }

            while let Some(&next) = route.first() {
                let position = try_log!(
                    ground.node_position(next),
                    expect "taxi node {next} must exist" or {
                        route.remove(0);
                        continue;
                    }
                );
                if params.position.distance(position) > conf.taxi_arrival {
                    break;
                }
                bevy::log::trace!("{callsign} passed taxi node {next}");
                route.remove(0);
            }

            if route.is_empty() && matches!(params.status, Status::LandingRoll(_)) {
                bevy::log::info!("{callsign} vacated the runway");
                params.status = Status::Taxiing;
                data.flags.backtrack_requested = false;
                data.flags.unable_to_vacate = false;
            }

            if let Some(&next) = route.first() {
                if let Some(position) = ground.node_position(next) {
                    *data.targets = steer_to(params, position, conf.taxi_speed);
                }
            } else if let Some(parking_id) = parking {
                let spot = try_log!(
                    ground.parking(parking_id),
                    expect "parking position {parking_id} must exist" or {
                        *parking = None;
                        continue;
                    }
                );
                if params.position.distance(spot.position) > conf.taxi_arrival {
                    *data.targets = steer_to(params, spot.position, conf.taxi_speed);
                } else if stop_and_align(params, &mut data.targets, spot.heading) {
                    bevy::log::info!("{callsign} parked at {parking_id}");
                    *parking = None;
                }
            } else {
                data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: true });
            }
            continue;
        }

        if let Status::Ready(rwy) = &params.status
            && (data.instructions.has(Kind::LineUp) || data.instructions.has(Kind::ClearedTakeoff))
        {
            let rwy = rwy.clone();
            let airfield =
                try_log!(airfield, expect "runway {rwy} requires an airfield" or continue);
            if line_up(params, &mut data.targets, &rwy, airfield, ground, &conf) {
                bevy::log::info!("{callsign} lined up on runway {rwy}");
                radio.send(
                    data.entity,
                    callsign,
                    format!("lined up runway {rwy}"),
                    Class::VerboseInfo,
                );
                params.status = Status::LinedUp(rwy);
            }
            continue;
        }

        data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });

        if matches!(params.status, Status::Taxiing)
            && !params.ias.is_positive()
            && let Some(Instruction::ExpectRunway(rwy)) =
                data.instructions.0.iter().map(|q| &q.instruction).find(|instr| {
                    matches!(instr, Instruction::ExpectRunway(_))
                })
            && is_holding_short(params, rwy, airfield, ground)
        {
            let rwy = rwy.clone();
            radio.send(
                data.entity,
                callsign,
                format!("holding short runway {rwy}, ready for departure"),
                Class::NeedAck,
            );
            params.status = Status::Ready(rwy);
        }
    }
}
