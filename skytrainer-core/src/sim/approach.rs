//! Runway procedures: takeoff roll, final approach, touchdown and landing rollout.

use bevy::app::{self, App, Plugin};
use bevy::ecs::entity::Entity;
use bevy::ecs::query::QueryData;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Query, Res, ResMut};
use bevy::time::{self, Time};
use bevy_mod_config::ReadConfig;
use math::{
    Angle, AngularSpeed, Length, Position, Speed, TurnDirection, pressure_altitude, track_offset,
};
use rand::Rng;

use super::agent::{
    Agent, AltitudeTarget, Flags, FlightParams, HeadingTarget, Instructions, Maneuver,
    SpeedTarget, Targets, WildRoll,
};
use super::aircraft_type::Performance;
use super::airfield::Airfield;
use super::comm::{Class, Radio};
use super::env::Environment;
use super::ground::GroundNetwork;
use super::instr::{AltitudeSpec, Instruction, Kind};
use super::status::{Excursion, Status};
use super::{SimRng, SystemSets, pilot, taxi};
use crate::try_log;

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.add_systems(
            app::Update,
            (takeoff_system, final_system, rollout_system)
                .chain()
                .in_set(SystemSets::Procedure)
                .after(taxi::taxi_system),
        );
    }
}

/// Distance from the threshold within which the agent touches down.
const TOUCHDOWN_ZONE: Length<f32> = Length::from_nm(0.3);
/// Maximum height above the threshold for touchdown.
const MAX_TOUCHDOWN_HEIGHT: Length<f32> = Length::from_feet(150.);
/// Maximum excess over the landing speed for touchdown.
const MAX_TOUCHDOWN_EXCESS_SPEED: Speed<f32> = Speed::from_knots(20.);
/// Maximum heading deviation from the runway for touchdown.
const MAX_TOUCHDOWN_HEADING: Angle = Angle::from_degrees(10.);
/// Maximum lateral offset from the centerline for touchdown.
const MAX_TOUCHDOWN_CROSS_TRACK: Length<f32> = Length::from_nm(0.05);
/// Height above the threshold below which a landing clearance is required.
const DECISION_HEIGHT: Length<f32> = Length::from_feet(500.);
/// Distance from the threshold where the agent slows to the landing speed.
const SHORT_FINAL: Length<f32> = Length::from_nm(4.);
const APPROACH_SPEED: Speed<f32> = Speed::from_knots(180.);

const SKID_RATE: AngularSpeed = AngularSpeed::from_degrees_per_sec(4.);
/// Turn from the runway heading when rolling off a runway without a ground network.
const WILD_TURN: Angle = Angle::from_degrees(60.);
const WILD_ROLL_DISTANCE: Length<f32> = Length::from_nm(0.05);

/// Instructions that no longer apply after touchdown.
const FLIGHT_KINDS: &[Kind] = &[
    Kind::HeadingVector,
    Kind::AltitudeVector,
    Kind::SpeedVector,
    Kind::DirectTo,
    Kind::FollowRoute,
    Kind::Hold,
    Kind::InterceptNavaid,
    Kind::InterceptLocalizer,
    Kind::ExpectRunway,
];

/// The default climb after takeoff or a missed approach.
fn default_climb(airfield: Option<&Airfield>, conf: &pilot::ConfRead) -> Instruction {
    let elevation = airfield.map_or(Position::SEA_LEVEL, |airfield| airfield.elevation);
    Instruction::AltitudeVector(AltitudeSpec::Feet((elevation + conf.initial_climb).feet().round()))
}

#[derive(QueryData)]
#[query_data(mutable)]
struct ProcedureQueryData {
    entity:       Entity,
    agent:        &'static Agent,
    params:       &'static mut FlightParams,
    flags:        &'static mut Flags,
    instructions: &'static mut Instructions,
    maneuver:     &'static mut Maneuver,
    targets:      &'static mut Targets,
    performance:  &'static Performance,
}

fn takeoff_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<pilot::Conf>,
    airfield: Option<Res<Airfield>>,
    mut radio: Radio,
    mut query: Query<ProcedureQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let airfield = airfield.as_deref();

    for mut data in &mut query {
        let callsign = &data.agent.callsign;
        let params = &mut *data.params;

        if let Status::LinedUp(rwy) = &params.status
            && data.instructions.has(Kind::ClearedTakeoff)
            && !data.instructions.has(Kind::HoldPosition)
        {
            bevy::log::info!("{callsign} starts the takeoff roll on runway {rwy}");
            params.status = Status::TakeoffRoll(rwy.clone());
        }

        let Status::TakeoffRoll(rwy) = &params.status else { continue };
        let (runway, _) = try_log!(
            airfield.and_then(|airfield| airfield.runway(rwy)),
            expect "runway {rwy} of a takeoff roll must exist" or continue
        );

        data.targets.heading = Some(HeadingTarget::normal(runway.heading));
        data.targets.speed = Some(SpeedTarget { ias: data.performance.takeoff_ias, fast: false });

        if params.ias >= data.performance.takeoff_ias {
            params.status = Status::Airborne;
            if !data.instructions.has(Kind::AltitudeVector) {
                data.instructions.push_internal(default_climb(airfield, &conf));
            }
            radio.send(data.entity, callsign, "airborne", Class::VerboseInfo);
        }
    }
}

/// Aborts the landing and climbs away.
fn go_around(
    params: &mut FlightParams,
    flags: &mut Flags,
    instructions: &mut Instructions,
    default_climb: Instruction,
    radio: &mut Radio,
    (entity, callsign): (Entity, &str),
    reason: &str,
) {
    params.status = Status::Airborne;
    instructions.remove_kinds(&[Kind::ClearedApproach, Kind::ClearedToLand, Kind::InterceptLocalizer]);
    if !instructions.has(Kind::AltitudeVector) {
        instructions.push_internal(default_climb);
    }
    flags.going_around = true;
    radio.send(entity, callsign, format!("going around, {reason}"), Class::AnomalyInfo);
}

fn final_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<pilot::Conf>,
    environment: Res<Environment>,
    airfield: Option<Res<Airfield>>,
    mut radio: Radio,
    mut query: Query<ProcedureQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let airfield = airfield.as_deref();
    let qnh = environment.qnh();

    for mut data in &mut query {
        let callsign = &data.agent.callsign;
        let params = &mut *data.params;

        let Status::Landing(rwy) = &params.status else { continue };
        let rwy = rwy.clone();
        let (runway, _) = try_log!(
            airfield.and_then(|airfield| airfield.runway(&rwy)),
            expect "runway {rwy} of a final approach must exist" or continue
        );

        let offset = track_offset(
            math::Position::ORIGIN,
            runway.heading,
            params.position.to_local(runway.threshold),
        );
        let distance = params.position.distance(runway.threshold);
        let height = params.amsl(qnh).height_above(runway.elevation);

        let guidance =
            pilot::course_guidance(params.position, params.heading, runway.threshold, runway.heading);
        let glide = pressure_altitude(runway.elevation + distance * runway.fpa.tan(), qnh);

        data.targets.ignore_wind = true;
        data.targets.heading = Some(HeadingTarget::fast(guidance.steer));
        data.targets.altitude =
            Some(AltitudeTarget { altitude: params.altitude.min(glide), fast: true });
        let speed = if distance > SHORT_FINAL {
            data.performance.cruise_ias.min(APPROACH_SPEED)
        } else {
            data.performance.landing_ias
        };
        data.targets.speed = Some(SpeedTarget { ias: speed, fast: false });

        let failure = if !data.instructions.has(Kind::ClearedToLand) && height < DECISION_HEIGHT {
            Some("not cleared to land")
        } else if distance <= TOUCHDOWN_ZONE || !offset.along.is_negative() {
            if height > MAX_TOUCHDOWN_HEIGHT {
                Some("too high")
            } else if params.ias > data.performance.landing_ias + MAX_TOUCHDOWN_EXCESS_SPEED {
                Some("too fast")
            } else if !params.heading.is_within(runway.heading, MAX_TOUCHDOWN_HEADING)
                || offset.cross.abs() > MAX_TOUCHDOWN_CROSS_TRACK
            {
                Some("not lined up")
            } else {
                bevy::log::info!("{callsign} touched down on runway {rwy}");
                params.status = Status::LandingRoll(Some(rwy.clone()));
                params.altitude = pressure_altitude(runway.elevation, qnh);
                if data.flags.skid_off_runway {
                    params.excursion = Excursion::Skidding;
                }
                data.instructions.remove_kinds(FLIGHT_KINDS);
                data.targets.ignore_wind = false;
                data.targets.altitude = None;
                None
            }
        } else {
            None
        };

        if let Some(reason) = failure {
            go_around(
                params,
                &mut data.flags,
                &mut data.instructions,
                default_climb(airfield, &conf),
                &mut radio,
                (data.entity, callsign),
                reason,
            );
            data.targets.ignore_wind = false;
        }
    }
}

fn rollout_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<pilot::Conf>,
    airfield: Option<Res<Airfield>>,
    ground: Option<Res<GroundNetwork>>,
    mut rng: ResMut<SimRng>,
    mut radio: Radio,
    mut query: Query<ProcedureQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let dt = time.delta();
    let airfield = airfield.as_deref();
    let ground = ground.as_deref();

    for mut data in &mut query {
        let callsign = &data.agent.callsign;
        let params = &mut *data.params;

        let Status::LandingRoll(rwy) = &params.status else { continue };
        if data.instructions.has(Kind::Taxi) {
            continue;
        }
        let rwy = rwy.clone();

        match params.excursion {
            Excursion::Skidding => {
                data.targets.heading = Some(HeadingTarget {
                    heading: params.heading + SKID_RATE * dt,
                    turn:    Some(TurnDirection::Clockwise),
                    fast:    true,
                });
                data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
                if !params.ias.is_positive() {
                    params.excursion = Excursion::Stopped;
                    radio.send(
                        data.entity,
                        callsign,
                        "skidded off the runway, we are stopped",
                        Class::Urgent,
                    );
                }
                continue;
            }
            Excursion::Stopped => {
                data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
                continue;
            }
            Excursion::None => {}
        }

        if let Some(wild) = &mut data.maneuver.wild_roll {
            data.targets.heading = Some(HeadingTarget::normal(wild.heading));
            data.targets.speed = Some(SpeedTarget { ias: conf.roll_speed, fast: false });
            wild.remaining -= params.ias * dt;
            if !wild.remaining.is_positive() {
                bevy::log::info!("{callsign} rolled off the runway");
                data.maneuver.wild_roll = None;
                data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
                params.status = Status::Taxiing;
            }
            continue;
        }

        let Some(rwy) = rwy else {
            bevy::log::warn!("{callsign} is rolling on no runway without a maneuver");
            params.status = Status::Taxiing;
            continue;
        };
        let (runway, spec) = try_log!(
            airfield.and_then(|airfield| airfield.runway(&rwy)),
            expect "runway {rwy} of a landing roll must exist" or continue
        );

        data.targets.heading = Some(HeadingTarget::normal(runway.heading));
        data.targets.speed = Some(SpeedTarget { ias: conf.roll_speed, fast: false });

        if data.flags.backtrack_requested || data.flags.unable_to_vacate {
            data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
            continue;
        }
        if params.ias > conf.roll_speed {
            continue;
        }

        let Some(ground) = ground else {
            bevy::log::debug!("{callsign} turns off runway {rwy} without a ground network");
            params.status = Status::LandingRoll(None);
            data.maneuver.wild_roll = Some(WildRoll {
                heading:   runway.heading + WILD_TURN,
                remaining: WILD_ROLL_DISTANCE,
            });
            continue;
        };

        let rolled = track_offset(
            math::Position::ORIGIN,
            runway.heading,
            params.position.to_local(runway.threshold),
        )
        .along;
        let turn_offs = ground.runway_turn_offs(runway, &spec, conf.max_turn_off_angle, rolled);

        let forward: Vec<_> = turn_offs.forward().collect();
        let chosen = forward.iter().enumerate().find_map(|(index, &turn_off)| {
            let last = index + 1 == forward.len();
            (last || rng.0.random_bool(f64::from(conf.turn_off_probability))).then_some(turn_off)
        });

        if let Some(turn_off) = chosen {
            bevy::log::info!(
                "{callsign} vacates runway {rwy} at {} via {}",
                turn_off.runway_node,
                turn_off.exit_node
            );
            data.instructions.push_internal(Instruction::Taxi {
                route:   vec![turn_off.runway_node, turn_off.exit_node],
                parking: None,
            });
        } else if !turn_offs.backtrack.is_empty() {
            data.flags.backtrack_requested = true;
            data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
            radio.send(
                data.entity,
                callsign,
                format!("request backtrack runway {rwy} to vacate"),
                Class::NeedAck,
            );
        } else {
            data.flags.unable_to_vacate = true;
            data.targets.speed = Some(SpeedTarget { ias: Speed::ZERO, fast: false });
            radio.send(
                data.entity,
                callsign,
                format!("unable to vacate runway {rwy}"),
                Class::Urgent,
            );
        }
    }
}
