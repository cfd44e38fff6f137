//! Executes queued instructions of airborne agents, and reconciles the queue after each tick.

use std::marker::PhantomData;
use std::time::Duration;

use bevy::app::{self, App, Plugin};
use bevy::ecs::entity::Entity;
use bevy::ecs::message::MessageWriter;
use bevy::ecs::query::QueryData;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Commands, Query, Res};
use bevy::time::{self, Time};
use bevy_mod_config::{AppExt, Config, ConfigFieldFor, Manager, ReadConfig};
use math::{
    Angle, GeoPosition, Heading, Length, Position, Speed, TrackOffset, TurnDirection, Wind,
    track_offset, true_airspeed,
};

use super::SystemSets;
use super::agent::{
    Agent, AltitudeTarget, Flags, FlightParams, Goal, HeadingTarget, Instructions, SpeedTarget,
    Targets,
};
use super::aircraft_type::Performance;
use super::airfield::Airfield;
use super::comm::{AgentRemoved, RemovalReason};
use super::env::Environment;
use super::instr::{Instruction, Kind};
use super::status::Status;

pub struct Plug<M>(PhantomData<M>);

impl<M> Default for Plug<M> {
    fn default() -> Self { Self(PhantomData) }
}

impl<M: Manager + Default> Plugin for Plug<M>
where
    Conf: ConfigFieldFor<M>,
{
    fn build(&self, app: &mut App) {
        app.init_config::<M, Conf>("core:agent");
        app.add_systems(app::Update, follow_system.in_set(SystemSets::Action));
        app.add_systems(
            app::Update,
            (prune_system, remove_system).chain().in_set(SystemSets::Reconcile),
        );
    }
}

#[derive(Config)]
#[config(expose(read))]
pub struct Conf {
    /// Multiplier on turn, climb and acceleration rates during intercepts,
    /// go-arounds and taxiing.
    #[config(default = 2.0, min = 1.0, max = 5.0)]
    pub fast_factor:          f32,
    /// Probability of taking each of several available runway turn-offs.
    /// The last candidate is always taken.
    #[config(default = 0.5, min = 0.0, max = 1.0)]
    pub turn_off_probability: f32,
    /// Height above the field of the climb after takeoff or a missed approach.
    #[config(default = Length::from_feet(3000.), min = Length::from_feet(500.), max = Length::from_feet(10000.))]
    pub initial_climb:        Length<f32>,
    /// Duration of the outbound leg of a holding pattern.
    #[config(default = Duration::from_secs(60))]
    pub hold_leg:             Duration,
    #[config(default = Speed::from_knots(15.), min = Speed::from_knots(5.), max = Speed::from_knots(30.))]
    pub taxi_speed:           Speed<f32>,
    /// Speed to brake to on the runway before turning off.
    #[config(default = Speed::from_knots(20.), min = Speed::from_knots(5.), max = Speed::from_knots(40.))]
    pub roll_speed:           Speed<f32>,
    /// Distance within which a taxi node or parking position is considered reached.
    #[config(default = Length::from_meters(20.), min = Length::from_meters(1.), max = Length::from_meters(100.))]
    pub taxi_arrival:         Length<f32>,
    /// Distance within which a navpoint is considered reached.
    #[config(default = Length::from_nm(1.), min = Length::from_nm(0.1), max = Length::from_nm(5.))]
    pub direct_to_arrival:    Length<f32>,
    /// Turn-offs within this angle from the runway heading are preferred.
    #[config(default = Angle::from_degrees(45.), min = Angle::ZERO, max = Angle::RIGHT)]
    pub max_turn_off_angle:   Angle,
}

/// Lateral offset within which a course is captured.
const CAPTURE_CROSS_TRACK: Length<f32> = Length::from_nm(0.5);
/// Heading difference within which a course is captured.
const CAPTURE_HEADING: Angle = Angle::from_degrees(45.);
/// Heading correction per nautical mile of cross-track offset when tracking a course.
const CORRECTION_PER_NM: f32 = 60.;
/// Maximum heading correction when tracking a course.
const MAX_CORRECTION: f32 = 30.;
/// Outside this difference from the target heading, a holding pattern turn is forced.
const HOLD_FORCED_TURN: Angle = Angle::from_degrees(30.);
/// The outbound timer of a holding pattern only runs within this difference from the outbound heading.
const HOLD_OUTBOUND_ALIGNED: Angle = Angle::from_degrees(10.);

const SPEED_LIMIT_ALTITUDE: Position<f32> = Position::from_feet(10000.);
const SPEED_LIMIT: Speed<f32> = Speed::from_knots(250.);
const DESCENT_SPEED: Speed<f32> = Speed::from_knots(220.);

/// Guidance onto a straight course.
#[derive(Debug, Clone, Copy)]
pub struct CourseGuidance {
    pub offset:   TrackOffset,
    /// Whether the agent is close enough to the course to follow it.
    pub captured: bool,
    /// The heading that converges onto the course.
    pub steer:    Heading,
}

/// Computes the guidance onto the course through `origin` along `track`.
#[must_use]
pub fn course_guidance(
    position: GeoPosition,
    heading: Heading,
    origin: GeoPosition,
    track: Heading,
) -> CourseGuidance {
    let offset = track_offset(Position::ORIGIN, track, position.to_local(origin));
    let captured =
        offset.cross.abs() < CAPTURE_CROSS_TRACK && heading.is_within(track, CAPTURE_HEADING);
    let correction =
        (offset.cross.into_nm() * CORRECTION_PER_NM).clamp(-MAX_CORRECTION, MAX_CORRECTION);
    CourseGuidance { offset, captured, steer: track - Angle::from_degrees(correction) }
}

/// Heading to fly for a course over the ground, correcting for wind.
fn heading_for_course(course: Heading, wind: Option<Wind>, tas: Speed<f32>) -> Heading {
    wind.and_then(|wind| wind.heading_for_course(course, tas)).unwrap_or(course)
}

#[derive(QueryData)]
#[query_data(mutable)]
struct FollowQueryData {
    agent:        &'static Agent,
    params:       &'static mut FlightParams,
    goal:         &'static Goal,
    flags:        &'static Flags,
    instructions: &'static mut Instructions,
    targets:      &'static mut Targets,
    performance:  &'static Performance,
}

fn follow_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<Conf>,
    environment: Res<Environment>,
    airfield: Option<Res<Airfield>>,
    mut query: Query<FollowQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let dt = time.delta();
    let qnh = environment.qnh();

    for mut data in &mut query {
        *data.targets = Targets::default();
        if !data.params.status.is_airborne() {
            continue;
        }

        let params = &mut *data.params;
        let wind = environment.wind(params.position, params.altitude);
        let tas = true_airspeed(params.ias, params.altitude);

        let mut remove_kinds = Vec::new();
        let mut capture = None;

        for queued in &mut data.instructions.0 {
            match &mut queued.instruction {
                Instruction::HeadingVector { heading, turn } => {
                    data.targets.heading = Some(HeadingTarget { heading: *heading, turn: *turn, fast: false });
                }
                Instruction::AltitudeVector(spec) => {
                    data.targets.altitude = Some(AltitudeTarget {
                        altitude: spec.pressure_altitude(qnh),
                        fast:     data.flags.going_around,
                    });
                }
                Instruction::SpeedVector(speed) => {
                    data.targets.speed = Some(SpeedTarget { ias: *speed, fast: false });
                }
                Instruction::DirectTo(navpoint) => {
                    let course = params.position.bearing_to(navpoint.position);
                    data.targets.heading =
                        Some(HeadingTarget::normal(heading_for_course(course, wind, tas)));
                }
                Instruction::FollowRoute(route) => {
                    while let Some(next) = route.first() {
                        if params.position.distance(next.position) > conf.direct_to_arrival {
                            break;
                        }
                        bevy::log::debug!("{} passed {}", data.agent.callsign, next.code);
                        route.remove(0);
                    }
                    if let Some(next) = route.first() {
                        let course = params.position.bearing_to(next.position);
                        data.targets.heading =
                            Some(HeadingTarget::normal(heading_for_course(course, wind, tas)));
                    }
                }
                Instruction::Hold { fix, turn } => {
                    data.targets.heading = Some(fly_hold(
                        params,
                        fix.position,
                        *turn,
                        HoldConf { leg: conf.hold_leg, arrival: conf.direct_to_arrival, dt },
                        |course| heading_for_course(course, wind, tas),
                    ));
                }
                Instruction::InterceptNavaid { navaid, radial } => {
                    let track = if params.heading.is_within(*radial, Angle::RIGHT) {
                        *radial
                    } else {
                        radial.opposite()
                    };
                    let guidance =
                        course_guidance(params.position, params.heading, navaid.position, track);
                    if guidance.captured {
                        data.targets.heading = Some(HeadingTarget::fast(guidance.steer));
                        remove_kinds.push(Kind::HeadingVector);
                    }
                }
                Instruction::InterceptLocalizer(rwy) => {
                    let Some((runway, _)) = airfield.as_ref().and_then(|airfield| airfield.runway(rwy))
                    else {
                        continue;
                    };
                    let guidance = course_guidance(
                        params.position,
                        params.heading,
                        runway.threshold,
                        runway.heading,
                    );
                    if guidance.captured && guidance.offset.along.is_negative() {
                        data.targets.heading = Some(HeadingTarget::fast(guidance.steer));
                        remove_kinds.push(Kind::HeadingVector);
                        capture = Some(rwy.clone());
                    }
                }
                _ => {}
            }
        }

        if data.instructions.has(Kind::ClearedApproach)
            && let Some(rwy) = data.instructions.expected_runway().map(str::to_owned)
            && let Some((runway, _)) = airfield.as_ref().and_then(|airfield| airfield.runway(&rwy))
        {
            let guidance =
                course_guidance(params.position, params.heading, runway.threshold, runway.heading);
            let navigating =
                data.instructions.0.iter().any(|q| q.instruction.kind().is_heading_family());
            if !navigating {
                data.targets.heading = Some(HeadingTarget::fast(guidance.steer));
            }
            if guidance.captured && guidance.offset.along.is_negative() {
                capture = Some(rwy);
            }
        }

        if let Some(rwy) = capture
            && data.instructions.has(Kind::ClearedApproach)
        {
            bevy::log::info!("{} established on final runway {rwy}", data.agent.callsign);
            remove_kinds.extend([Kind::HeadingVector, Kind::Hold, Kind::DirectTo, Kind::InterceptNavaid]);
            params.status = Status::Landing(rwy);
        }

        data.instructions.remove_kinds(&remove_kinds);

        if data.targets.speed.is_none() {
            data.targets.speed = Some(SpeedTarget {
                ias:  default_speed(params, data.goal, &data.instructions, data.performance, qnh),
                fast: false,
            });
        }
    }
}

/// The speed flown without a speed vector.
fn default_speed(
    params: &FlightParams,
    goal: &Goal,
    instructions: &Instructions,
    performance: &Performance,
    qnh: math::Pressure,
) -> Speed<f32> {
    let mut speed = performance.cruise_ias;
    if params.altitude < SPEED_LIMIT_ALTITUDE {
        speed = speed.min(SPEED_LIMIT);
    }

    let descending = instructions.0.iter().any(|q| match &q.instruction {
        Instruction::AltitudeVector(spec) => spec.pressure_altitude(qnh) < params.altitude,
        _ => false,
    });
    if goal.is_landing() && descending {
        speed = speed.min(DESCENT_SPEED);
    }
    speed
}

struct HoldConf {
    leg:     Duration,
    arrival: Length<f32>,
    dt:      Duration,
}

/// Advances the holding pattern at `fix` and returns the heading to fly.
///
/// The agent flies direct to the fix, then the outbound leg for the configured duration,
/// then back to the fix, turning in the pattern direction at both ends.
fn fly_hold(
    params: &mut FlightParams,
    fix: GeoPosition,
    turn: TurnDirection,
    conf: HoldConf,
    correct_wind: impl Fn(Heading) -> Heading,
) -> HeadingTarget {
    let at_fix = params.position.distance(fix) <= conf.arrival;

    let (outbound, remaining) = match params.status {
        Status::Holding { outbound, remaining } => (outbound, remaining),
        _ => {
            if !at_fix {
                let course = params.position.bearing_to(fix);
                return HeadingTarget::normal(correct_wind(course));
            }
            (params.heading.opposite(), None)
        }
    };

    let remaining = match remaining {
        Some(remaining) => {
            if params.heading.is_within(outbound, HOLD_OUTBOUND_ALIGNED) {
                Some(remaining.saturating_sub(conf.dt))
            } else {
                Some(remaining)
            }
        }
        None if at_fix => Some(conf.leg),
        None => None,
    };
    let remaining = remaining.filter(|remaining| !remaining.is_zero());
    params.status = Status::Holding { outbound, remaining };

    let desired = match remaining {
        Some(_) => outbound,
        None => correct_wind(params.position.bearing_to(fix)),
    };
    let forced = !params.heading.is_within(desired, HOLD_FORCED_TURN);
    HeadingTarget { heading: desired, turn: forced.then_some(turn), fast: false }
}

#[derive(QueryData)]
#[query_data(mutable)]
struct PruneQueryData {
    params:       &'static mut FlightParams,
    flags:        &'static mut Flags,
    instructions: &'static mut Instructions,
}

fn prune_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<Conf>,
    environment: Res<Environment>,
    mut query: Query<PruneQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let conf = conf.read();
    let qnh = environment.qnh();

    for mut data in &mut query {
        let params = &mut *data.params;
        data.instructions.0.retain(|q| !q.instruction.is_done(params, conf.direct_to_arrival));

        if matches!(params.status, Status::Holding { .. }) && !data.instructions.has(Kind::Hold) {
            params.status = Status::Airborne;
        }

        if data.flags.going_around {
            let climb_target = data.instructions.0.iter().find_map(|q| match &q.instruction {
                Instruction::AltitudeVector(spec) => Some(spec.pressure_altitude(qnh)),
                _ => None,
            });
            if climb_target.is_none_or(|target| params.altitude >= target) {
                data.flags.going_around = false;
            }
        }

        if !params.status.is_rolling() {
            data.flags.backtrack_requested = false;
            data.flags.unable_to_vacate = false;
        }
    }
}

fn remove_system(
    time: Res<Time<time::Virtual>>,
    environment: Res<Environment>,
    mut commands: Commands,
    mut removed: MessageWriter<AgentRemoved>,
    query: Query<(Entity, &Agent, &FlightParams, &Flags)>,
) {
    if time.is_paused() {
        return;
    }

    for (entity, agent, params, flags) in &query {
        let reason = if flags.handed_over {
            RemovalReason::HandedOver
        } else if !params.status.is_on_ground() && !environment.in_range(params.position) {
            RemovalReason::OutOfRange
        } else {
            continue;
        };

        bevy::log::info!("Removing {} ({reason})", agent.callsign);
        removed.write(AgentRemoved { agent: entity, callsign: agent.callsign.clone(), reason });
        commands.entity(entity).despawn();
    }
}
