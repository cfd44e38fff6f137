//! Per-tick motion of agents towards their [`Targets`].
//!
//! Rates are fixed and independent of the aircraft type.
//! Targets flagged as fast move at the rate multiplied by the configured fast factor.

use std::time::Duration;

use bevy::app::{self, App, Plugin};
use bevy::ecs::entity::Entity;
use bevy::ecs::query::QueryData;
use bevy::ecs::resource::Resource;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::ecs::system::{Query, Res, ResMut};
use bevy::time::{self, Time};
use bevy_mod_config::ReadConfig;
use math::{
    Accel, AngularSpeed, GeoPosition, GroundVector, Heading, Length, Position, Speed,
    pressure_altitude, true_airspeed,
};

use super::agent::{AltitudeTarget, FlightParams, HeadingTarget, SpeedTarget, Targets};
use super::aircraft_type::Performance;
use super::env::Environment;
use super::{SystemSets, pilot};


/// Maximum turn rate.
pub const TURN_RATE: AngularSpeed = AngularSpeed::from_degrees_per_sec(3.);
/// Maximum climb and descent rate.
pub const VERTICAL_RATE: Speed<f32> = Speed::from_fpm(1800.);
/// Acceleration and deceleration in the air.
pub const AIR_ACCEL: Accel<f32> = Accel::from_knots_per_sec(1.5);
/// Acceleration on the ground.
pub const GROUND_ACCEL: Accel<f32> = Accel::from_knots_per_sec(3.);
/// Deceleration on the ground.
pub const BRAKING: Accel<f32> = Accel::from_knots_per_sec(4.);

pub struct Plug;

impl Plugin for Plug {
    fn build(&self, app: &mut App) {
        app.init_resource::<GroundSnapshot>();
        app.add_systems(
            app::Update,
            (snapshot_system, integrate_system).chain().in_set(SystemSets::Aviate),
        );
    }
}

fn rate_factor(fast: bool, fast_factor: f32) -> f32 { if fast { fast_factor } else { 1. } }

/// Turns `current` towards the target.
#[must_use]
pub fn step_heading(
    current: Heading,
    target: HeadingTarget,
    fast_factor: f32,
    dt: Duration,
) -> Heading {
    let max_turn = TURN_RATE * dt * rate_factor(target.fast, fast_factor);
    match target.turn {
        Some(dir) => current.restricted_turn_in(target.heading, dir, max_turn),
        None => current.restricted_turn(target.heading, max_turn),
    }
}

/// Climbs or descends `current` towards the target pressure altitude.
#[must_use]
pub fn step_altitude(
    current: Position<f32>,
    target: AltitudeTarget,
    fast_factor: f32,
    dt: Duration,
) -> Position<f32> {
    let max_change = VERTICAL_RATE * dt * rate_factor(target.fast, fast_factor);
    Position(math::approach(current.0, target.altitude.0, max_change))
}

/// Accelerates or decelerates `current` towards the target.
#[must_use]
pub fn step_speed(
    current: Speed<f32>,
    target: SpeedTarget,
    on_ground: bool,
    fast_factor: f32,
    dt: Duration,
) -> Speed<f32> {
    let factor = rate_factor(target.fast, fast_factor);
    let (accel, decel) = if on_ground { (GROUND_ACCEL, BRAKING) } else { (AIR_ACCEL, AIR_ACCEL) };

    if current < target.ias {
        (current + accel * dt * factor).min(target.ias)
    } else {
        (current - decel * dt * factor).max(target.ias)
    }
}

/// Whether moving from `from` to `candidate` closes in on another grounded agent
/// within the combined separation radii.
pub fn separation_blocks(
    from: GeoPosition,
    candidate: GeoPosition,
    radius: Length<f32>,
    others: impl IntoIterator<Item = (GeoPosition, Length<f32>)>,
) -> bool {
    others.into_iter().any(|(other, other_radius)| {
        let new_distance = candidate.distance(other);
        new_distance < radius + other_radius && new_distance < from.distance(other)
    })
}

/// Positions of grounded agents before any agent moves in the current tick.
#[derive(Resource, Default)]
pub struct GroundSnapshot {
    pub agents: Vec<GroundedAgent>,
}

#[derive(Debug, Clone, Copy)]
pub struct GroundedAgent {
    pub entity:   Entity,
    pub position: GeoPosition,
    /// Separation radius from the wake category.
    pub radius:   Length<f32>,
}

fn snapshot_system(
    time: Res<Time<time::Virtual>>,
    mut snapshot: ResMut<GroundSnapshot>,
    query: Query<(Entity, &FlightParams, &Performance)>,
) {
    if time.is_paused() {
        return;
    }

    snapshot.agents.clear();
    snapshot.agents.extend(query.iter().filter(|(_, params, _)| params.status.is_on_ground()).map(
        |(entity, params, performance)| GroundedAgent {
            entity,
            position: params.position,
            radius: performance.wake.ground_radius(),
        },
    ));
}

#[derive(QueryData)]
#[query_data(mutable)]
struct IntegrateQueryData {
    entity:      Entity,
    params:      &'static mut FlightParams,
    targets:     &'static Targets,
    performance: &'static Performance,
}

fn integrate_system(
    time: Res<Time<time::Virtual>>,
    conf: ReadConfig<pilot::Conf>,
    environment: Res<Environment>,
    snapshot: Res<GroundSnapshot>,
    mut query: Query<IntegrateQueryData>,
) {
    if time.is_paused() {
        return;
    }
    let dt = time.delta();
    if dt.is_zero() {
        return;
    }
    let conf = conf.read();
    let fast_factor = conf.fast_factor;

    for mut data in &mut query {
        let params = &mut *data.params;
        let on_ground = params.status.is_on_ground();

        if let Some(target) = data.targets.heading {
            params.heading = step_heading(params.heading, target, fast_factor, dt);
        }
        if let Some(target) = data.targets.speed {
            params.ias = step_speed(params.ias, target, on_ground, fast_factor, dt);
        }

        if on_ground {
            params.altitude = pressure_altitude(
                environment.ground_elevation(params.position),
                environment.qnh(),
            );
        } else if let Some(target) = data.targets.altitude {
            params.altitude = step_altitude(params.altitude, target, fast_factor, dt);
        }

        let vector = if on_ground || data.targets.ignore_wind {
            GroundVector::still_air(params.heading, params.ias)
        } else {
            let tas = true_airspeed(params.ias, params.altitude);
            match environment.wind(params.position, params.altitude) {
                Some(wind) => wind.ground_vector(params.heading, tas),
                None => GroundVector::still_air(params.heading, tas),
            }
        };

        let distance = vector.speed * dt;
        if !distance.is_positive() {
            continue;
        }
        let candidate = params.position.moved(vector.course, distance);

        if on_ground {
            let others = snapshot
                .agents
                .iter()
                .filter(|other| other.entity != data.entity)
                .map(|other| (other.position, other.radius));
            if separation_blocks(
                params.position,
                candidate,
                data.performance.wake.ground_radius(),
                others,
            ) {
                bevy::log::trace!("Agent {:?} holds for ground separation", data.entity);
                continue;
            }
        }

        params.position = candidate;
    }
}
