//! Agent simulation.
//!
//! Each tick runs the [`SystemSets`] in order:
//! agents first follow their queued instructions and procedures to decide targets,
//! then move towards the targets,
//! then drop instructions that are complete.

use std::marker::PhantomData;

use bevy::app::{self, App, Plugin};
use bevy::ecs::resource::Resource;
use bevy::ecs::schedule::IntoScheduleConfigs;
use bevy::prelude::SystemSet;
use bevy_mod_config::{ConfigFieldFor, Manager};
use itertools::Itertools;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use strum::IntoEnumIterator;

pub mod agent;
pub mod aircraft_type;
pub mod airfield;
pub mod approach;
pub mod comm;
pub mod env;
pub mod ground;
pub mod instr;
pub mod motion;
pub mod pilot;
pub mod snapshot;
pub mod status;
pub mod taxi;


pub struct Plug<M>(PhantomData<M>);

impl<M> Default for Plug<M> {
    fn default() -> Self { Self(PhantomData) }
}

impl<M: Manager + Default> Plugin for Plug<M>
where
    pilot::Conf: ConfigFieldFor<M>,
{
    fn build(&self, app: &mut App) {
        for set in SystemSets::iter() {
            app.configure_sets(app::Update, set.in_set(AllSystemSets));
        }

        for (before, after) in SystemSets::iter().tuple_windows() {
            app.configure_sets(app::Update, before.before(after));
        }

        app.init_resource::<env::Environment>();
        app.init_resource::<aircraft_type::AircraftTypes>();
        app.init_resource::<SimRng>();

        app.add_plugins(comm::Plug);
        app.add_plugins(pilot::Plug::<M>::default());
        app.add_plugins(taxi::Plug);
        app.add_plugins(approach::Plug);
        app.add_plugins(motion::Plug);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet, strum::EnumIter)]
pub enum SystemSets {
    /// Systems executing queued instructions to decide the targets of an agent.
    Action,
    /// Systems executing phase-specific procedures such as taxiing, takeoff and landing.
    /// May override targets decided in [`Action`](SystemSets::Action).
    Procedure,
    /// Systems moving agents towards their targets.
    Aviate,
    /// Systems pruning completed instructions and reconciling phase-dependent state.
    Reconcile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SystemSet)]
pub struct AllSystemSets;

/// Random source for agent decisions such as turn-off selection.
#[derive(Resource)]
pub struct SimRng(pub SmallRng);

impl SimRng {
    /// Creates a reproducible random source.
    #[must_use]
    pub fn seeded(seed: u64) -> Self { Self(SmallRng::seed_from_u64(seed)) }
}

impl Default for SimRng {
    fn default() -> Self { Self(SmallRng::from_rng(&mut rand::rng())) }
}
