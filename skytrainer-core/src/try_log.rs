//! Logging accessors for ECS lookups that are expected to succeed.
//!
//! A failed lookup here means an internal invariant is broken.
//! The simulation logs it and skips the affected agent for the tick.

use std::any::type_name;
use std::fmt;

use bevy::ecs::change_detection::Mut;
use bevy::ecs::component::{Component, Mutable};
use bevy::ecs::entity::Entity;
use bevy::ecs::world::World;

/// Unwraps an `Option` or `Result`, logging an error and evaluating `$never` on failure.
#[macro_export]
macro_rules! try_log {
    (
        $expr:expr,
        expect $must:literal $(
            (
                $($must_args:expr),* $(,)?
            )
        )?
        or $never:expr
    ) => {
        {
            #[allow(clippy::question_mark)]
            if let Some(value) = $crate::try_log::TryLog::convert_or_log(
                $expr,
                format_args!($must, $($($must_args),*)?),
            ) {
                value
            } else {
                $never
            }
        }
    }
}

pub use try_log;

pub trait WorldExt {
    fn log_get<T: Component>(&self, entity: Entity) -> Option<&T>;

    fn log_get_mut<T: Component<Mutability = Mutable>>(
        &mut self,
        entity: Entity,
    ) -> Option<Mut<'_, T>>;
}

impl WorldExt for World {
    fn log_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let value = self.get::<T>(entity);
        if value.is_none() {
            bevy::log::error!("Agent {entity:?} is missing component {}", type_name::<T>());
        }
        value
    }

    fn log_get_mut<T: Component<Mutability = Mutable>>(
        &mut self,
        entity: Entity,
    ) -> Option<Mut<'_, T>> {
        let value = self.get_mut::<T>(entity);
        if value.is_none() {
            bevy::log::error!("Agent {entity:?} is missing component {}", type_name::<T>());
        }
        value
    }
}

/// An expression that can be used for `$expr` in [`try_log!`](crate::try_log!).
pub trait TryLog<T> {
    /// Returns the successful result as `Some`, or logs the error with `must`.
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T>;
}

impl<T> TryLog<T> for Option<T> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        if this.is_none() {
            bevy::log::error!("{must}");
        }
        this
    }
}

impl<T, E: fmt::Display> TryLog<T> for Result<T, E> {
    fn convert_or_log(this: Self, must: impl fmt::Display) -> Option<T> {
        this.map_err(|err| bevy::log::error!("{must}: {err}")).ok()
    }
}
