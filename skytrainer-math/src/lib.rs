#![allow(
    clippy::excessive_precision,
    clippy::unreadable_literal,
    reason = "we don't really want to read the mathematical constants in this file."
)]

mod units;
pub use units::*;

mod alg2d;
pub use alg2d::*;

mod geodetic;
pub use geodetic::{EARTH_RADIUS, GeoPosition};

mod physics;
pub use physics::*;

mod wind;
pub use wind::{GroundVector, Wind};

#[cfg(test)]
mod tests;

/// Moves `current` towards `target` by at most `max_step`.
///
/// Returns `target` exactly once it is within reach,
/// so that repeated calls with the same target are idempotent.
#[must_use]
pub fn approach<T>(current: T, target: T, max_step: T) -> T
where
    T: Copy + PartialOrd + std::ops::Add<Output = T> + std::ops::Sub<Output = T>,
{
    if current < target {
        let next = current + max_step;
        if next >= target { target } else { next }
    } else {
        let next = current - max_step;
        if next <= target { target } else { next }
    }
}
