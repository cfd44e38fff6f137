//! The wind triangle.

use crate::{Angle, Heading, Speed};


/// A uniform wind.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Wind {
    /// The direction the wind blows from.
    pub from:  Heading,
    pub speed: Speed<f32>,
}

/// Movement over the ground.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundVector {
    pub course: Heading,
    pub speed:  Speed<f32>,
}

impl GroundVector {
    /// Movement in still air.
    #[must_use]
    pub fn still_air(heading: Heading, true_airspeed: Speed<f32>) -> Self {
        Self { course: heading, speed: true_airspeed }
    }
}

impl Wind {
    pub const CALM: Self = Self { from: Heading::NORTH, speed: Speed::ZERO };

    /// Combines the air vector with this wind.
    ///
    /// Ground speed is `sqrt(w^2 + t^2 - 2wt cos(delta))`
    /// where `delta` is the angle between the wind source and the heading.
    #[must_use]
    pub fn ground_vector(self, heading: Heading, true_airspeed: Speed<f32>) -> GroundVector {
        let tas = true_airspeed.0;
        let wind = self.speed.0;
        if wind <= 0. {
            return GroundVector::still_air(heading, true_airspeed);
        }

        let delta = heading.closest_distance(self.from);
        let ground_speed = (wind * wind + tas * tas - 2. * wind * tas * delta.cos()).max(0.).sqrt();

        // the wind pushes the aircraft towards the side opposite to its source
        let correction =
            Angle::from_radians((-wind * delta.sin()).atan2(tas - wind * delta.cos()));

        GroundVector { course: heading + correction, speed: Speed::new(ground_speed) }
    }

    /// The heading that holds `course` over the ground at the given airspeed.
    ///
    /// Returns `None` if the crosswind component exceeds the airspeed.
    #[must_use]
    pub fn heading_for_course(self, course: Heading, true_airspeed: Speed<f32>) -> Option<Heading> {
        if self.speed.0 <= 0. {
            return Some(course);
        }
        if true_airspeed.0 <= 0. {
            return None;
        }

        let delta = course.closest_distance(self.from);
        let sin_correction = self.speed.0 * delta.sin() / true_airspeed.0;
        if sin_correction.abs() > 1. {
            return None;
        }
        Some(course + Angle::from_radians(sin_correction.asin()))
    }

    /// Headwind component along `heading`. Negative for a tailwind.
    #[must_use]
    pub fn headwind(self, heading: Heading) -> Speed<f32> {
        self.speed * heading.closest_distance(self.from).cos()
    }
}
