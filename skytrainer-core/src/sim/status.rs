//! Phase of flight.

use std::fmt;
use std::time::Duration;

use math::Heading;

/// The current phase of an agent.
///
/// Ground phases are only used while the agent is on the surface.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Status {
    /// Moving or stopped on the ground, not associated with a runway.
    Taxiing,
    /// Stopped short of the runway, ready for departure.
    Ready(String),
    /// Aligned on the runway, waiting for takeoff clearance.
    LinedUp(String),
    /// Accelerating on the runway for takeoff.
    TakeoffRoll(String),
    /// Decelerating on the runway after touchdown.
    ///
    /// The runway is `None` after turning off into terrain without a ground network.
    LandingRoll(Option<String>),
    Airborne,
    /// Flying a holding pattern.
    Holding {
        /// Heading of the outbound leg.
        outbound:  Heading,
        /// Remaining time on the outbound leg, or `None` while flying inbound to the fix.
        remaining: Option<Duration>,
    },
    /// Established on the final approach course.
    Landing(String),
}

impl Status {
    #[must_use]
    pub fn is_on_ground(&self) -> bool {
        matches!(
            self,
            Self::Taxiing
                | Self::Ready(_)
                | Self::LinedUp(_)
                | Self::TakeoffRoll(_)
                | Self::LandingRoll(_)
        )
    }

    /// Whether the agent is airborne and accepts vectors.
    ///
    /// An agent on final approach is flying but not available for vectors.
    #[must_use]
    pub fn is_airborne(&self) -> bool { matches!(self, Self::Airborne | Self::Holding { .. }) }

    /// Whether an agent may be constructed in this phase.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Taxiing | Self::Ready(_) | Self::Airborne)
    }

    /// Whether the agent is rolling on a runway.
    #[must_use]
    pub fn is_rolling(&self) -> bool { matches!(self, Self::TakeoffRoll(_) | Self::LandingRoll(_)) }

    /// The runway associated with the phase.
    #[must_use]
    pub fn runway(&self) -> Option<&str> {
        match self {
            Self::Ready(rwy)
            | Self::LinedUp(rwy)
            | Self::TakeoffRoll(rwy)
            | Self::Landing(rwy)
            | Self::LandingRoll(Some(rwy)) => Some(rwy),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Taxiing => write!(f, "TAXIING"),
            Self::Ready(rwy) => write!(f, "READY({rwy})"),
            Self::LinedUp(rwy) => write!(f, "LINED_UP({rwy})"),
            Self::TakeoffRoll(rwy) => write!(f, "RWY_TKOF({rwy})"),
            Self::LandingRoll(Some(rwy)) => write!(f, "RWY_LDG({rwy})"),
            Self::LandingRoll(None) => write!(f, "RWY_LDG"),
            Self::Airborne => write!(f, "AIRBORNE"),
            Self::Holding { outbound, .. } => write!(f, "HLDG({outbound})"),
            Self::Landing(rwy) => write!(f, "LANDING({rwy})"),
        }
    }
}

/// Stage of a runway excursion during the landing roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Excursion {
    /// Normal rollout.
    #[default]
    None,
    /// Veering off the runway while braking.
    Skidding,
    /// Stopped off the runway.
    Stopped,
}
