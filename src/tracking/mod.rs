//! The tracking state machine.
//!
//! Owns the session's phase, target, live position, radius and route trace,
//! and decides every transition. It performs no I/O: the core loop feeds it
//! intents and fixes and acts on the outcomes, which keeps every rule here
//! directly testable.
//!
//! Phases and transitions:
//!
//! ```text
//!            set_target (idle only, too-close check)
//!                 │
//!   Idle ── start_tracking ──▶ Tracking ── fix within radius ──▶ Alarm
//!    ▲                            │                                │
//!    └──────── stop_tracking ─────┘            dismiss_alarm ──────┘
//! ```
//!
//! Distance bookkeeping lives inside the `Tracking` and `Alarm` variants, so
//! a recorded distance while Idle is unrepresentable. A distance exactly
//! equal to the radius counts as arrived. The target survives `stop_tracking`
//! and `dismiss_alarm` for a quick restart with the same destination.

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::constants::{MAX_ALARM_RADIUS_M, MIN_ALARM_RADIUS_M};
use crate::geo::{Coordinate, distance_meters};
use crate::position::Fix;

/// Session phase, including the per-phase distance bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Setup: choosing a destination and radius.
    Idle,
    /// Watching the position stream, waiting to enter the radius.
    Tracking {
        /// Straight-line distance at the latest accepted fix. `None` until
        /// the first fix arrives after arming.
        last_distance_m: Option<f64>,
    },
    /// The alarm fired. Fixes may keep arriving and updating the distance.
    Alarm {
        /// Distance at the moment the alarm fired (≤ radius by invariant).
        entry_distance_m: f64,
        last_distance_m: f64,
    },
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Tracking { .. } => "tracking",
            Phase::Alarm { .. } => "alarm",
        }
    }
}

/// Business-rule rejections from the state machine. None of these change
/// state; all are surfaced as transient messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("no destination set")]
    NoTarget,
    #[error("already {distance_m:.0}m from the destination, inside the {radius_m:.0}m radius")]
    TooCloseToTarget { distance_m: f64, radius_m: f64 },
    #[error(
        "radius {0:.0}m is outside the allowed range ({min:.0}-{max:.0}m)",
        min = MIN_ALARM_RADIUS_M,
        max = MAX_ALARM_RADIUS_M
    )]
    RadiusOutOfRange(f64),
    #[error("only available while idle")]
    NotIdle,
    #[error("no tracking session to stop")]
    NotTracking,
    #[error("no alarm to dismiss")]
    NoAlarm,
}

/// What a recorded fix means for the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// Bookkeeping only (idle, or no target): nothing to act on.
    Noted,
    /// Distance updated; still outside the radius.
    Updated { distance_m: f64 },
    /// The fix crossed into the radius: the session just entered Alarm.
    Arrived { distance_m: f64 },
}

/// The tracking session: phase, destination, live position, radius, route.
#[derive(Debug)]
pub struct TrackingSession {
    phase: Phase,
    current: Option<Fix>,
    target: Option<Coordinate>,
    radius_m: f64,
    route: Vec<Coordinate>,
}

impl TrackingSession {
    /// Create an idle session. Rejects out-of-range radii.
    pub fn new(radius_m: f64) -> Result<Self, TrackingError> {
        validate_radius(radius_m)?;
        Ok(Self {
            phase: Phase::Idle,
            current: None,
            target: None,
            radius_m,
            route: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.target
    }

    pub fn current(&self) -> Option<Fix> {
        self.current
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Latest computed distance, when the phase carries one.
    pub fn last_distance_m(&self) -> Option<f64> {
        match self.phase {
            Phase::Idle => None,
            Phase::Tracking { last_distance_m } => last_distance_m,
            Phase::Alarm {
                last_distance_m, ..
            } => Some(last_distance_m),
        }
    }

    pub fn route(&self) -> &[Coordinate] {
        &self.route
    }

    /// Attach the advisory route overlay. Display only — never consulted by
    /// alarm decisions.
    pub fn set_route(&mut self, trace: Vec<Coordinate>) {
        self.route = trace;
    }

    /// Change the wake-up radius (idle only).
    pub fn set_radius(&mut self, radius_m: f64) -> Result<(), TrackingError> {
        if self.phase != Phase::Idle {
            return Err(TrackingError::NotIdle);
        }
        validate_radius(radius_m)?;
        self.radius_m = radius_m;
        Ok(())
    }

    /// Choose the destination (idle only).
    ///
    /// Rejected when the known current position is already within the radius
    /// of the new target. Any previously fetched route trace is stale for
    /// the new destination and is cleared.
    pub fn set_target(&mut self, target: Coordinate) -> Result<(), TrackingError> {
        if self.phase != Phase::Idle {
            return Err(TrackingError::NotIdle);
        }
        self.check_not_too_close(target)?;
        self.target = Some(target);
        self.route.clear();
        Ok(())
    }

    /// Arm the session: Idle → Tracking.
    ///
    /// Requires a destination. The too-close rule is re-checked here even
    /// though `set_target` already enforced it: the current position may
    /// have moved between the two calls.
    pub fn start_tracking(&mut self) -> Result<(), TrackingError> {
        if self.phase != Phase::Idle {
            return Err(TrackingError::NotIdle);
        }
        let target = self.target.ok_or(TrackingError::NoTarget)?;
        self.check_not_too_close(target)?;

        // Seed the distance display from the last known position so the
        // reading is live before the first watch update lands.
        let last_distance_m = self
            .current
            .map(|fix| distance_meters(fix.coordinate, target));
        self.phase = Phase::Tracking { last_distance_m };
        Ok(())
    }

    /// Record a position fix.
    ///
    /// Always updates the current position. While Tracking (and,
    /// degenerately, while Alarm if the watch outlives the transition) the
    /// distance is recomputed unconditionally so the display stays live;
    /// crossing the radius while Tracking enters Alarm. Equality counts as
    /// arrival.
    pub fn record_fix(&mut self, fix: Fix) -> FixOutcome {
        self.current = Some(fix);

        let Some(target) = self.target else {
            return FixOutcome::Noted;
        };

        match &mut self.phase {
            Phase::Idle => FixOutcome::Noted,
            Phase::Tracking { last_distance_m } => {
                let distance_m = distance_meters(fix.coordinate, target);
                *last_distance_m = Some(distance_m);
                if distance_m <= self.radius_m {
                    self.phase = Phase::Alarm {
                        entry_distance_m: distance_m,
                        last_distance_m: distance_m,
                    };
                    FixOutcome::Arrived { distance_m }
                } else {
                    FixOutcome::Updated { distance_m }
                }
            }
            Phase::Alarm {
                last_distance_m, ..
            } => {
                let distance_m = distance_meters(fix.coordinate, target);
                *last_distance_m = distance_m;
                FixOutcome::Updated { distance_m }
            }
        }
    }

    /// Explicit cancel: Tracking → Idle.
    ///
    /// Clears the distance bookkeeping but retains target and route so the
    /// same destination can be re-armed immediately.
    pub fn stop_tracking(&mut self) -> Result<(), TrackingError> {
        match self.phase {
            Phase::Tracking { .. } => {
                self.phase = Phase::Idle;
                Ok(())
            }
            _ => Err(TrackingError::NotTracking),
        }
    }

    /// Alarm → Idle, with the same cleanup as `stop_tracking`.
    pub fn dismiss_alarm(&mut self) -> Result<(), TrackingError> {
        match self.phase {
            Phase::Alarm { .. } => {
                self.phase = Phase::Idle;
                Ok(())
            }
            _ => Err(TrackingError::NoAlarm),
        }
    }

    /// The "you'd never fall asleep before waking" rule: refuse a target the
    /// user is already within the radius of, when the current position is
    /// known. Equality is inside (consistent with the arrival tie-break).
    fn check_not_too_close(&self, target: Coordinate) -> Result<(), TrackingError> {
        if let Some(fix) = self.current {
            let distance_m = distance_meters(fix.coordinate, target);
            if distance_m <= self.radius_m {
                return Err(TrackingError::TooCloseToTarget {
                    distance_m,
                    radius_m: self.radius_m,
                });
            }
        }
        Ok(())
    }
}

fn validate_radius(radius_m: f64) -> Result<(), TrackingError> {
    if !radius_m.is_finite()
        || !(MIN_ALARM_RADIUS_M..=MAX_ALARM_RADIUS_M).contains(&radius_m)
    {
        return Err(TrackingError::RadiusOutOfRange(radius_m));
    }
    Ok(())
}
