//! The core event loop.
//!
//! One thread consumes every asynchronous source — position fixes, user
//! intents, alarm ticks, preference changes, OS signals — and drives the
//! tracking state machine. Handlers run to completion relative to each
//! other, so the state machine needs no locks, only its own phase guards.
//!
//! Resource discipline per tracking session: the position watch and the
//! wake-prevention lock are acquired exactly once on arming and released
//! exactly once on every exit path (cancel, dismiss, shutdown). Cancellation
//! tears the watch down *before* the phase flips to Idle, so a queued update
//! can never re-trigger the alarm after a stop — by the time it is consumed,
//! the session is Idle and the fix is bookkeeping only.

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::alarm::AlarmController;
use crate::config;
use crate::constants::FIX_MAX_AGE;
use crate::events::{Event, EventHub, Intent};
use crate::platform::{WakeLock, WakeLockGuard};
use crate::position::{Fix, PositionSource, WatchGuard};
use crate::tracking::{FixOutcome, Phase, TrackingError, TrackingSession};
use crate::utils::format_distance;

/// Poll granularity of the consumer loop; bounds shutdown latency when the
/// queue is quiet.
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Dependencies for the core loop, bundled to keep the constructor readable.
pub struct CoreParams {
    pub session: TrackingSession,
    pub position: Box<dyn PositionSource>,
    pub alarm: AlarmController,
    pub wake_lock: Box<dyn WakeLock>,
    pub hub: EventHub,
    pub debug_enabled: bool,
}

/// Owns the state machine and every platform resource for its lifetime.
pub struct Core {
    session: TrackingSession,
    position: Box<dyn PositionSource>,
    alarm: AlarmController,
    wake_lock: Box<dyn WakeLock>,
    hub: EventHub,
    debug_enabled: bool,
    watch: Option<WatchGuard>,
    wake_guard: Option<Box<dyn WakeLockGuard>>,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        Self {
            session: params.session,
            position: params.position,
            alarm: params.alarm,
            wake_lock: params.wake_lock,
            hub: params.hub,
            debug_enabled: params.debug_enabled,
            watch: None,
            wake_guard: None,
        }
    }

    /// Arm the session and run until quit or shutdown.
    ///
    /// Returns the final session state so simulate mode can report it.
    pub fn run(mut self) -> Result<TrackingSession> {
        self.arm()?;

        while self.hub.running.load(Ordering::SeqCst) {
            match self.hub.receiver.recv_timeout(RECV_TIMEOUT) {
                Ok(event) => self.handle_event(event),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        self.teardown();
        Ok(self.session)
    }

    /// Idle → Tracking, with resource acquisition.
    ///
    /// The state machine validates first (pure, no side effects); only then
    /// are the watch and wake lock taken. If the watch cannot start, the
    /// transition is rolled back and the error surfaces — tracking is simply
    /// not armed.
    fn arm(&mut self) -> Result<()> {
        self.session.start_tracking()?;

        // Audio unlock happens inside this user-initiated action, ahead of
        // any alarm playback.
        if let Err(e) = self.alarm.prime() {
            log_pipe!();
            log_warning!("Audio output unavailable: {e}");
            log_indented!("The alarm will signal by vibration only");
        }

        match self.position.watch(self.hub.sender.clone()) {
            Ok(guard) => self.watch = Some(guard),
            Err(e) => {
                // Roll the pure transition back; no session without a watch.
                let _ = self.session.stop_tracking();
                return Err(e.into());
            }
        }

        // Best-effort: absence never blocks the transition.
        match self.wake_lock.acquire("tracking a wake-up destination") {
            Ok(guard) => self.wake_guard = Some(guard),
            Err(e) => {
                log_pipe!();
                log_warning!("Could not prevent device sleep: {e}");
            }
        }

        log_block_start!("Tracking started ({})", self.position.name());
        if let Some(distance_m) = self.session.last_distance_m() {
            log_indented!("Distance to destination: {}", format_distance(distance_m));
        }
        log_indented!("Wake-up radius: {:.0}m", self.session.radius_m());
        log_indented!("Keys: [s]top, [r]estart, [d]ismiss alarm, [q]uit");
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Fix(fix) => self.handle_fix(fix),
            Event::PositionLost(reason) => {
                log_pipe!();
                log_warning!("Position update failed: {reason}");
                log_indented!("The watch stays active; tracking continues");
            }
            Event::AlarmTick => self.alarm.on_tick(),
            Event::Intent(intent) => self.handle_intent(intent),
            Event::PreferencesChanged => self.reload_preferences(),
            Event::Shutdown => {
                self.hub.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn handle_fix(&mut self, fix: Fix) {
        // Strict staleness check at the consumption point: the platform's
        // max-age hint is advisory, an old queued fix must not fire alarms.
        if fix.is_stale(Utc::now(), FIX_MAX_AGE) {
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Discarding stale fix from {}", fix.timestamp);
            }
            return;
        }

        match self.session.record_fix(fix) {
            FixOutcome::Arrived { distance_m } => {
                log_block_start!(
                    "Destination reached: {} ≤ {:.0}m radius",
                    format_distance(distance_m),
                    self.session.radius_m()
                );
                log_decorated!("Wake up! Press [d] to dismiss the alarm");
                self.alarm.start(&self.hub.sender);
            }
            FixOutcome::Updated { distance_m } => {
                log_decorated!("Distance to destination: {}", format_distance(distance_m));
            }
            FixOutcome::Noted => {}
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::StopTracking => {
                if !matches!(self.session.phase(), Phase::Tracking { .. }) {
                    self.reject(&TrackingError::NotTracking);
                    return;
                }
                // Watch teardown precedes the phase flip; see module docs.
                self.release_resources();
                let _ = self.session.stop_tracking();
                log_block_start!("Tracking cancelled, destination retained");
                log_indented!("Press [r] to re-arm or [q] to quit");
            }
            Intent::DismissAlarm => {
                if !matches!(self.session.phase(), Phase::Alarm { .. }) {
                    self.reject(&TrackingError::NoAlarm);
                    return;
                }
                self.alarm.stop();
                self.release_resources();
                let _ = self.session.dismiss_alarm();
                log_block_start!("Alarm dismissed");
                log_indented!("Press [r] to re-arm or [q] to quit");
            }
            Intent::StartTracking => {
                if let Err(e) = self.arm() {
                    log_pipe!();
                    log_warning!("Could not start tracking: {e}");
                }
            }
            Intent::Quit => {
                self.hub.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Business-rule rejections: surfaced, never state-changing.
    fn reject(&self, error: &TrackingError) {
        log_pipe!();
        log_warning!("{error}");
    }

    fn reload_preferences(&mut self) {
        match config::load() {
            Ok(preferences) => {
                if preferences.sound != self.alarm.profile() {
                    log_block_start!("Alarm sound changed to '{}'", preferences.sound);
                    self.alarm.set_profile(preferences.sound);
                }
            }
            Err(e) => {
                log_pipe!();
                log_warning!("Ignoring preference change: {e}");
            }
        }
    }

    /// Release the per-session resources (watch, wake lock) exactly once.
    fn release_resources(&mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.cancel();
        }
        self.wake_guard = None;
    }

    /// Cleanup on every way out of the loop.
    fn teardown(&mut self) {
        self.alarm.stop();
        self.release_resources();
        log_block_start!("Session ended ({})", self.session.phase().name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::SoundProfile;
    use crate::alarm::test_support::CountingOutput;
    use crate::geo::Coordinate;
    use crate::platform::{NoopVibrator, NoopWakeLock};
    use crate::position::{MockPositionSource, PositionError};
    use crate::tracking::Phase;

    #[test]
    fn arm_rolls_back_the_transition_when_the_watch_cannot_start() {
        crate::logger::Log::set_enabled(false);

        let mut position = MockPositionSource::new();
        position.expect_name().return_const("mock");
        position
            .expect_watch()
            .returning(|_| Err(PositionError::Unavailable("service offline".into())));

        let mut session = TrackingSession::new(500.0).unwrap();
        session.set_target(Coordinate::new(10.0, 10.0)).unwrap();

        let alarm = AlarmController::new(
            Box::new(CountingOutput::new()),
            Box::new(NoopVibrator),
            SoundProfile::Classic,
        );

        let mut core = Core::new(CoreParams {
            session,
            position: Box::new(position),
            alarm,
            wake_lock: Box::new(NoopWakeLock),
            hub: EventHub::new(),
            debug_enabled: false,
        });

        // Watch start failure: surfaced, and no half-armed session remains.
        assert!(core.arm().is_err());
        assert_eq!(core.session.phase(), Phase::Idle);
        assert!(core.watch.is_none());
        assert!(core.wake_guard.is_none());
    }
}
