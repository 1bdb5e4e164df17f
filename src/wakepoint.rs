//! Application coordinator that manages the complete lifecycle of a
//! tracking session.
//!
//! This module handles resource acquisition, initialization, and
//! orchestration of the core loop. It manages:
//! - Preference loading
//! - Lock file management for single-instance enforcement
//! - Destination resolution (literal coordinate or geocoded query)
//! - Position source selection (GeoClue2 or a replay script)
//! - Capability detection (audio, vibration, wake lock)
//! - Signal handler and key reader setup
//!
//! The `Wakepoint` struct uses a builder pattern so the CLI dispatcher can
//! express the different startup contexts (live run, simulate run).

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::{
    alarm::{AlarmController, RodioOutput},
    args::DestinationArg,
    config,
    constants::DEFAULT_ALARM_RADIUS_M,
    core::{Core, CoreParams},
    events::{setup_event_hub, spawn_key_reader},
    geo::Coordinate,
    instance,
    platform::{detect_vibrator, detect_wake_lock},
    position::{PositionSource, geoclue::GeoClueSource, replay::ReplaySource},
    providers::{Geocoder, Router},
    tracking::{Phase, TrackingSession},
    utils::{TerminalGuard, format_distance},
};

/// Inter-fix interval when replaying a script.
const REPLAY_INTERVAL: Duration = Duration::from_secs(1);

/// Builder for configuring and running a wakepoint session.
pub struct Wakepoint {
    debug_enabled: bool,
    destination: Option<DestinationArg>,
    radius_m: f64,
    replay: Option<PathBuf>,
}

impl Wakepoint {
    /// Create a runner with defaults matching a normal run.
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            destination: None,
            radius_m: DEFAULT_ALARM_RADIUS_M,
            replay: None,
        }
    }

    /// Set the destination (coordinate or free-text query).
    pub fn with_destination(mut self, destination: Option<DestinationArg>) -> Self {
        self.destination = destination;
        self
    }

    /// Override the wake-up radius in meters.
    pub fn with_radius(mut self, radius_m: Option<f64>) -> Self {
        if let Some(radius_m) = radius_m {
            self.radius_m = radius_m;
        }
        self
    }

    /// Replay a fix script instead of watching live positions.
    pub fn with_replay(mut self, replay: Option<PathBuf>) -> Self {
        self.replay = replay;
        self
    }

    /// Execute the session: setup, arm, run the loop, clean up.
    pub fn run(self) -> Result<()> {
        log_version!();
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled - showing detailed operations");
        }

        // Load preferences first; a corrupt file is a startup error.
        let preferences = match config::load() {
            Ok(preferences) => preferences,
            Err(e) => {
                log_error_exit!("Preferences failed");
                eprintln!("{e:?}");
                std::process::exit(1);
            }
        };
        preferences.log_summary();

        // Replay runs are sandboxed rehearsals; they skip the lock so they
        // can coexist with a live session.
        let lock_info = if self.replay.is_none() {
            Some(instance::acquire_lock()?.context("lock not acquired")?)
        } else {
            None
        };

        // Position source before destination: the too-close check wants the
        // current position, and a missing location service should surface
        // before any network calls.
        let mut position: Box<dyn PositionSource> = match &self.replay {
            Some(script) => {
                log_block_start!("Replaying fixes from {}", script.display());
                Box::new(ReplaySource::from_path(script, REPLAY_INTERVAL)?.shutdown_when_done())
            }
            None => Box::new(GeoClueSource::connect()?),
        };

        let mut session = TrackingSession::new(self.radius_m)?;

        // Initial one-shot fix, best-effort: without it the proximity check
        // is simply skipped until the first watch update.
        match position.current_fix() {
            Ok(fix) => {
                session.record_fix(fix);
                if self.debug_enabled {
                    log_pipe!();
                    log_debug!("Initial position: {}", fix.coordinate);
                }
            }
            Err(e) => {
                log_pipe!();
                log_warning!("No initial position: {e}");
                log_indented!("Proximity checks resume with the first live fix");
            }
        }

        // Resolve and set the destination; business-rule rejections
        // (too close, bad radius) surface here before any tracking starts.
        let target = self.resolve_destination()?;
        session.set_target(target)?;
        log_block_start!("Destination set: {target}");

        // Advisory route overlay; never blocks or affects the session.
        if self.replay.is_none()
            && let Some(fix) = session.current()
        {
            match Router::new() {
                Ok(router) => {
                    let trace = router.route(fix.coordinate, target);
                    if !trace.is_empty() {
                        log_indented!("Route trace: {} points", trace.len());
                    }
                    session.set_route(trace);
                }
                Err(e) => log_debug!("Router unavailable: {e}"),
            }
        }

        // Event plumbing: OS signals, preference watcher, keypress intents.
        let hub = setup_event_hub()?;
        if let Err(e) = config::start_preference_watcher(hub.sender.clone(), self.debug_enabled)
            && self.debug_enabled
        {
            log_pipe!();
            log_warning!("Preference watching unavailable: {e}");
            log_indented!("Hot reload disabled; changes apply on restart");
        }

        let _term = TerminalGuard::new().context("failed to initialize terminal features")?;
        spawn_key_reader(hub.sender.clone(), hub.running.clone());

        let alarm = AlarmController::new(
            Box::new(RodioOutput::new()),
            detect_vibrator(self.debug_enabled),
            preferences.sound,
        );
        let wake_lock = detect_wake_lock(self.debug_enabled);

        let core = Core::new(CoreParams {
            session,
            position,
            alarm,
            wake_lock,
            hub,
            debug_enabled: self.debug_enabled,
        });
        let final_session = core.run()?;

        if self.replay.is_some() {
            log_block_start!("Replay finished in state '{}'", final_session.phase().name());
            if let Some(distance_m) = final_session.last_distance_m() {
                log_indented!("Final distance: {}", format_distance(distance_m));
            }
            if matches!(final_session.phase(), Phase::Alarm { .. }) {
                log_indented!("The alarm would be ringing");
            }
        }

        if let Some((lock_file, lock_path)) = lock_info {
            instance::release_lock(lock_file, &lock_path);
        }
        log_end!();
        Ok(())
    }

    /// Turn the CLI destination into a coordinate, geocoding when needed.
    fn resolve_destination(&self) -> Result<Coordinate> {
        match &self.destination {
            Some(DestinationArg::Coordinate(coordinate)) => Ok(*coordinate),
            Some(DestinationArg::Query(query)) => {
                log_block_start!("Resolving destination '{query}'...");
                let geocoder = Geocoder::new()?;
                let results = geocoder
                    .search(query)
                    .with_context(|| format!("destination lookup for '{query}' failed"))?;
                let hit = results
                    .into_iter()
                    .next()
                    .with_context(|| format!("no locations found for '{query}'"))?;
                log_indented!("{}", hit.name);
                if let Some(address) = &hit.address {
                    log_indented!("{address}");
                }
                Ok(hit.coordinate)
            }
            None => anyhow::bail!(
                "no destination given; pass --dest <lat,lon | query> or run 'wakepoint search'"
            ),
        }
    }
}
