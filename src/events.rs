//! Unified event plumbing feeding the core loop.
//!
//! Three kinds of asynchronous sources exist in this application: the
//! continuous position watch, user intents (keypresses, OS signals), and
//! timers (the alarm repeat ticker). All of them are funneled through one
//! mpsc channel and consumed by a single thread, so the tracking state
//! machine never needs a lock — handlers run to completion relative to each
//! other.

use anyhow::{Context, Result};
use crossterm::event::{self as term_event, Event as TermEvent, KeyCode, KeyModifiers};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender, channel},
    thread,
    time::Duration,
};

use crate::position::Fix;

/// A user action forwarded into the tracking state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// Arm (or re-arm after a stop) with the retained destination.
    StartTracking,
    /// Cancel the current tracking session.
    StopTracking,
    /// Silence and clear a ringing alarm.
    DismissAlarm,
    /// Leave the application.
    Quit,
}

/// Unified message type for everything the core loop consumes.
#[derive(Debug)]
pub enum Event {
    /// A position update from the active watch.
    Fix(Fix),
    /// Non-fatal error inside the position stream; the watch stays alive.
    PositionLost(String),
    /// A user intent (keypress or CLI-originated).
    Intent(Intent),
    /// Alarm repeat timer fired; play one more signal instance if still ringing.
    AlarmTick,
    /// The preference file changed on disk.
    PreferencesChanged,
    /// Termination request (SIGINT/SIGTERM/SIGHUP).
    Shutdown,
}

/// Shared channel endpoints plus the process-wide running flag.
pub struct EventHub {
    /// Cleared when the application should wind down.
    pub running: Arc<AtomicBool>,
    pub sender: Sender<Event>,
    pub receiver: Receiver<Event>,
}

impl EventHub {
    /// Create a hub without any OS signal wiring (tests, simulate mode).
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            sender,
            receiver,
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Set up an event hub with SIGINT/SIGTERM/SIGHUP routed into the queue.
///
/// A background thread translates each delivered signal into
/// [`Event::Shutdown`] and clears the running flag so that worker threads
/// blocked outside the channel also notice.
pub fn setup_event_hub() -> Result<EventHub> {
    let hub = EventHub::new();

    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;

    let running = hub.running.clone();
    let sender = hub.sender.clone();
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            log_pipe!();
            log_decorated!("Received signal {signal}, shutting down...");
            running.store(false, Ordering::SeqCst);
            let _ = sender.send(Event::Shutdown);
        }
    });

    Ok(hub)
}

/// Spawn the keypress reader translating terminal input into intents.
///
/// Expects the terminal to already be in raw mode (see
/// [`crate::utils::TerminalGuard`]). The reader polls so it can observe the
/// running flag and exit promptly on shutdown.
pub fn spawn_key_reader(sender: Sender<Event>, running: Arc<AtomicBool>) {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            match term_event::poll(Duration::from_millis(250)) {
                Ok(true) => {}
                Ok(false) => continue,
                // No terminal available (piped stdin, service unit): intents
                // still arrive via OS signals, so just stop reading.
                Err(_) => break,
            }

            let Ok(TermEvent::Key(key)) = term_event::read() else {
                continue;
            };

            let intent = match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(Intent::Quit)
                }
                KeyCode::Char('q') => Some(Intent::Quit),
                KeyCode::Char('s') => Some(Intent::StopTracking),
                KeyCode::Char('d') => Some(Intent::DismissAlarm),
                KeyCode::Char('r') => Some(Intent::StartTracking),
                _ => None,
            };

            if let Some(intent) = intent
                && sender.send(Event::Intent(intent)).is_err()
            {
                break;
            }
        }
    });
}
