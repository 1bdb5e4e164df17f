//! # Wakepoint Library
//!
//! Internal library for the wakepoint binary: a location-based wake-up
//! alarm. The user names a destination and a radius; the process follows
//! the live position and fires a repeating audible/tactile alarm once the
//! device comes within the radius.
//!
//! ## Architecture
//!
//! - **Entry Point**: the [`Wakepoint`] coordinator wires resources together
//!   and hands control to the core loop
//! - **Core Loop**: [`core`] consumes one event queue (fixes, intents,
//!   timers) on a single thread
//! - **State Machine**: [`tracking`] owns the Idle → Tracking → Alarm
//!   lifecycle and every transition rule
//! - **Geo Math**: [`geo`] provides the coordinate type and haversine
//!   distance
//! - **Position**: [`position`] abstracts one-shot and continuous location
//!   acquisition (GeoClue2, replay scripts)
//! - **Alarm**: [`alarm`] synthesizes and repeats the alarm signal
//! - **Platform**: [`platform`] wraps best-effort capabilities (wake lock,
//!   vibration) behind no-op-fallback ports
//! - **Providers**: [`providers`] talk to the geocoding and routing services
//! - **Infrastructure**: preferences, single-instance lock, signal handling,
//!   logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

// Public API modules
pub mod alarm;
pub mod args;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod events;
pub mod geo;
pub mod instance;
pub mod platform;
pub mod position;
pub mod providers;
pub mod tracking;
pub mod utils;

// Internal modules
mod wakepoint;

// Re-export for binary
pub use wakepoint::Wakepoint;
