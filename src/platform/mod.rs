//! Best-effort platform capability ports.
//!
//! The wake-prevention lock and the vibration motor are optional: their
//! absence degrades the experience but must never affect tracking
//! correctness. Each capability is a small trait with a D-Bus-backed
//! implementation and a no-op fallback; detection picks whichever the
//! running system actually offers.

pub mod feedback;
pub mod logind;

use anyhow::Result;

/// Capability port preventing automatic display/processor sleep.
pub trait WakeLock {
    fn name(&self) -> &'static str;

    /// Take the lock. The returned guard holds it; dropping releases it.
    fn acquire(&self, reason: &str) -> Result<Box<dyn WakeLockGuard>>;
}

/// Held wake-prevention lock. Dropping the guard releases the lock, which
/// ties the release to every exit path out of the tracking session.
pub trait WakeLockGuard {}

/// Capability port for the device vibration motor.
#[cfg_attr(test, mockall::automock)]
pub trait Vibrator {
    fn name(&self) -> &'static str;

    /// Fire a vibration pattern (milliseconds, alternating on/off).
    /// Best-effort: callers ignore failures beyond logging.
    fn vibrate(&self, pattern_ms: &[u64]) -> Result<()>;
}

/// Fallback wake lock used when no platform mechanism is available.
pub struct NoopWakeLock;

struct NoopGuard;
impl WakeLockGuard for NoopGuard {}

impl WakeLock for NoopWakeLock {
    fn name(&self) -> &'static str {
        "none"
    }

    fn acquire(&self, _reason: &str) -> Result<Box<dyn WakeLockGuard>> {
        Ok(Box::new(NoopGuard))
    }
}

/// Fallback vibrator used when no feedback daemon is available.
pub struct NoopVibrator;

impl Vibrator for NoopVibrator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn vibrate(&self, _pattern_ms: &[u64]) -> Result<()> {
        Ok(())
    }
}

/// Pick the wake-lock implementation for this system.
///
/// Tries the systemd-logind inhibitor interface first; anything else falls
/// back to the no-op port with a single warning.
pub fn detect_wake_lock(debug_enabled: bool) -> Box<dyn WakeLock> {
    match logind::LogindWakeLock::connect() {
        Ok(lock) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Wake-prevention via systemd-logind inhibitor");
            }
            Box::new(lock)
        }
        Err(e) => {
            log_pipe!();
            log_warning!("Wake-prevention unavailable: {e}");
            log_indented!("The device may sleep during tracking");
            Box::new(NoopWakeLock)
        }
    }
}

/// Pick the vibration implementation for this system.
pub fn detect_vibrator(debug_enabled: bool) -> Box<dyn Vibrator> {
    match feedback::FeedbackdVibrator::connect() {
        Ok(vibrator) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Vibration via feedbackd");
            }
            Box::new(vibrator)
        }
        Err(e) => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Vibration unavailable: {e}");
            }
            Box::new(NoopVibrator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_ports_always_succeed() {
        let lock = NoopWakeLock;
        let guard = lock.acquire("test").unwrap();
        drop(guard);

        let vibrator = NoopVibrator;
        assert!(vibrator.vibrate(&[1000, 500, 1000]).is_ok());
    }
}
