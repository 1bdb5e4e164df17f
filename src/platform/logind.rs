//! Wake-prevention lock backed by systemd-logind inhibitors.
//!
//! `org.freedesktop.login1.Manager.Inhibit` hands back a file descriptor;
//! the inhibitor stays in force for exactly as long as the descriptor is
//! open. Closing it on guard drop gives the release-on-every-exit-path
//! behavior the tracking session requires.

use anyhow::{Context, Result};
use zbus::blocking::Connection;
use zbus::zvariant::OwnedFd;

use super::{WakeLock, WakeLockGuard};

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1"
)]
trait LogindManager {
    /// Returns a descriptor that holds the inhibitor while open.
    fn inhibit(&self, what: &str, who: &str, why: &str, mode: &str) -> zbus::Result<OwnedFd>;
}

/// Wake lock port talking to systemd-logind on the system bus.
pub struct LogindWakeLock {
    connection: Connection,
}

impl LogindWakeLock {
    pub fn connect() -> Result<Self> {
        let connection = Connection::system().context("failed to connect to system D-Bus")?;
        // Probe the manager so missing logind surfaces at detection time.
        LogindManagerProxyBlocking::new(&connection)
            .context("systemd-logind is not available")?;
        Ok(Self { connection })
    }
}

struct InhibitorGuard {
    // Held only for its Drop: closing the fd releases the inhibitor.
    _fd: OwnedFd,
}

impl WakeLockGuard for InhibitorGuard {}

impl WakeLock for LogindWakeLock {
    fn name(&self) -> &'static str {
        "logind"
    }

    fn acquire(&self, reason: &str) -> Result<Box<dyn WakeLockGuard>> {
        let manager = LogindManagerProxyBlocking::new(&self.connection)
            .context("failed to create logind proxy")?;
        let fd = manager
            .inhibit("sleep:idle", "wakepoint", reason, "block")
            .context("logind Inhibit call failed")?;
        Ok(Box::new(InhibitorGuard { _fd: fd }))
    }
}
