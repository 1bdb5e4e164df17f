//! Shared helpers: terminal management and small formatters.

use anyhow::Result;
use crossterm::{cursor, execute, terminal};
use std::io::{IsTerminal, stdout};

/// RAII guard for terminal features used during a tracking session.
///
/// Enables raw mode (so single keypresses arrive without Enter) and hides
/// the cursor; both are restored on drop. In environments without a terminal
/// (service units, piped output) it degrades to a no-op.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        if !std::io::stdin().is_terminal() {
            return Ok(Self { active: false });
        }
        terminal::enable_raw_mode()?;
        crate::logger::Log::set_raw_mode(true);
        let _ = execute!(stdout(), cursor::Hide);
        Ok(Self { active: true })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = execute!(stdout(), cursor::Show);
            let _ = terminal::disable_raw_mode();
            crate::logger::Log::set_raw_mode(false);
        }
    }
}

/// Human-readable distance: meters below 1km, kilometers above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0}m")
    } else {
        format!("{:.2}km", meters / 1000.0)
    }
}

/// Whether a process with the given PID is currently running.
pub fn is_process_running(pid: u32) -> bool {
    std::path::Path::new(&format!("/proc/{pid}")).exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_formatting() {
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(240.4), "240m");
        assert_eq!(format_distance(999.4), "999m");
        assert_eq!(format_distance(1000.0), "1.00km");
        assert_eq!(format_distance(12_345.0), "12.35km");
    }

    #[test]
    fn own_process_is_running() {
        assert!(is_process_running(std::process::id()));
    }
}
