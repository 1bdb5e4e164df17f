//! Scripted position source for simulate mode and tests.
//!
//! A replay script is a plain text file, one fix per line:
//!
//! ```text
//! # latitude,longitude[,age_seconds]
//! 10.0180,10.0
//! 10.0072,10.0
//! 10.0036,10.0
//! ```
//!
//! The optional third field backdates the fix's timestamp, which lets a
//! script exercise the staleness rejection path. Fixes are delivered at a
//! fixed interval; the watch worker ends quietly when the script runs out.

use chrono::Utc;
use std::{
    collections::VecDeque,
    path::Path,
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::Sender,
    thread,
    time::Duration,
};

use crate::events::Event;
use crate::geo::Coordinate;
use crate::position::{Fix, PositionError, PositionSource, WatchGuard};

/// One scripted fix: where, and how old the fix claims to be at delivery.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedFix {
    pub coordinate: Coordinate,
    pub age: Duration,
}

/// Position source that replays a fixed script of coordinates.
pub struct ReplaySource {
    fixes: VecDeque<ScriptedFix>,
    interval: Duration,
    shutdown_when_done: bool,
}

impl ReplaySource {
    pub fn new(fixes: Vec<ScriptedFix>, interval: Duration) -> Self {
        Self {
            fixes: fixes.into(),
            interval,
            shutdown_when_done: false,
        }
    }

    /// Post [`Event::Shutdown`] once the script is exhausted, so a replay
    /// run ends by itself instead of waiting for a quit key.
    pub fn shutdown_when_done(mut self) -> Self {
        self.shutdown_when_done = true;
        self
    }

    /// Replay coordinates as fresh fixes at the given interval.
    pub fn from_coordinates(coords: Vec<Coordinate>, interval: Duration) -> Self {
        Self::new(
            coords
                .into_iter()
                .map(|coordinate| ScriptedFix {
                    coordinate,
                    age: Duration::ZERO,
                })
                .collect(),
            interval,
        )
    }

    /// Load a replay script from disk.
    pub fn from_path(path: &Path, interval: Duration) -> Result<Self, PositionError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PositionError::Unavailable(format!("{}: {e}", path.display())))?;
        let fixes = parse_script(&text)
            .map_err(|e| PositionError::Unavailable(format!("{}: {e}", path.display())))?;
        if fixes.is_empty() {
            return Err(PositionError::Unavailable(format!(
                "{}: script contains no fixes",
                path.display()
            )));
        }
        Ok(Self::new(fixes, interval))
    }

    fn materialize(scripted: ScriptedFix) -> Fix {
        let timestamp = Utc::now()
            - chrono::Duration::from_std(scripted.age).unwrap_or_else(|_| chrono::Duration::zero());
        Fix {
            coordinate: scripted.coordinate,
            accuracy_m: Some(5.0),
            timestamp,
        }
    }
}

fn parse_script(text: &str) -> Result<Vec<ScriptedFix>, String> {
    let mut fixes = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.splitn(3, ',');
        let lat = parts.next().unwrap_or_default();
        let lon = parts
            .next()
            .ok_or_else(|| format!("line {}: expected 'lat,lon[,age]'", idx + 1))?;
        let coordinate: Coordinate = format!("{lat},{lon}")
            .parse()
            .map_err(|e| format!("line {}: {e}", idx + 1))?;

        let age = match parts.next() {
            Some(age) => Duration::from_secs_f64(
                age.trim()
                    .parse::<f64>()
                    .map_err(|_| format!("line {}: invalid age '{}'", idx + 1, age.trim()))?,
            ),
            None => Duration::ZERO,
        };

        fixes.push(ScriptedFix { coordinate, age });
    }
    Ok(fixes)
}

impl PositionSource for ReplaySource {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn current_fix(&mut self) -> Result<Fix, PositionError> {
        // One-shot acquisition peeks the first scripted fix; the watch still
        // delivers the complete script.
        self.fixes
            .front()
            .copied()
            .map(Self::materialize)
            .ok_or(PositionError::Timeout(crate::constants::FIX_TIMEOUT))
    }

    fn watch(&mut self, sink: Sender<Event>) -> Result<WatchGuard, PositionError> {
        let fixes = std::mem::take(&mut self.fixes);
        let interval = self.interval;
        let shutdown_when_done = self.shutdown_when_done;
        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();

        let worker = thread::spawn(move || {
            for scripted in fixes {
                if !flag.load(Ordering::SeqCst) {
                    return;
                }
                if sink.send(Event::Fix(Self::materialize(scripted))).is_err() {
                    return;
                }
                thread::sleep(interval);
            }
            if shutdown_when_done && flag.load(Ordering::SeqCst) {
                let _ = sink.send(Event::Shutdown);
            }
        });

        Ok(WatchGuard::new(active, worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn parses_script_with_comments_and_ages() {
        let script = "# header\n10.0,20.0\n\n10.5,20.5,12\n";
        let fixes = parse_script(script).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].coordinate, Coordinate::new(10.0, 20.0));
        assert_eq!(fixes[0].age, Duration::ZERO);
        assert_eq!(fixes[1].age, Duration::from_secs(12));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_script("10.0").is_err());
        assert!(parse_script("10.0,not-a-number").is_err());
        assert!(parse_script("10.0,20.0,soon").is_err());
    }

    #[test]
    fn watch_delivers_script_in_order() {
        let coords = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.5),
            Coordinate::new(0.0, 1.0),
        ];
        let mut source =
            ReplaySource::from_coordinates(coords.clone(), Duration::from_millis(1));
        let (tx, rx) = channel();
        let mut guard = source.watch(tx).unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_millis(200)) {
            if let Event::Fix(fix) = event {
                seen.push(fix.coordinate);
            }
            if seen.len() == coords.len() {
                break;
            }
        }
        guard.cancel();
        assert_eq!(seen, coords);
    }

    #[test]
    fn backdated_fixes_are_stale() {
        let mut source = ReplaySource::new(
            vec![ScriptedFix {
                coordinate: Coordinate::new(1.0, 1.0),
                age: Duration::from_secs(60),
            }],
            Duration::from_millis(1),
        );
        let fix = source.current_fix().unwrap();
        assert!(fix.is_stale(Utc::now(), crate::constants::FIX_MAX_AGE));
    }
}
