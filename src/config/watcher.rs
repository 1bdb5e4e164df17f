//! File watching for hot preference reloading.
//!
//! Watches the preference file's directory and forwards debounced change
//! notifications into the event queue, so a `wakepoint set sound chime` from
//! another terminal retunes a running session without a restart.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode,
    Watcher,
};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::events::Event;

/// Editors and `store()` write in multiple steps; coalesce the burst.
const DEBOUNCE_MS: u64 = 500;

/// Start watching the preference file for changes.
///
/// Spawns a background thread owning the watcher; it emits
/// [`Event::PreferencesChanged`] at most once per debounce window. Returns
/// an error when the watch cannot be established (callers degrade to
/// reload-on-restart).
pub fn start_preference_watcher(sender: Sender<Event>, debug_enabled: bool) -> Result<()> {
    let config_path = super::config_path();
    let watch_dir = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .context("preference path has no parent directory")?;

    if !watch_dir.exists() {
        // Nothing to watch yet; preferences will be picked up on restart
        // once the first `set` creates the directory.
        if debug_enabled {
            log_pipe!();
            log_debug!("No preference directory yet, hot reload disabled");
        }
        return Ok(());
    }

    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<NotifyEvent, notify::Error>| {
            if let Ok(event) = res {
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
                        let _ = tx.send(event);
                    }
                    _ => {}
                }
            }
        },
        NotifyConfig::default(),
    )
    .context("failed to create file watcher")?;

    // Watching the directory (not the file) survives the rename-over-write
    // pattern editors use.
    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_dir.display()))?;

    if debug_enabled {
        log_pipe!();
        log_debug!("Watching preferences: {}", config_path.display());
    }

    thread::spawn(move || {
        // Keep the watcher alive for the lifetime of the thread.
        let _watcher = watcher;
        let file_name = config_path.file_name().map(|n| n.to_os_string());

        while let Ok(event) = rx.recv() {
            let relevant = event.paths.iter().any(|p| {
                p.file_name().map(|n| n.to_os_string()) == file_name
            });
            if !relevant {
                continue;
            }

            // Swallow the rest of the write burst.
            thread::sleep(Duration::from_millis(DEBOUNCE_MS));
            while rx.try_recv().is_ok() {}

            if sender.send(Event::PreferencesChanged).is_err() {
                break;
            }
        }
    });

    Ok(())
}
