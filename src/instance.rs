//! Lock file management for single-instance enforcement.
//!
//! Two concurrent tracking sessions would fight over the audio device and
//! double-fire alarms, so only one wakepoint session runs per user. The lock
//! file lives in the runtime directory and records the owning PID; stale
//! locks from crashed processes are detected and cleaned up.

use anyhow::Result;
use fs2::FileExt;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use crate::utils;

fn lock_path() -> String {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    format!("{runtime_dir}/wakepoint.lock")
}

/// Acquire the single-instance lock.
///
/// # Returns
/// - `Ok(Some((file, path)))` — lock acquired; keep the file open for the
///   session's lifetime.
/// - `Err(_)` — another live session holds the lock, or the lock file could
///   not be created.
pub fn acquire_lock() -> Result<Option<(File, String)>> {
    let path = lock_path();

    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    match lock_file.try_lock_exclusive() {
        Ok(()) => {
            write_owner(&mut lock_file)?;
            Ok(Some((lock_file, path)))
        }
        Err(_) => {
            handle_lock_conflict(&path)?;

            // Conflict resolved (stale lock removed): retry once.
            let mut retry = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path)?;
            match retry.try_lock_exclusive() {
                Ok(()) => {
                    write_owner(&mut retry)?;
                    Ok(Some((retry, path)))
                }
                Err(e) => {
                    anyhow::bail!("failed to acquire lock after cleanup: {e}");
                }
            }
        }
    }
}

fn write_owner(lock_file: &mut File) -> Result<()> {
    lock_file.set_len(0)?;
    lock_file.seek(SeekFrom::Start(0))?;
    writeln!(lock_file, "{}", std::process::id())?;
    lock_file.flush()?;
    Ok(())
}

/// Resolve a lock conflict: remove stale locks, refuse live ones.
fn handle_lock_conflict(path: &str) -> Result<()> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        // Lock vanished between attempts; treat as resolved.
        Err(_) => return Ok(()),
    };

    let pid = match content.trim().lines().next().and_then(|l| l.parse::<u32>().ok()) {
        Some(pid) => pid,
        None => {
            log_warning!("Lock file format invalid, removing");
            let _ = std::fs::remove_file(path);
            return Ok(());
        }
    };

    if !utils::is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(path);
        return Ok(());
    }

    log_pipe!();
    log_error!("wakepoint is already tracking (PID: {pid})");
    log_indented!("Stop the running session before starting a new one");
    anyhow::bail!("another wakepoint instance is running (PID {pid})")
}

/// Release the lock and delete its file.
pub fn release_lock(lock_file: File, path: &str) {
    let _ = fs2::FileExt::unlock(&lock_file);
    drop(lock_file);
    let _ = std::fs::remove_file(path);
}
