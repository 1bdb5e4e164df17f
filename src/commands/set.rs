//! `wakepoint set <field> <value> [...]` — update persisted preferences.
//!
//! Writes go straight to the preference file; a running session picks them
//! up through the file watcher.

use anyhow::{Context, Result};

use crate::config;

pub fn run(fields: &[(String, String)]) -> Result<()> {
    let mut preferences = config::load().context("failed to load preferences")?;
    let before = preferences;

    for (field, value) in fields {
        preferences
            .set_field(field, value)
            .with_context(|| format!("cannot set '{field}'"))?;
    }

    if preferences == before {
        log_block_start!("Preferences unchanged");
        log_end!();
        return Ok(());
    }

    config::store(&preferences).context("failed to write preferences")?;

    log_block_start!("Preferences updated");
    for (field, value) in fields {
        log_indented!("{field} = {value}");
    }
    log_indented!("Stored in {}", config::config_path().display());
    log_end!();
    Ok(())
}
