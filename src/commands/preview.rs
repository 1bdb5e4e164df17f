//! `wakepoint preview <profile>` — play one alarm sound instance.

use anyhow::Result;

use crate::alarm::{AlarmController, RodioOutput, SoundProfile};
use crate::platform::NoopVibrator;

pub fn run(profile: &str) -> Result<()> {
    let profile: SoundProfile = profile
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    log_block_start!("Previewing '{profile}'");

    let mut alarm = AlarmController::new(
        Box::new(RodioOutput::new()),
        Box::new(NoopVibrator),
        profile,
    );
    alarm.preview(profile)?;

    // play returns while the device renders; linger until the instance ends.
    std::thread::sleep(profile.duration() + std::time::Duration::from_millis(200));

    log_end!();
    Ok(())
}
