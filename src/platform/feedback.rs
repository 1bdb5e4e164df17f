//! Vibration via feedbackd (`org.sigxcpu.Feedback`).
//!
//! feedbackd is the haptics daemon on mainline Linux phones. It works in
//! terms of named events rather than raw motor patterns, so the alarm's
//! pattern maps onto the standard `alarm-clock-elapsed` event and the
//! precise on/off timing is left to the device's feedback theme.

use anyhow::{Context, Result};
use std::collections::HashMap;
use zbus::blocking::Connection;
use zbus::zvariant::Value;

use super::Vibrator;

#[zbus::proxy(
    interface = "org.sigxcpu.Feedback",
    default_service = "org.sigxcpu.Feedback",
    default_path = "/org/sigxcpu/Feedback"
)]
trait Feedback {
    fn trigger_feedback(
        &self,
        application: &str,
        event: &str,
        hints: HashMap<&str, Value<'_>>,
        timeout: i32,
    ) -> zbus::Result<u32>;
}

const APPLICATION_ID: &str = "wakepoint";
const ALARM_EVENT: &str = "alarm-clock-elapsed";

/// Vibration port talking to feedbackd on the session bus.
pub struct FeedbackdVibrator {
    connection: Connection,
}

impl FeedbackdVibrator {
    pub fn connect() -> Result<Self> {
        let connection = Connection::session().context("failed to connect to session D-Bus")?;
        FeedbackProxyBlocking::new(&connection).context("feedbackd is not available")?;
        Ok(Self { connection })
    }
}

impl Vibrator for FeedbackdVibrator {
    fn name(&self) -> &'static str {
        "feedbackd"
    }

    fn vibrate(&self, pattern_ms: &[u64]) -> Result<()> {
        let proxy = FeedbackProxyBlocking::new(&self.connection)
            .context("failed to create feedbackd proxy")?;
        // Cap the event at the pattern's total length; -1 would let the
        // theme's native duration run arbitrarily long.
        let total_ms: u64 = pattern_ms.iter().sum();
        proxy
            .trigger_feedback(APPLICATION_ID, ALARM_EVENT, HashMap::new(), total_ms as i32)
            .context("feedbackd TriggerFeedback failed")?;
        Ok(())
    }
}
