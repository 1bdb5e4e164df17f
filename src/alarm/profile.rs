//! Alarm sound profiles.
//!
//! Each profile is a fixed waveform recipe — oscillator shape, frequency
//! curve, gain envelope and duration — selected by the user but never edited
//! at runtime. The synthesis itself lives in [`crate::alarm::synth`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Named alarm sound recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundProfile {
    /// Short pitched-down square-wave beep, ~0.5s.
    Classic,
    /// Two-tone sine decay (a major third), ~1.5s.
    Chime,
    /// Rising sawtooth sweep, ~0.4s.
    Urgent,
}

impl SoundProfile {
    pub const ALL: [SoundProfile; 3] =
        [SoundProfile::Classic, SoundProfile::Chime, SoundProfile::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            SoundProfile::Classic => "classic",
            SoundProfile::Chime => "chime",
            SoundProfile::Urgent => "urgent",
        }
    }

    /// Length of one synthesized instance.
    pub fn duration(&self) -> Duration {
        match self {
            SoundProfile::Classic => Duration::from_millis(500),
            SoundProfile::Chime => Duration::from_millis(1500),
            SoundProfile::Urgent => Duration::from_millis(400),
        }
    }

    /// Repeat period while the alarm is ringing.
    ///
    /// Longer than the profile's own duration so consecutive instances never
    /// overlap.
    pub fn repeat_period(&self) -> Duration {
        match self {
            SoundProfile::Chime => Duration::from_millis(2000),
            _ => Duration::from_millis(1000),
        }
    }
}

impl Default for SoundProfile {
    fn default() -> Self {
        SoundProfile::Classic
    }
}

impl fmt::Display for SoundProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(SoundProfile::Classic),
            "chime" => Ok(SoundProfile::Chime),
            "urgent" => Ok(SoundProfile::Urgent),
            other => Err(format!(
                "unknown sound profile '{other}' (expected classic, chime or urgent)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_period_exceeds_duration() {
        for profile in SoundProfile::ALL {
            assert!(profile.repeat_period() > profile.duration());
        }
    }

    #[test]
    fn round_trips_through_strings() {
        for profile in SoundProfile::ALL {
            assert_eq!(profile.as_str().parse::<SoundProfile>(), Ok(profile));
        }
        assert!("klaxon".parse::<SoundProfile>().is_err());
    }
}
