//! In-process waveform synthesis for the alarm profiles.
//!
//! Each profile is rendered sample-by-sample as a [`rodio::Source`], so no
//! audio assets ship with the binary. Swept frequencies use incremental
//! phase accumulation; the envelope is evaluated from elapsed time.
//!
//! Recipes:
//! - **Classic**: square wave, 880 Hz dropping exponentially to 440 Hz over
//!   0.1 s, gain 0.5 decaying exponentially to 0.01 across the full 0.5 s.
//! - **Chime**: two sines at 523.25 Hz (C5) and 659.25 Hz (E5), 50 ms linear
//!   attack to 0.5, then exponential decay to near-silence at 1.5 s.
//! - **Urgent**: sawtooth rising linearly 600 → 1200 Hz over 0.3 s, gain 0.3
//!   falling linearly to 0 at 0.4 s.

use std::f32::consts::TAU;
use std::time::Duration;

use rodio::Source;

use crate::alarm::profile::SoundProfile;

pub const SAMPLE_RATE: u32 = 44_100;

/// One synthesized instance of a profile, yielding mono `f32` samples.
pub struct Waveform {
    profile: SoundProfile,
    position: usize,
    total: usize,
    phase_a: f32,
    phase_b: f32,
}

impl Waveform {
    pub fn new(profile: SoundProfile) -> Self {
        let total = (profile.duration().as_secs_f32() * SAMPLE_RATE as f32) as usize;
        Self {
            profile,
            position: 0,
            total,
            phase_a: 0.0,
            phase_b: 0.0,
        }
    }

    fn remaining(&self) -> usize {
        self.total.saturating_sub(self.position)
    }
}

/// Instantaneous oscillator frequencies at time `t` seconds.
fn frequencies(profile: SoundProfile, t: f32) -> (f32, Option<f32>) {
    match profile {
        SoundProfile::Classic => {
            // Exponential glide 880 → 440 over the first 0.1 s, then hold.
            let progress = (t / 0.1).min(1.0);
            (880.0 * 0.5_f32.powf(progress), None)
        }
        SoundProfile::Chime => (523.25, Some(659.25)),
        SoundProfile::Urgent => {
            // Linear rise 600 → 1200 over 0.3 s, then hold.
            let progress = (t / 0.3).min(1.0);
            (600.0 + 600.0 * progress, None)
        }
    }
}

/// Gain envelope at time `t` seconds.
fn envelope(profile: SoundProfile, t: f32) -> f32 {
    match profile {
        SoundProfile::Classic => {
            // 0.5 decaying exponentially to 0.01 across 0.5 s.
            0.5 * (0.01_f32 / 0.5).powf((t / 0.5).min(1.0))
        }
        SoundProfile::Chime => {
            if t < 0.05 {
                // Linear attack to 0.5.
                0.5 * (t / 0.05)
            } else {
                // Exponential decay to 0.001 at 1.5 s.
                0.5 * (0.001_f32 / 0.5).powf(((t - 0.05) / 1.45).min(1.0))
            }
        }
        SoundProfile::Urgent => 0.3 * (1.0 - (t / 0.4)).max(0.0),
    }
}

fn square(phase: f32) -> f32 {
    if phase.rem_euclid(TAU) < TAU / 2.0 { 1.0 } else { -1.0 }
}

fn sawtooth(phase: f32) -> f32 {
    2.0 * (phase.rem_euclid(TAU) / TAU) - 1.0
}

impl Iterator for Waveform {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total {
            return None;
        }
        let t = self.position as f32 / SAMPLE_RATE as f32;
        self.position += 1;

        let (freq_a, freq_b) = frequencies(self.profile, t);
        self.phase_a += TAU * freq_a / SAMPLE_RATE as f32;
        let gain = envelope(self.profile, t);

        let sample = match self.profile {
            SoundProfile::Classic => square(self.phase_a),
            SoundProfile::Chime => {
                // freq_b is always present for the chime.
                let freq_b = freq_b.unwrap_or(freq_a);
                self.phase_b += TAU * freq_b / SAMPLE_RATE as f32;
                (self.phase_a.sin() + self.phase_b.sin()) / 2.0
            }
            SoundProfile::Urgent => sawtooth(self.phase_a),
        };

        Some(sample * gain)
    }
}

impl Source for Waveform {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.remaining())
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.profile.duration())
    }
}
