//! Alarm signal controller.
//!
//! Produces the audible/tactile alert, independent of tracking state. The
//! controller owns an audio output port and a vibration port; while ringing,
//! a ticker thread posts [`Event::AlarmTick`] into the event queue at the
//! profile's repeat period and the core loop answers each tick with
//! [`AlarmController::on_tick`]. That keeps every `play` call on the single
//! control thread — ticks that arrive after `stop()` find `playing == false`
//! and are ignored, so a dismissed alarm can never beep again.

pub mod profile;
pub mod synth;

use std::{
    sync::mpsc::{Sender, channel},
    thread::JoinHandle,
};
use thiserror::Error;

use crate::constants::VIBRATION_PATTERN_MS;
use crate::events::Event;
use crate::platform::Vibrator;
pub use profile::SoundProfile;

/// Failures producing sound.
#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Port for actually emitting sound.
///
/// `prime` unlocks the output device and must succeed before `play` can; it
/// is idempotent. On platforms without audio the port fails softly and the
/// alarm degrades to vibration only.
#[cfg_attr(test, mockall::automock)]
pub trait AudioOutput {
    fn prime(&mut self) -> Result<(), AlarmError>;

    /// Emit one instance of the profile; returns immediately while the
    /// device plays it out.
    fn play(&mut self, profile: SoundProfile) -> Result<(), AlarmError>;
}

/// Audio output backed by the default rodio device.
pub struct RodioOutput {
    stream: Option<(rodio::OutputStream, rodio::OutputStreamHandle)>,
}

impl RodioOutput {
    pub fn new() -> Self {
        Self { stream: None }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for RodioOutput {
    fn prime(&mut self) -> Result<(), AlarmError> {
        if self.stream.is_none() {
            let pair = rodio::OutputStream::try_default()
                .map_err(|e| AlarmError::OutputUnavailable(e.to_string()))?;
            self.stream = Some(pair);
        }
        Ok(())
    }

    fn play(&mut self, profile: SoundProfile) -> Result<(), AlarmError> {
        self.prime()?;
        let (_, handle) = self
            .stream
            .as_ref()
            .ok_or_else(|| AlarmError::OutputUnavailable("output not primed".into()))?;
        handle
            .play_raw(synth::Waveform::new(profile))
            .map_err(|e| AlarmError::OutputUnavailable(e.to_string()))
    }
}

/// Repeat timer for the ringing alarm. Dropping it stops the ticks.
struct Ticker {
    stop_tx: Sender<()>,
    worker: Option<JoinHandle<()>>,
}

impl Ticker {
    fn spawn(events: Sender<Event>, period: std::time::Duration) -> Self {
        let (stop_tx, stop_rx) = channel::<()>();
        let worker = std::thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                        if events.send(Event::AlarmTick).is_err() {
                            break;
                        }
                    }
                    // Stop requested or controller gone.
                    _ => break,
                }
            }
        });
        Self {
            stop_tx,
            worker: Some(worker),
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The alarm signal controller.
pub struct AlarmController {
    audio: Box<dyn AudioOutput>,
    vibrator: Box<dyn Vibrator>,
    profile: SoundProfile,
    ticker: Option<Ticker>,
}

impl AlarmController {
    pub fn new(
        audio: Box<dyn AudioOutput>,
        vibrator: Box<dyn Vibrator>,
        profile: SoundProfile,
    ) -> Self {
        Self {
            audio,
            vibrator,
            profile,
            ticker: None,
        }
    }

    pub fn profile(&self) -> SoundProfile {
        self.profile
    }

    /// Select the profile used by subsequent signal instances. A ringing
    /// alarm picks the new sound up on its next tick; the repeat period
    /// stays as started.
    pub fn set_profile(&mut self, profile: SoundProfile) {
        self.profile = profile;
    }

    pub fn is_playing(&self) -> bool {
        self.ticker.is_some()
    }

    /// Unlock the audio output ahead of any `start()`. Idempotent.
    pub fn prime(&mut self) -> Result<(), AlarmError> {
        self.audio.prime()
    }

    /// Begin the repeating alarm signal.
    ///
    /// No-op when already ringing. Plays one instance immediately, fires the
    /// vibration pattern once (best-effort), then schedules repeats through
    /// the event queue.
    pub fn start(&mut self, events: &Sender<Event>) {
        if self.ticker.is_some() {
            return;
        }

        if let Err(e) = self.vibrator.vibrate(&VIBRATION_PATTERN_MS) {
            log_debug!("Vibration unavailable: {e}");
        }
        self.play_instance();

        self.ticker = Some(Ticker::spawn(events.clone(), self.profile.repeat_period()));
    }

    /// Halt the repeat timer and mark not-playing. Safe when not playing.
    pub fn stop(&mut self) {
        self.ticker.take();
    }

    /// Answer one repeat tick. Ticks delivered after `stop()` are ignored.
    pub fn on_tick(&mut self) {
        if self.ticker.is_some() {
            self.play_instance();
        }
    }

    /// Play exactly one instance of the given profile, regardless of the
    /// repeating alarm's state.
    pub fn preview(&mut self, profile: SoundProfile) -> Result<(), AlarmError> {
        self.audio.prime()?;
        self.audio.play(profile)
    }

    fn play_instance(&mut self) {
        if let Err(e) = self.audio.play(self.profile) {
            log_warning!("Alarm sound unavailable, signaling by vibration only: {e}");
        }
    }
}

/// Test instrumentation for the audio port.
#[cfg(any(test, feature = "testing-support"))]
pub mod test_support {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{AlarmError, AudioOutput, SoundProfile};

    /// Silent output that counts `play` calls.
    #[derive(Default)]
    pub struct CountingOutput {
        plays: Arc<AtomicUsize>,
    }

    impl CountingOutput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn counter(&self) -> Arc<AtomicUsize> {
            self.plays.clone()
        }
    }

    impl AudioOutput for CountingOutput {
        fn prime(&mut self) -> Result<(), AlarmError> {
            Ok(())
        }

        fn play(&mut self, _profile: SoundProfile) -> Result<(), AlarmError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CountingOutput;
    use super::*;
    use crate::platform::NoopVibrator;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn controller(profile: SoundProfile) -> (AlarmController, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
        let output = CountingOutput::new();
        let plays = output.counter();
        (
            AlarmController::new(Box::new(output), Box::new(NoopVibrator), profile),
            plays,
        )
    }

    #[test]
    fn start_plays_immediately_and_double_start_is_guarded() {
        let (mut alarm, plays) = controller(SoundProfile::Classic);
        let (tx, _rx) = channel();

        alarm.start(&tx);
        assert!(alarm.is_playing());
        assert_eq!(plays.load(Ordering::SeqCst), 1);

        // Second start without stop: no second instance, no doubled ticker.
        alarm.start(&tx);
        assert_eq!(plays.load(Ordering::SeqCst), 1);
        assert!(alarm.is_playing());
    }

    #[test]
    fn ticks_replay_only_while_ringing() {
        let (mut alarm, plays) = controller(SoundProfile::Classic);
        let (tx, _rx) = channel();

        alarm.start(&tx);
        alarm.on_tick();
        alarm.on_tick();
        assert_eq!(plays.load(Ordering::SeqCst), 3);

        alarm.stop();
        // A tick already queued when the alarm was dismissed must not beep.
        alarm.on_tick();
        assert_eq!(plays.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn start_fires_the_vibration_pattern_once() {
        use crate::constants::VIBRATION_PATTERN_MS;
        use crate::platform::MockVibrator;

        let mut vibrator = MockVibrator::new();
        vibrator
            .expect_vibrate()
            .withf(|pattern| *pattern == VIBRATION_PATTERN_MS)
            .times(1)
            .returning(|_| Ok(()));

        let mut alarm = AlarmController::new(
            Box::new(CountingOutput::new()),
            Box::new(vibrator),
            SoundProfile::Classic,
        );
        let (tx, _rx) = channel();

        alarm.start(&tx);
        // The re-entrancy guard also suppresses a second vibration burst.
        alarm.start(&tx);
        alarm.stop();
    }

    #[test]
    fn stop_is_safe_when_not_playing() {
        let (mut alarm, _plays) = controller(SoundProfile::Urgent);
        alarm.stop();
        assert!(!alarm.is_playing());
    }

    #[test]
    fn ticker_emits_on_the_repeat_period() {
        let (mut alarm, _plays) = controller(SoundProfile::Classic);
        let (tx, rx) = channel();

        alarm.start(&tx);
        // Classic repeats at 1000ms.
        let tick = rx.recv_timeout(Duration::from_millis(1500));
        assert!(matches!(tick, Ok(Event::AlarmTick)));
        alarm.stop();
    }

    #[test]
    fn preview_does_not_affect_ringing_state() {
        let (mut alarm, plays) = controller(SoundProfile::Classic);
        assert!(alarm.preview(SoundProfile::Chime).is_ok());
        assert!(!alarm.is_playing());
        assert_eq!(plays.load(Ordering::SeqCst), 1);

        let (tx, _rx) = channel();
        alarm.start(&tx);
        assert!(alarm.preview(SoundProfile::Urgent).is_ok());
        assert!(alarm.is_playing());
        alarm.stop();
    }

    #[test]
    fn profile_change_applies_to_next_instance() {
        let (mut alarm, _plays) = controller(SoundProfile::Classic);
        alarm.set_profile(SoundProfile::Chime);
        assert_eq!(alarm.profile(), SoundProfile::Chime);
    }
}
