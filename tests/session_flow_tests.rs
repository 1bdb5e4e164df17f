//! End-to-end session flows driven through the core event loop with a
//! replay position source and a silent, counting audio output.

use std::thread;
use std::time::Duration;

use wakepoint::alarm::test_support::CountingOutput;
use wakepoint::alarm::{AlarmController, SoundProfile};
use wakepoint::core::{Core, CoreParams};
use wakepoint::events::{Event, EventHub, Intent};
use wakepoint::geo::Coordinate;
use wakepoint::logger::Log;
use wakepoint::platform::{NoopVibrator, NoopWakeLock};
use wakepoint::position::replay::{ReplaySource, ScriptedFix};
use wakepoint::tracking::{Phase, TrackingSession};

/// Degrees of latitude giving roughly the requested distance from `target`.
fn at_distance(target: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(target.latitude + meters / 111_195.0, target.longitude)
}

struct Harness {
    core: Core,
    plays: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    sender: std::sync::mpsc::Sender<Event>,
}

fn harness(session: TrackingSession, source: ReplaySource) -> Harness {
    Log::set_enabled(false);

    let output = CountingOutput::new();
    let plays = output.counter();
    let alarm = AlarmController::new(
        Box::new(output),
        Box::new(NoopVibrator),
        SoundProfile::Classic,
    );

    let hub = EventHub::new();
    let sender = hub.sender.clone();

    let core = Core::new(CoreParams {
        session,
        position: Box::new(source),
        alarm,
        wake_lock: Box::new(NoopWakeLock),
        hub,
        debug_enabled: false,
    });

    Harness {
        core,
        plays,
        sender,
    }
}

fn quit_after(sender: std::sync::mpsc::Sender<Event>, delay: Duration) {
    thread::spawn(move || {
        thread::sleep(delay);
        let _ = sender.send(Event::Intent(Intent::Quit));
    });
}

#[test]
fn approach_rings_the_alarm_on_the_third_fix() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();

    let source = ReplaySource::from_coordinates(
        vec![
            at_distance(target, 2000.0),
            at_distance(target, 800.0),
            at_distance(target, 400.0),
        ],
        Duration::from_millis(20),
    );

    let h = harness(session, source);
    quit_after(h.sender.clone(), Duration::from_millis(400));
    let final_session = h.core.run().unwrap();

    assert!(matches!(final_session.phase(), Phase::Alarm { .. }));
    let last = final_session.last_distance_m().unwrap();
    assert!((last - 400.0).abs() < 10.0, "final distance {last}");

    // One signal instance played at alarm start; the first repeat tick
    // would land after the quit.
    assert!(h.plays.load(std::sync::atomic::Ordering::SeqCst) >= 1);
}

#[test]
fn stale_fixes_never_fire_the_alarm() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();

    // Every scripted fix is inside the radius but a minute old; the
    // consumption-point staleness check must discard them all.
    let source = ReplaySource::new(
        vec![
            ScriptedFix {
                coordinate: at_distance(target, 100.0),
                age: Duration::from_secs(60),
            },
            ScriptedFix {
                coordinate: at_distance(target, 50.0),
                age: Duration::from_secs(60),
            },
        ],
        Duration::from_millis(20),
    );

    let h = harness(session, source);
    quit_after(h.sender.clone(), Duration::from_millis(300));
    let final_session = h.core.run().unwrap();

    assert!(matches!(final_session.phase(), Phase::Tracking { .. }));
    assert_eq!(final_session.last_distance_m(), None);
    assert_eq!(h.plays.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn stop_prevents_later_fixes_from_triggering() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();

    // First fix far away; the follow-ups would be inside the radius, but a
    // stop lands between them. Once Idle, those fixes are bookkeeping only.
    let source = ReplaySource::from_coordinates(
        vec![
            at_distance(target, 5000.0),
            at_distance(target, 100.0),
            at_distance(target, 50.0),
        ],
        Duration::from_millis(200),
    );

    let h = harness(session, source);

    let stopper = h.sender.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(80));
        let _ = stopper.send(Event::Intent(Intent::StopTracking));
    });
    quit_after(h.sender.clone(), Duration::from_millis(700));

    let final_session = h.core.run().unwrap();

    assert_eq!(final_session.phase(), Phase::Idle);
    // Destination is retained for a quick restart.
    assert_eq!(final_session.target(), Some(target));
    assert_eq!(h.plays.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn dismiss_silences_the_alarm_and_returns_to_idle() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();

    let source = ReplaySource::from_coordinates(
        vec![at_distance(target, 400.0)],
        Duration::from_millis(10),
    );

    let h = harness(session, source);

    let dismisser = h.sender.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let _ = dismisser.send(Event::Intent(Intent::DismissAlarm));
    });
    quit_after(h.sender.clone(), Duration::from_millis(2600));

    let final_session = h.core.run().unwrap();
    let plays = h.plays.load(std::sync::atomic::Ordering::SeqCst);

    assert_eq!(final_session.phase(), Phase::Idle);
    assert_eq!(final_session.target(), Some(target));
    // The start instance (and possibly nothing else) played before the
    // dismissal; the two seconds afterwards must add no further signals.
    assert!(plays >= 1);
    assert!(plays <= 2, "alarm kept signaling after dismissal: {plays}");
}
