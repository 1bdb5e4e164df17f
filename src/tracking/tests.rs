use super::*;
use crate::geo::Coordinate;
use crate::position::Fix;

fn fix(latitude: f64, longitude: f64) -> Fix {
    Fix::now(Coordinate::new(latitude, longitude))
}

/// Session with radius 500m, current position at the origin.
fn session_at_origin() -> TrackingSession {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.record_fix(fix(0.0, 0.0));
    session
}

#[test]
fn new_session_is_idle_with_no_distance() {
    let session = TrackingSession::new(500.0).unwrap();
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.last_distance_m(), None);
    assert_eq!(session.target(), None);
}

#[test]
fn radius_bounds_are_enforced() {
    assert!(TrackingSession::new(100.0).is_ok());
    assert!(TrackingSession::new(2000.0).is_ok());
    assert_eq!(
        TrackingSession::new(99.0).unwrap_err(),
        TrackingError::RadiusOutOfRange(99.0)
    );
    assert!(TrackingSession::new(2001.0).is_err());
    assert!(TrackingSession::new(f64::NAN).is_err());

    let mut session = TrackingSession::new(500.0).unwrap();
    assert!(session.set_radius(250.0).is_ok());
    assert!(session.set_radius(50.0).is_err());
    assert_eq!(session.radius_m(), 250.0);
}

#[test]
fn set_target_rejects_a_destination_inside_the_radius() {
    let mut session = session_at_origin();

    // ~111m away with a 500m radius: too close to ever leave setup.
    let result = session.set_target(Coordinate::new(0.0, 0.001));
    match result {
        Err(TrackingError::TooCloseToTarget {
            distance_m,
            radius_m,
        }) => {
            assert!((distance_m - 111.0).abs() < 5.0);
            assert_eq!(radius_m, 500.0);
        }
        other => panic!("expected TooCloseToTarget, got {other:?}"),
    }
    assert_eq!(session.target(), None);
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn set_target_without_a_known_position_is_accepted() {
    let mut session = TrackingSession::new(500.0).unwrap();
    // No proximity check possible yet.
    assert!(session.set_target(Coordinate::new(0.0, 0.001)).is_ok());
}

#[test]
fn start_tracking_requires_a_target() {
    let mut session = session_at_origin();
    assert_eq!(session.start_tracking(), Err(TrackingError::NoTarget));
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn start_tracking_without_current_position_succeeds() {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(Coordinate::new(10.0, 10.0)).unwrap();

    session.start_tracking().unwrap();
    assert_eq!(
        session.phase(),
        Phase::Tracking {
            last_distance_m: None
        }
    );
}

#[test]
fn start_tracking_rechecks_proximity() {
    // Defense in depth: the position may have drifted into the radius
    // between set_target and start_tracking.
    let mut session = TrackingSession::new(500.0).unwrap();
    session.record_fix(fix(0.0, 0.1));
    session.set_target(Coordinate::new(0.0, 0.0)).unwrap();

    // Drift to ~111m from the target before arming.
    session.record_fix(fix(0.0, 0.001));

    assert!(matches!(
        session.start_tracking(),
        Err(TrackingError::TooCloseToTarget { .. })
    ));
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn start_tracking_seeds_the_distance_from_the_known_position() {
    let mut session = session_at_origin();
    session.set_target(Coordinate::new(0.0, 0.1)).unwrap();

    session.start_tracking().unwrap();
    let seeded = session.last_distance_m().unwrap();
    assert!((seeded - 11_119.5).abs() < 120.0);
}

#[test]
fn tracking_fires_exactly_when_a_fix_enters_the_radius() {
    // Target at (10, 10); feed fixes at ~2000m, ~800m, ~400m. One degree of
    // latitude is ~111.2km, so offsets are degrees = meters / 111_195.
    let target = Coordinate::new(10.0, 10.0);
    let at_distance = |meters: f64| fix(10.0 + meters / 111_195.0, 10.0);

    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();
    session.record_fix(at_distance(2000.0));
    session.start_tracking().unwrap();

    let outcome = session.record_fix(at_distance(2000.0));
    assert!(matches!(outcome, FixOutcome::Updated { .. }));

    let outcome = session.record_fix(at_distance(800.0));
    match outcome {
        FixOutcome::Updated { distance_m } => assert!((distance_m - 800.0).abs() < 10.0),
        other => panic!("expected Updated at 800m, got {other:?}"),
    }
    assert!((session.last_distance_m().unwrap() - 800.0).abs() < 10.0);

    let outcome = session.record_fix(at_distance(400.0));
    match outcome {
        FixOutcome::Arrived { distance_m } => assert!((distance_m - 400.0).abs() < 10.0),
        other => panic!("expected Arrived at 400m, got {other:?}"),
    }
    assert!((session.last_distance_m().unwrap() - 400.0).abs() < 10.0);
    assert!(matches!(session.phase(), Phase::Alarm { .. }));
}

#[test]
fn distance_equal_to_radius_counts_as_arrived() {
    let target = Coordinate::new(0.0, 0.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();
    session.start_tracking().unwrap();

    // ~499m: just inside, so ≤ must fire. A fix computing to exactly the
    // radius also arrives; the comparison is ≤, not <.
    let offset = 499.0 / 111_195.0;
    let outcome = session.record_fix(fix(offset, 0.0));
    assert!(matches!(outcome, FixOutcome::Arrived { .. }));

    let mut boundary = TrackingSession::new(500.0).unwrap();
    boundary.set_target(target).unwrap();
    boundary.start_tracking().unwrap();
    if let FixOutcome::Arrived { distance_m } =
        boundary.record_fix(fix(500.0 / 111_195.0, 0.0))
    {
        assert!((distance_m - 500.0).abs() < 2.0);
    }
}

#[test]
fn fixes_keep_updating_distance_while_alarm_rings() {
    let target = Coordinate::new(10.0, 10.0);
    let at_distance = |meters: f64| fix(10.0 + meters / 111_195.0, 10.0);

    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();
    session.start_tracking().unwrap();
    session.record_fix(at_distance(400.0));
    assert!(matches!(session.phase(), Phase::Alarm { .. }));

    // The watch was not cancelled; updates still land and may drift back
    // outside the radius without leaving Alarm.
    let outcome = session.record_fix(at_distance(600.0));
    assert!(matches!(outcome, FixOutcome::Updated { .. }));
    assert!(matches!(session.phase(), Phase::Alarm { .. }));
    assert!((session.last_distance_m().unwrap() - 600.0).abs() < 10.0);

    if let Phase::Alarm {
        entry_distance_m, ..
    } = session.phase()
    {
        // Entry distance stays what it was when the alarm fired.
        assert!((entry_distance_m - 400.0).abs() < 10.0);
        assert!(entry_distance_m <= session.radius_m());
    }
}

#[test]
fn stop_tracking_returns_to_idle_and_retains_the_target() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();
    session.start_tracking().unwrap();
    session.record_fix(fix(10.1, 10.0));

    session.stop_tracking().unwrap();
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.last_distance_m(), None);
    assert_eq!(session.target(), Some(target));

    // Quick restart with the same destination, no intervening movement:
    // the same too-close rule applies and here it passes (~11km away).
    assert!(session.start_tracking().is_ok());
}

#[test]
fn stop_tracking_outside_tracking_is_rejected() {
    let mut session = session_at_origin();
    assert_eq!(session.stop_tracking(), Err(TrackingError::NotTracking));
}

#[test]
fn dismiss_alarm_returns_to_idle_with_target_retained() {
    let target = Coordinate::new(10.0, 10.0);
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(target).unwrap();
    session.start_tracking().unwrap();
    session.record_fix(fix(10.0, 10.0));
    assert!(matches!(session.phase(), Phase::Alarm { .. }));

    session.dismiss_alarm().unwrap();
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.last_distance_m(), None);
    assert_eq!(session.target(), Some(target));

    assert_eq!(session.dismiss_alarm(), Err(TrackingError::NoAlarm));
}

#[test]
fn set_target_is_rejected_outside_idle() {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(Coordinate::new(10.0, 10.0)).unwrap();
    session.start_tracking().unwrap();

    assert_eq!(
        session.set_target(Coordinate::new(20.0, 20.0)),
        Err(TrackingError::NotIdle)
    );
    assert_eq!(session.set_radius(300.0), Err(TrackingError::NotIdle));
}

#[test]
fn changing_target_clears_the_route_trace() {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(Coordinate::new(10.0, 10.0)).unwrap();
    session.set_route(vec![Coordinate::new(5.0, 5.0), Coordinate::new(7.0, 7.0)]);
    assert_eq!(session.route().len(), 2);

    // New destination: the old trace is stale.
    session.set_target(Coordinate::new(20.0, 20.0)).unwrap();
    assert!(session.route().is_empty());
}

#[test]
fn route_survives_stop_for_quick_restart() {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(Coordinate::new(10.0, 10.0)).unwrap();
    session.set_route(vec![Coordinate::new(5.0, 5.0)]);
    session.start_tracking().unwrap();
    session.stop_tracking().unwrap();

    assert_eq!(session.route().len(), 1);
}

#[test]
fn idle_fixes_update_position_without_distance_bookkeeping() {
    let mut session = TrackingSession::new(500.0).unwrap();
    session.set_target(Coordinate::new(10.0, 10.0)).unwrap();

    let outcome = session.record_fix(fix(0.0, 0.0));
    assert_eq!(outcome, FixOutcome::Noted);
    assert_eq!(session.last_distance_m(), None);
    assert!(session.current().is_some());
}
