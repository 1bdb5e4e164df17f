//! Shared tunables for tracking, alarm and provider behavior.

use std::time::Duration;

/// Smallest accepted wake-up radius in meters.
pub const MIN_ALARM_RADIUS_M: f64 = 100.0;

/// Largest accepted wake-up radius in meters.
pub const MAX_ALARM_RADIUS_M: f64 = 2000.0;

/// Radius used when the user does not pass `--radius`.
pub const DEFAULT_ALARM_RADIUS_M: f64 = 500.0;

/// Upper bound on a single position acquisition.
pub const FIX_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixes older than this are not treated as fresh ground truth.
pub const FIX_MAX_AGE: Duration = Duration::from_secs(10);

/// Vibration pattern fired once on entering the alarm state:
/// 1000ms on, 500ms off, 1000ms on.
pub const VIBRATION_PATTERN_MS: [u64; 3] = [1000, 500, 1000];

/// Quiet period after the last keystroke before a geocoding request fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Minimum query length for geocoding lookups.
pub const MIN_SEARCH_QUERY_LEN: usize = 3;

/// Timeout applied to geocoding and routing HTTP calls.
pub const PROVIDER_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
