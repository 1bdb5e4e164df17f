//! GeoClue2 position backend (D-Bus system service).
//!
//! Talks to `org.freedesktop.GeoClue2` over the system bus using zbus's
//! blocking API. Each watch runs a dedicated worker thread that polls the
//! client's `Location` object at a short cadence and forwards changed fixes
//! into the event queue. Polling (rather than blocking on the
//! `LocationUpdated` signal) keeps cancellation prompt: the worker observes
//! the guard's active flag between slices and calls `Stop` on its way out.

use chrono::{DateTime, Utc};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::Sender,
    thread,
    time::{Duration, Instant},
};
use zbus::blocking::Connection;
use zbus::zvariant::OwnedObjectPath;

use crate::constants::{FIX_MAX_AGE, FIX_TIMEOUT};
use crate::events::Event;
use crate::geo::Coordinate;
use crate::position::{Fix, PositionError, PositionSource, WatchGuard};

/// Desktop id GeoClue uses for its per-application authorization table.
const DESKTOP_ID: &str = "wakepoint";

/// GClueAccuracyLevel::Exact — the "high" accuracy hint.
const ACCURACY_LEVEL_EXACT: u32 = 8;

/// How often the worker samples the client location.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep slice between active-flag checks, keeps cancellation latency low.
const POLL_SLICE: Duration = Duration::from_millis(250);

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Manager",
    default_service = "org.freedesktop.GeoClue2",
    default_path = "/org/freedesktop/GeoClue2/Manager"
)]
trait GeoClueManager {
    fn get_client(&self) -> zbus::Result<OwnedObjectPath>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Client",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueClient {
    fn start(&self) -> zbus::Result<()>;
    fn stop(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn location(&self) -> zbus::Result<OwnedObjectPath>;

    #[zbus(property)]
    fn set_desktop_id(&self, id: &str) -> zbus::Result<()>;

    #[zbus(property)]
    fn set_requested_accuracy_level(&self, level: u32) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.GeoClue2.Location",
    default_service = "org.freedesktop.GeoClue2"
)]
trait GeoClueLocation {
    #[zbus(property)]
    fn latitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn longitude(&self) -> zbus::Result<f64>;

    #[zbus(property)]
    fn accuracy(&self) -> zbus::Result<f64>;

    /// Seconds and microseconds since the epoch, as GeoClue reports it.
    #[zbus(property)]
    fn timestamp(&self) -> zbus::Result<(u64, u64)>;
}

/// Position source backed by the GeoClue2 system service.
pub struct GeoClueSource {
    connection: Connection,
}

impl GeoClueSource {
    /// Connect to the system bus and verify GeoClue is reachable.
    pub fn connect() -> Result<Self, PositionError> {
        let connection = Connection::system()
            .map_err(|e| PositionError::Unavailable(format!("system D-Bus: {e}")))?;

        // Probe the manager so a missing service surfaces here, not mid-run.
        GeoClueManagerProxyBlocking::new(&connection)
            .map_err(|e| PositionError::Unavailable(format!("GeoClue2 manager: {e}")))?;

        Ok(Self { connection })
    }

    /// Create and configure a fresh GeoClue client object.
    fn build_client(
        connection: &Connection,
    ) -> Result<GeoClueClientProxyBlocking<'static>, PositionError> {
        let manager = GeoClueManagerProxyBlocking::new(connection)
            .map_err(|e| PositionError::Unavailable(format!("GeoClue2 manager: {e}")))?;
        let client_path = manager
            .get_client()
            .map_err(|e| PositionError::Unavailable(format!("GeoClue2 GetClient: {e}")))?;

        let client = GeoClueClientProxyBlocking::builder(connection)
            .path(client_path)
            .map_err(|e| PositionError::Unavailable(format!("client path: {e}")))?
            .build()
            .map_err(|e| PositionError::Unavailable(format!("client proxy: {e}")))?;

        client
            .set_desktop_id(DESKTOP_ID)
            .map_err(|e| PositionError::Unavailable(format!("DesktopId: {e}")))?;
        client
            .set_requested_accuracy_level(ACCURACY_LEVEL_EXACT)
            .map_err(|e| PositionError::Unavailable(format!("accuracy level: {e}")))?;

        client.start().map_err(map_start_error)?;
        Ok(client)
    }

    /// Read the client's current location object, if it has one yet.
    ///
    /// GeoClue parks `Location` at the object-manager root (`/`) until the
    /// first fix lands.
    fn read_location(
        connection: &Connection,
        client: &GeoClueClientProxyBlocking<'_>,
    ) -> Result<Option<Fix>, PositionError> {
        let location_path = client
            .location()
            .map_err(|e| PositionError::Unavailable(format!("Location property: {e}")))?;
        if location_path.as_str() == "/" {
            return Ok(None);
        }

        let location = GeoClueLocationProxyBlocking::builder(connection)
            .path(location_path)
            .map_err(|e| PositionError::Unavailable(format!("location path: {e}")))?
            .build()
            .map_err(|e| PositionError::Unavailable(format!("location proxy: {e}")))?;

        let latitude = location
            .latitude()
            .map_err(|e| PositionError::Unavailable(format!("Latitude: {e}")))?;
        let longitude = location
            .longitude()
            .map_err(|e| PositionError::Unavailable(format!("Longitude: {e}")))?;
        let accuracy_m = location.accuracy().ok().filter(|a| *a > 0.0);
        let timestamp = location
            .timestamp()
            .ok()
            .and_then(|(secs, micros)| {
                DateTime::<Utc>::from_timestamp(secs as i64, (micros as u32) * 1000)
            })
            .unwrap_or_else(Utc::now);

        let coordinate = Coordinate::new(latitude, longitude);
        if !coordinate.is_valid() {
            return Ok(None);
        }

        Ok(Some(Fix {
            coordinate,
            accuracy_m,
            timestamp,
        }))
    }
}

/// GeoClue reports authorization failures as generic D-Bus errors; pick the
/// access-denied case out so it surfaces as a permission problem.
fn map_start_error(e: zbus::Error) -> PositionError {
    let text = e.to_string();
    if text.contains("AccessDenied") || text.contains("not allowed") {
        PositionError::Denied
    } else {
        PositionError::Unavailable(format!("GeoClue2 Start: {e}"))
    }
}

impl PositionSource for GeoClueSource {
    fn name(&self) -> &'static str {
        "GeoClue2"
    }

    fn current_fix(&mut self) -> Result<Fix, PositionError> {
        let client = Self::build_client(&self.connection)?;
        let deadline = Instant::now() + FIX_TIMEOUT;

        let result = loop {
            match Self::read_location(&self.connection, &client) {
                Ok(Some(fix)) if !fix.is_stale(Utc::now(), FIX_MAX_AGE) => break Ok(fix),
                Ok(_) => {}
                Err(e) => break Err(e),
            }
            if Instant::now() >= deadline {
                break Err(PositionError::Timeout(FIX_TIMEOUT));
            }
            thread::sleep(POLL_SLICE);
        };

        let _ = client.stop();
        result
    }

    fn watch(&mut self, sink: Sender<Event>) -> Result<WatchGuard, PositionError> {
        // Fail arming synchronously when the service refuses the client;
        // in-stream errors after this point are reported, not fatal.
        let client = Self::build_client(&self.connection)?;
        let connection = self.connection.clone();

        let active = Arc::new(AtomicBool::new(true));
        let flag = active.clone();

        let worker = thread::spawn(move || {
            let mut last_delivered: Option<Fix> = None;
            let mut error_streak = false;

            while flag.load(Ordering::SeqCst) {
                match Self::read_location(&connection, &client) {
                    Ok(Some(fix)) => {
                        error_streak = false;
                        // At most one event per platform update.
                        if last_delivered != Some(fix) {
                            last_delivered = Some(fix);
                            if !flag.load(Ordering::SeqCst)
                                || sink.send(Event::Fix(fix)).is_err()
                            {
                                break;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // Report each error streak once; keep the watch alive.
                        if !error_streak {
                            error_streak = true;
                            if sink.send(Event::PositionLost(e.to_string())).is_err() {
                                break;
                            }
                        }
                    }
                }

                let poll_deadline = Instant::now() + POLL_INTERVAL;
                while flag.load(Ordering::SeqCst) && Instant::now() < poll_deadline {
                    thread::sleep(POLL_SLICE);
                }
            }

            let _ = client.stop();
        });

        Ok(WatchGuard::new(active, worker))
    }
}
