//! CoT position event structure

use chrono::{DateTime, Utc};
use gpscot_core::{Fix, Identity};

/// CoT version emitted in every event
pub const COT_VERSION: &str = "2.0";

/// Atom, friendly, ground, unit
pub const EVENT_TYPE: &str = "a-f-G-U";

/// Machine generated, GPS derived
pub const EVENT_HOW: &str = "m-g";

/// Fixed remarks text carried in the detail section
pub const REMARKS: &str = "USB GPS position";

/// Circular and linear error reported when the receiver gives no estimate
pub const UNKNOWN_ERROR: f64 = 9999999.0;

/// A self-reported position event.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionEvent {
    /// Unique identifier of the reporting unit
    pub uid: String,
    /// Display callsign
    pub callsign: String,
    /// Event timestamp
    pub time: DateTime<Utc>,
    /// Start of the validity window (equal to `time`)
    pub start: DateTime<Utc>,
    /// End of the validity window
    pub stale: DateTime<Utc>,
    /// Reported position
    pub point: Point,
}

impl PositionEvent {
    /// Builds the event for `fix` observed at `now`, valid until `stale`.
    pub fn new(identity: &Identity, fix: &Fix, now: DateTime<Utc>, stale: DateTime<Utc>) -> Self {
        Self {
            uid: identity.uid().to_string(),
            callsign: identity.callsign().to_string(),
            time: now,
            start: now,
            stale,
            point: Point::from(*fix),
        }
    }
}

/// Geographic point with accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Height in meters
    pub hae: f64,
    /// Circular error in meters
    pub ce: f64,
    /// Linear error in meters
    pub le: f64,
}

impl Point {
    /// Creates a point with unknown accuracy.
    pub fn new(lat: f64, lon: f64, hae: f64) -> Self {
        Self {
            lat,
            lon,
            hae,
            ce: UNKNOWN_ERROR,
            le: UNKNOWN_ERROR,
        }
    }
}

impl From<Fix> for Point {
    fn from(fix: Fix) -> Self {
        Point::new(fix.latitude, fix.longitude, fix.altitude)
    }
}
