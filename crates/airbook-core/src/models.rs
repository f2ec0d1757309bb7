//! Core data models for the cell-generation engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A geodetic position. Longitude comes first, matching `[lon, lat, alt]` inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
    /// Altitude in meters; ignored by 2D operations.
    #[serde(default, alias = "alt")]
    pub altitude_m: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64, altitude_m: f64) -> Self {
        Self {
            lon,
            lat,
            altitude_m,
        }
    }

    /// Horizontal-only point at altitude zero.
    pub fn flat(lon: f64, lat: f64) -> Self {
        Self::new(lon, lat, 0.0)
    }

    /// True when the point is finite and inside the lat/lon domain.
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.altitude_m.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Same horizontal position, compared exactly.
    pub fn same_position(&self, other: &GeoPoint) -> bool {
        self.lon == other.lon && self.lat == other.lat
    }
}

/// One trajectory waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateVector4D {
    pub position: GeoPoint,
    pub time: DateTime<Utc>,
    /// Ground speed in meters per second. Only used when the next waypoint carries the
    /// same timestamp and the segment duration has to be derived.
    #[serde(default, alias = "speed")]
    pub speed_mps: f64,
}

impl StateVector4D {
    pub fn new(position: GeoPoint, time: DateTime<Utc>, speed_mps: f64) -> Self {
        Self {
            position,
            time,
            speed_mps,
        }
    }
}

/// Closed interval `[start, end]` during which a cell is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlice {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlice {
    /// Build a slice, ordering the endpoints so `start <= end` always holds.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Smallest slice containing both.
    pub fn union(&self, other: &TimeSlice) -> TimeSlice {
        TimeSlice {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Widen by `before` ahead of the start and `after` past the end. `None` when
    /// either endpoint leaves the representable date range.
    pub fn buffered(&self, before: Duration, after: Duration) -> Option<TimeSlice> {
        Some(TimeSlice {
            start: self.start.checked_sub_signed(before)?,
            end: self.end.checked_add_signed(after)?,
        })
    }

    /// Open-interval overlap test; slices that only touch do not intersect.
    pub fn intersects(&self, other: &TimeSlice) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// A static reservation: polygon footprint extruded between two altitudes for a fixed
/// time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume4D {
    /// Closed ring (first vertex == last vertex).
    pub footprint: Vec<GeoPoint>,
    #[serde(alias = "floor")]
    pub altitude_min_m: f64,
    #[serde(alias = "ceiling")]
    pub altitude_max_m: f64,
    pub time_slice: TimeSlice,
}

/// Opaque 64-bit horizontal cell identifier. Both grid systems use 64-bit ids, so the
/// handle is the raw index and stays cheap to copy and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellHandle(pub(crate) u64);

impl CellHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Rendered cell identifier. Two ids are equal iff their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CellId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for CellId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The engine's output unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellBooking {
    pub cell_id: CellId,
    pub time_slice: TimeSlice,
}

impl CellBooking {
    pub fn new(cell_id: CellId, time_slice: TimeSlice) -> Self {
        Self {
            cell_id,
            time_slice,
        }
    }
}

/// Sort bookings by start time, breaking ties on the cell id.
pub fn sort_bookings(bookings: &mut [CellBooking]) {
    bookings.sort_by(|a, b| {
        a.time_slice
            .start
            .cmp(&b.time_slice.start)
            .then_with(|| a.cell_id.cmp(&b.cell_id))
    });
}
