//! Temporal annotator: turns a trajectory into per-cell occupancy windows.

use crate::altitude::VerticalBands;
use crate::error::{Error, Result};
use crate::grid::GridSystem;
use crate::models::{CellHandle, GeoPoint, StateVector4D, TimeSlice};
use crate::sampler::{trace_segment, CellVisit};
use crate::spatial::{bearing, distance_m, offset_by_bearing, project_fraction, LocalFrame};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

/// Buffers applied to trajectory bookings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectoryOptions {
    /// Seconds reserved before a cell is entered.
    pub temporal_backward_buffer_s: i64,
    /// Seconds reserved after a cell is left.
    pub temporal_forward_buffer_s: i64,
    /// Half-width of the corridor booked around each segment, in meters.
    pub spatial_lateral_buffer_m: f64,
    /// Meters added above and below the flown altitude before layering (3D only).
    pub spatial_vertical_buffer_m: f64,
}

impl Default for TrajectoryOptions {
    fn default() -> Self {
        Self {
            temporal_backward_buffer_s: 300,
            temporal_forward_buffer_s: 600,
            spatial_lateral_buffer_m: 0.0,
            spatial_vertical_buffer_m: 0.0,
        }
    }
}

impl TrajectoryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.temporal_backward_buffer_s < 0 || self.temporal_forward_buffer_s < 0 {
            return Err(Error::InvalidArgument(format!(
                "temporal buffers must be non-negative (backward {}, forward {})",
                self.temporal_backward_buffer_s, self.temporal_forward_buffer_s
            )));
        }
        for (name, value) in [
            ("lateral", self.spatial_lateral_buffer_m),
            ("vertical", self.spatial_vertical_buffer_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "{} buffer must be a non-negative distance, got {}",
                    name, value
                )));
            }
        }
        self.buffer_durations().map(|_| ())
    }

    /// Backward and forward buffers as durations.
    pub fn buffer_durations(&self) -> Result<(Duration, Duration)> {
        let convert = |name: &str, secs: i64| {
            Duration::try_seconds(secs).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "{} buffer of {} s is out of range",
                    name, secs
                ))
            })
        };
        Ok((
            convert("backward", self.temporal_backward_buffer_s)?,
            convert("forward", self.temporal_forward_buffer_s)?,
        ))
    }
}

/// One merged, buffered occupancy window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookedCell {
    pub cell: CellHandle,
    pub layer: Option<u8>,
    pub time_slice: TimeSlice,
}

/// When a segment is flown. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SegmentWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl SegmentWindow {
    fn duration(&self) -> Duration {
        self.end - self.start
    }

    fn at(&self, fraction: f64) -> DateTime<Utc> {
        let span_ms = self.duration().num_milliseconds();
        let offset_ms = ((span_ms as f64 * fraction).round() as i64).clamp(0, span_ms);
        self.start
            .checked_add_signed(Duration::milliseconds(offset_ms))
            .unwrap_or(self.end)
    }
}

fn out_of_range(what: impl std::fmt::Display) -> Error {
    Error::InvalidArgument(format!("{} falls outside the representable time range", what))
}

/// Reject trajectories that cannot be annotated, before any cell work happens.
pub fn validate_trajectory(trajectory: &[StateVector4D]) -> Result<()> {
    if trajectory.len() < 2 {
        return Err(Error::InvalidTrajectory(format!(
            "a trajectory needs at least 2 waypoints, got {}",
            trajectory.len()
        )));
    }
    for (i, sv) in trajectory.iter().enumerate() {
        if !sv.position.is_valid() {
            return Err(Error::InvalidArgument(format!(
                "waypoint {} has an invalid position (lon {}, lat {}, alt {})",
                i, sv.position.lon, sv.position.lat, sv.position.altitude_m
            )));
        }
    }
    for (i, pair) in trajectory.windows(2).enumerate() {
        if pair[1].time < pair[0].time {
            return Err(Error::InvalidTrajectory(format!(
                "waypoint {} at {} is earlier than waypoint {} at {}",
                i + 1,
                pair[1].time,
                i,
                pair[0].time
            )));
        }
        if pair[1].time == pair[0].time {
            let speed = pair[0].speed_mps;
            if !speed.is_finite() || speed <= 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "waypoint {} shares its timestamp with the next one and needs a positive speed, got {}",
                    i, speed
                )));
            }
        }
    }
    Ok(())
}

/// Timing for every consecutive waypoint pair.
///
/// Segments whose timestamps differ span exactly those timestamps; a segment with equal
/// timestamps takes `round(distance / speed)` seconds (at least one). A segment never
/// starts before the previous one ended.
fn schedule(trajectory: &[StateVector4D]) -> Result<Vec<SegmentWindow>> {
    let mut windows = Vec::with_capacity(trajectory.len().saturating_sub(1));
    let mut previous_end: Option<DateTime<Utc>> = None;
    for (i, pair) in trajectory.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let start = previous_end.map_or(from.time, |end| end.max(from.time));
        let end = if to.time > from.time {
            to.time.max(start)
        } else {
            let seconds = (distance_m(&from.position, &to.position) / from.speed_mps)
                .round()
                .max(1.0);
            if !seconds.is_finite() || seconds >= i64::MAX as f64 {
                return Err(out_of_range(format!("segment {} duration", i)));
            }
            Duration::try_seconds(seconds as i64)
                .and_then(|duration| start.checked_add_signed(duration))
                .ok_or_else(|| out_of_range(format!("segment {} end", i)))?
        };
        previous_end = Some(end);
        windows.push(SegmentWindow { start, end });
    }
    Ok(windows)
}

/// Cells occupied by `trajectory`, merged per (cell, layer) and buffered.
///
/// Results are ordered by cell then layer; the engine sorts them for output.
pub fn annotate_trajectory(
    grid: &dyn GridSystem,
    resolution: u8,
    vertical: Option<&VerticalBands>,
    trajectory: &[StateVector4D],
    options: &TrajectoryOptions,
) -> Result<Vec<BookedCell>> {
    grid.check_resolution(resolution)?;
    options.validate()?;
    if let Some(bands) = vertical {
        bands.validate()?;
    }
    validate_trajectory(trajectory)?;
    let (before, after) = options.buffer_durations()?;
    let windows = schedule(trajectory)?;
    if let (Some(first), Some(last)) = (windows.first(), windows.last()) {
        TimeSlice::new(first.start, last.end)
            .buffered(before, after)
            .ok_or_else(|| out_of_range("buffered booking window"))?;
    }

    let mut merged: BTreeMap<(CellHandle, Option<u8>), TimeSlice> = BTreeMap::new();
    let mut occupy = |cell: CellHandle, layer: Option<u8>, slice: TimeSlice| {
        merged
            .entry((cell, layer))
            .and_modify(|existing| *existing = existing.union(&slice))
            .or_insert(slice);
    };

    for (pair, window) in trajectory.windows(2).zip(windows) {
        let (a, b) = (&pair[0].position, &pair[1].position);
        let mut visits = trace_segment(grid, a, b, resolution)?;
        if options.spatial_lateral_buffer_m > 0.0 {
            visits.extend(corridor_visits(
                grid,
                a,
                b,
                resolution,
                options.spatial_lateral_buffer_m,
            )?);
        }

        for visit in visits {
            let slice = TimeSlice::new(
                window.at(visit.entry_fraction),
                window.at(visit.exit_fraction),
            );
            match vertical {
                Some(bands) => {
                    let alt_in = a.altitude_m + (b.altitude_m - a.altitude_m) * visit.entry_fraction;
                    let alt_out = a.altitude_m + (b.altitude_m - a.altitude_m) * visit.exit_fraction;
                    let pad = options.spatial_vertical_buffer_m;
                    let lo = (alt_in.min(alt_out) - pad).max(0.0);
                    let hi = (alt_in.max(alt_out) + pad).max(0.0);
                    for layer in bands.layers_for_range(lo, hi)? {
                        occupy(visit.cell, Some(layer), slice);
                    }
                }
                None => occupy(visit.cell, None, slice),
            }
        }
    }

    merged
        .into_iter()
        .map(|((cell, layer), slice)| {
            let time_slice = slice
                .buffered(before, after)
                .ok_or_else(|| out_of_range("buffered booking window"))?;
            Ok(BookedCell {
                cell,
                layer,
                time_slice,
            })
        })
        .collect()
}

/// Cells within `half_width_m` of the segment, timed by where their outline projects
/// onto it.
fn corridor_visits(
    grid: &dyn GridSystem,
    a: &GeoPoint,
    b: &GeoPoint,
    resolution: u8,
    half_width_m: f64,
) -> Result<Vec<CellVisit>> {
    let ring = corridor_ring(a, b, half_width_m);
    let cells = grid.polygon_cover(&ring, resolution)?;

    let frame = LocalFrame::around(&[*a, *b]);
    let (start, end) = (frame.project(a), frame.project(b));
    let degenerate = distance_m(a, b) < 1e-3;

    let mut visits = Vec::with_capacity(cells.len());
    for cell in cells {
        let (entry_fraction, exit_fraction) = if degenerate {
            (0.0, 1.0)
        } else {
            let mut lo: f64 = 1.0;
            let mut hi: f64 = 0.0;
            for vertex in grid.cell_to_boundary(cell)? {
                let f = project_fraction(start, end, frame.project(&vertex));
                lo = lo.min(f);
                hi = hi.max(f);
            }
            (lo, hi)
        };
        visits.push(CellVisit {
            cell,
            entry_fraction,
            exit_fraction,
        });
    }
    Ok(visits)
}

/// Closed rectangle around `a -> b`, extended by `half_width_m` past each end.
fn corridor_ring(a: &GeoPoint, b: &GeoPoint, half_width_m: f64) -> Vec<GeoPoint> {
    let heading = if a.same_position(b) {
        0.0
    } else {
        bearing(a.lat, a.lon, b.lat, b.lon)
    };
    let back = offset_by_bearing(a.lat, a.lon, half_width_m, heading + std::f64::consts::PI);
    let ahead = offset_by_bearing(b.lat, b.lon, half_width_m, heading);
    let corner = |(lat, lon): (f64, f64), side: f64| {
        let (lat, lon) = offset_by_bearing(lat, lon, half_width_m, heading + side * FRAC_PI_2);
        GeoPoint::flat(lon, lat)
    };
    let first = corner(back, -1.0);
    vec![
        first,
        corner(ahead, -1.0),
        corner(ahead, 1.0),
        corner(back, 1.0),
        first,
    ]
}
