//! Geodesic segment sampler: the ordered run of cells a great-circle segment passes
//! through, with the arc-length fraction at which each is entered and left.

use crate::error::{Error, Result};
use crate::grid::GridSystem;
use crate::models::{CellHandle, GeoPoint};
use crate::spatial::{distance_m, distance_to_segment, intermediate_point, LocalFrame, EARTH_RADIUS_M};

/// Smallest sampling step in meters.
const MIN_STEP_M: f64 = 0.5;

/// Steps per characteristic cell edge.
const STEPS_PER_EDGE: f64 = 4.0;

/// Bisection depth when two consecutive samples land in non-adjacent cells.
const MAX_BISECT_DEPTH: u32 = 24;

/// One contiguous stay of the segment inside a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellVisit {
    pub cell: CellHandle,
    /// Fraction of the segment length at which the cell is entered, in `[0, 1]`.
    pub entry_fraction: f64,
    /// Fraction of the segment length at which the cell is left, in `[0, 1]`.
    pub exit_fraction: f64,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    cell: CellHandle,
    fraction: f64,
}

struct Tracer<'a, G: GridSystem + ?Sized> {
    grid: &'a G,
    a: &'a GeoPoint,
    b: &'a GeoPoint,
    resolution: u8,
    length_m: f64,
}

impl<G: GridSystem + ?Sized> Tracer<'_, G> {
    fn sample(&self, fraction: f64) -> Result<Sample> {
        let point = intermediate_point(self.a, self.b, fraction);
        Ok(Sample {
            cell: self.grid.point_to_cell(&point, self.resolution)?,
            fraction,
        })
    }

    /// Append samples strictly between `lo` and `hi` until every consecutive pair of
    /// distinct cells is adjacent.
    fn bridge(&self, lo: Sample, hi: Sample, depth: u32, out: &mut Vec<Sample>) -> Result<()> {
        if lo.cell == hi.cell || self.grid.are_neighbors(lo.cell, hi.cell)? {
            return Ok(());
        }
        let span_m = (hi.fraction - lo.fraction) * self.length_m;
        if depth < MAX_BISECT_DEPTH && span_m > 1e-3 {
            let mid = self.sample(0.5 * (lo.fraction + hi.fraction))?;
            if mid.cell == lo.cell {
                return self.bridge(mid, hi, depth + 1, out);
            }
            if mid.cell == hi.cell {
                return self.bridge(lo, mid, depth + 1, out);
            }
            self.bridge(lo, mid, depth + 1, out)?;
            out.push(mid);
            return self.bridge(mid, hi, depth + 1, out);
        }

        // The segment passes (numerically) through a shared corner.
        if let Some(cell) = self.common_neighbor(lo.cell, hi.cell)? {
            out.push(Sample {
                cell,
                fraction: 0.5 * (lo.fraction + hi.fraction),
            });
        } else {
            tracing::debug!(
                lo = %self.grid.format_cell(lo.cell),
                hi = %self.grid.format_cell(hi.cell),
                "No common neighbour to bridge a corner crossing"
            );
        }
        Ok(())
    }

    /// Common neighbour of `a` and `b` whose center lies closest to the segment.
    fn common_neighbor(&self, a: CellHandle, b: CellHandle) -> Result<Option<CellHandle>> {
        let around_b = self.grid.neighbors(b)?;
        let frame = LocalFrame::around(&[*self.a, *self.b]);
        let start = frame.project(self.a);
        let end = frame.project(self.b);
        let mut best: Option<(f64, CellHandle)> = None;
        for cell in self.grid.neighbors(a)? {
            if !around_b.contains(&cell) {
                continue;
            }
            let center = frame.project(&self.grid.cell_center(cell)?);
            let dist = distance_to_segment(start, end, center);
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, cell));
            }
        }
        Ok(best.map(|(_, cell)| cell))
    }
}

/// Cells visited by the great-circle segment from `a` to `b`, in travel order.
///
/// Consecutive visits are always distinct cells, and adjacent ones except where no
/// common neighbour exists. A cell may appear more than once when the segment leaves
/// and re-enters it.
pub fn trace_segment<G: GridSystem + ?Sized>(
    grid: &G,
    a: &GeoPoint,
    b: &GeoPoint,
    resolution: u8,
) -> Result<Vec<CellVisit>> {
    grid.check_resolution(resolution)?;
    for p in [a, b] {
        if !p.is_valid() {
            return Err(Error::InvalidArgument(format!(
                "invalid position (lon {}, lat {}, alt {})",
                p.lon, p.lat, p.altitude_m
            )));
        }
    }
    let length_m = distance_m(a, b);
    if length_m > std::f64::consts::PI * EARTH_RADIUS_M - 1.0 {
        return Err(Error::InvalidArgument(
            "antipodal endpoints have no unique great circle".to_string(),
        ));
    }

    let tracer = Tracer {
        grid,
        a,
        b,
        resolution,
        length_m,
    };
    let step_m = (grid.edge_length_m(resolution) / STEPS_PER_EDGE).max(MIN_STEP_M);
    let steps = ((length_m / step_m).ceil() as usize).max(1);

    let mut samples = vec![tracer.sample(0.0)?];
    for k in 1..=steps {
        let next = tracer.sample(k as f64 / steps as f64)?;
        let prev = samples[samples.len() - 1];
        if next.cell == prev.cell {
            continue;
        }
        tracer.bridge(prev, next, 0, &mut samples)?;
        samples.push(next);
    }
    Ok(into_visits(&samples))
}

/// Cell sequence of [`trace_segment`] without the fractions.
pub fn sample_segment<G: GridSystem + ?Sized>(
    grid: &G,
    a: &GeoPoint,
    b: &GeoPoint,
    resolution: u8,
) -> Result<Vec<CellHandle>> {
    Ok(trace_segment(grid, a, b, resolution)?
        .into_iter()
        .map(|visit| visit.cell)
        .collect())
}

/// Collapse runs of equal cells. A transition is placed halfway between the last
/// sample of one cell and the first sample of the next.
fn into_visits(samples: &[Sample]) -> Vec<CellVisit> {
    let mut visits: Vec<CellVisit> = Vec::new();
    let mut last_fraction = 0.0;
    for sample in samples {
        match visits.last_mut() {
            Some(visit) if visit.cell == sample.cell => {}
            Some(visit) => {
                let boundary = 0.5 * (last_fraction + sample.fraction);
                visit.exit_fraction = boundary;
                visits.push(CellVisit {
                    cell: sample.cell,
                    entry_fraction: boundary,
                    exit_fraction: 1.0,
                });
            }
            None => visits.push(CellVisit {
                cell: sample.cell,
                entry_fraction: 0.0,
                exit_fraction: 1.0,
            }),
        }
        last_fraction = sample.fraction;
    }
    visits
}
