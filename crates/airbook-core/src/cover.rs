//! Polygon coverer: every cell whose area intersects a closed footprint ring.

use crate::error::{Error, Result};
use crate::grid::GridSystem;
use crate::models::{CellHandle, GeoPoint};
use crate::sampler::sample_segment;
use crate::spatial::{point_in_ring, segments_intersect_2d, LocalFrame};
use std::collections::{BTreeSet, VecDeque};

/// Check that `ring` is a closed, simple polygon with at least three distinct vertices.
pub fn validate_ring(ring: &[GeoPoint]) -> Result<()> {
    if let Some(p) = ring.iter().find(|p| !p.is_valid()) {
        return Err(Error::InvalidGeometry(format!(
            "vertex (lon {}, lat {}) is out of range",
            p.lon, p.lat
        )));
    }
    let (Some(first), Some(last)) = (ring.first(), ring.last()) else {
        return Err(Error::InvalidGeometry("footprint is empty".to_string()));
    };
    if ring.len() < 2 || !first.same_position(last) {
        return Err(Error::InvalidGeometry(
            "footprint ring is not closed (first vertex must equal last)".to_string(),
        ));
    }

    let vertices = distinct_vertices(ring);
    let mut unique: Vec<(u64, u64)> = vertices
        .iter()
        .map(|p| (p.lon.to_bits(), p.lat.to_bits()))
        .collect();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "footprint needs at least 3 distinct vertices, got {}",
            unique.len()
        )));
    }

    let frame = LocalFrame::around(&vertices);
    let projected: Vec<(f64, f64)> = vertices.iter().map(|p| frame.project(p)).collect();
    let n = projected.len();
    for i in 0..n {
        let a1 = projected[i];
        let a2 = projected[(i + 1) % n];
        for j in (i + 1)..n {
            // Edges sharing a vertex always touch.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let b1 = projected[j];
            let b2 = projected[(j + 1) % n];
            if segments_intersect_2d(a1, a2, b1, b2) {
                return Err(Error::InvalidGeometry(format!(
                    "footprint edges {} and {} intersect",
                    i, j
                )));
            }
        }
    }
    Ok(())
}

/// Open ring with the closing vertex and consecutive repeats removed.
fn distinct_vertices(ring: &[GeoPoint]) -> Vec<GeoPoint> {
    let mut out: Vec<GeoPoint> = Vec::with_capacity(ring.len());
    for p in &ring[..ring.len() - 1] {
        if out.last().is_some_and(|last| last.same_position(p)) {
            continue;
        }
        out.push(*p);
    }
    while out.len() > 1 && out[0].same_position(&out[out.len() - 1]) {
        out.pop();
    }
    out
}

/// Cover `ring` at `resolution`, returning handles sorted and deduplicated.
///
/// Boundary cells come from tracing each edge. From there the cover grows through
/// neighbours whose center lies inside the ring or whose outline touches it, so cells
/// the footprint only clips are kept too.
pub fn cover_polygon<G: GridSystem + ?Sized>(
    grid: &G,
    ring: &[GeoPoint],
    resolution: u8,
) -> Result<Vec<CellHandle>> {
    grid.check_resolution(resolution)?;
    validate_ring(ring)?;

    let vertices = distinct_vertices(ring);
    let frame = LocalFrame::around(&vertices);
    let projected: Vec<(f64, f64)> = vertices.iter().map(|p| frame.project(p)).collect();

    let mut covered: BTreeSet<CellHandle> = BTreeSet::new();
    for (i, a) in vertices.iter().enumerate() {
        let b = &vertices[(i + 1) % vertices.len()];
        covered.extend(sample_segment(grid, a, b, resolution)?);
    }

    let mut seen = covered.clone();
    let mut queue: VecDeque<CellHandle> = covered.iter().copied().collect();
    while let Some(cell) = queue.pop_front() {
        for neighbor in grid.neighbors(cell)? {
            if !seen.insert(neighbor) {
                continue;
            }
            let center = frame.project(&grid.cell_center(neighbor)?);
            if point_in_ring(&projected, center)
                || outline_touches_ring(grid, neighbor, &frame, &projected)?
            {
                covered.insert(neighbor);
                queue.push_back(neighbor);
            }
        }
    }

    tracing::trace!(
        grid = %grid.kind(),
        resolution,
        cells = covered.len(),
        "Covered footprint"
    );
    Ok(covered.into_iter().collect())
}

/// True when the outline of `cell` crosses, touches or encloses the projected ring.
pub(crate) fn outline_touches_ring<G: GridSystem + ?Sized>(
    grid: &G,
    cell: CellHandle,
    frame: &LocalFrame,
    ring: &[(f64, f64)],
) -> Result<bool> {
    let outline: Vec<(f64, f64)> = grid
        .cell_to_boundary(cell)?
        .iter()
        .map(|p| frame.project(p))
        .collect();
    if outline.iter().any(|p| point_in_ring(ring, *p))
        || ring.iter().any(|p| point_in_ring(&outline, *p))
    {
        return Ok(true);
    }
    let (n, m) = (outline.len(), ring.len());
    for i in 0..n {
        let (a1, a2) = (outline[i], outline[(i + 1) % n]);
        for j in 0..m {
            if segments_intersect_2d(a1, a2, ring[j], ring[(j + 1) % m]) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
