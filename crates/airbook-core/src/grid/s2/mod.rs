//! Spherical quadrilateral hierarchical grid (S2 cells).

mod cell_id;
mod coords;

pub use cell_id::{init_tables, S2CellId};

use super::{GridKind, GridSystem};
use crate::error::{Error, Result};
use crate::models::{CellHandle, GeoPoint};
use crate::spatial::EARTH_RADIUS_M;
use std::ops::RangeInclusive;

/// Average cell edge at level 0, in radians.
const AVG_EDGE_DERIV: f64 = 1.459_213_746_386_106;

/// S2 backend. The Hilbert lookup tables are built once per process.
#[derive(Debug, Clone, Copy, Default)]
pub struct S2Grid;

fn to_id(cell: CellHandle) -> Result<S2CellId> {
    let id = S2CellId::new(cell.0);
    if id.is_valid() {
        Ok(id)
    } else {
        Err(Error::InvalidCellId(format!("{:#x} is not an S2 cell", cell.0)))
    }
}

fn to_point((lat, lng): (f64, f64)) -> GeoPoint {
    GeoPoint::flat(lng, lat)
}

impl GridSystem for S2Grid {
    fn kind(&self) -> GridKind {
        GridKind::S2
    }

    fn resolution_range(&self) -> RangeInclusive<u8> {
        0..=cell_id::MAX_LEVEL
    }

    fn point_to_cell(&self, point: &GeoPoint, resolution: u8) -> Result<CellHandle> {
        self.check_resolution(resolution)?;
        if !point.is_valid() {
            return Err(Error::InvalidArgument(format!(
                "coordinate ({}, {}) cannot be indexed",
                point.lat, point.lon
            )));
        }
        let leaf = S2CellId::from_lat_lng(point.lat, point.lon);
        Ok(CellHandle(leaf.parent(resolution).id()))
    }

    fn cell_to_boundary(&self, cell: CellHandle) -> Result<Vec<GeoPoint>> {
        Ok(to_id(cell)?.vertices().into_iter().map(to_point).collect())
    }

    fn cell_center(&self, cell: CellHandle) -> Result<GeoPoint> {
        Ok(to_point(to_id(cell)?.center()))
    }

    fn resolution_of(&self, cell: CellHandle) -> Result<u8> {
        Ok(to_id(cell)?.level())
    }

    fn parent(&self, cell: CellHandle, resolution: u8) -> Result<CellHandle> {
        let id = to_id(cell)?;
        self.check_resolution(resolution)?;
        if resolution > id.level() {
            return Err(Error::InvalidArgument(format!(
                "level {} is finer than cell {} (level {})",
                resolution,
                id.to_token(),
                id.level()
            )));
        }
        Ok(CellHandle(id.parent(resolution).id()))
    }

    fn neighbors(&self, cell: CellHandle) -> Result<Vec<CellHandle>> {
        let mut out: Vec<CellHandle> = to_id(cell)?
            .edge_neighbors()
            .into_iter()
            .map(|n| CellHandle(n.id()))
            .collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    fn edge_length_m(&self, resolution: u8) -> f64 {
        AVG_EDGE_DERIV * EARTH_RADIUS_M / f64::powi(2.0, i32::from(resolution))
    }

    fn format_cell(&self, cell: CellHandle) -> String {
        S2CellId::new(cell.0).to_token()
    }

    fn parse_cell(&self, token: &str) -> Result<CellHandle> {
        S2CellId::from_token(token)
            .map(|id| CellHandle(id.id()))
            .ok_or_else(|| Error::InvalidCellId(format!("'{}' is not an S2 token", token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_13_cell_is_about_a_kilometre() {
        let edge = S2Grid.edge_length_m(13);
        assert!(edge > 900.0 && edge < 1300.0, "edge {edge}");
    }

    #[test]
    fn boundary_surrounds_center() {
        let cell = S2Grid
            .point_to_cell(&GeoPoint::flat(-1.3920021, 50.9076876), 13)
            .unwrap();
        let boundary = S2Grid.cell_to_boundary(cell).unwrap();
        assert_eq!(boundary.len(), 4);
        let center = S2Grid.cell_center(cell).unwrap();
        let lat_min = boundary.iter().map(|p| p.lat).fold(f64::INFINITY, f64::min);
        let lat_max = boundary.iter().map(|p| p.lat).fold(f64::NEG_INFINITY, f64::max);
        assert!(center.lat > lat_min && center.lat < lat_max);
    }

    #[test]
    fn rejects_invalid_handles_and_points() {
        assert!(matches!(
            S2Grid.resolution_of(CellHandle(0)),
            Err(Error::InvalidCellId(_))
        ));
        assert!(matches!(
            S2Grid.point_to_cell(&GeoPoint::flat(0.0, 91.0), 10),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            S2Grid.parse_cell("hello"),
            Err(Error::InvalidCellId(_))
        ));
    }
}
