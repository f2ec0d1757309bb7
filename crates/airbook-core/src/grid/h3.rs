//! Hexagonal hierarchical grid backed by `h3o`.

use super::{GridKind, GridSystem};
use crate::error::{Error, Result};
use crate::models::{CellHandle, GeoPoint};
use crate::cover::validate_ring;
use h3o::geom::{ContainmentMode, PolyfillConfig, Polygon, ToCells};
use h3o::{CellIndex, LatLng, Resolution};
use std::ops::RangeInclusive;

/// H3 backend. `h3o` keeps its geometry tables in immutable statics, so the
/// backend itself carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct H3Grid;

fn to_resolution(resolution: u8) -> Result<Resolution> {
    Resolution::try_from(resolution).map_err(|_| Error::InvalidResolution {
        grid: "H3",
        resolution,
        min: 0,
        max: 15,
    })
}

fn to_index(cell: CellHandle) -> Result<CellIndex> {
    CellIndex::try_from(cell.0)
        .map_err(|err| Error::InvalidCellId(format!("{:#x} is not an H3 cell: {}", cell.0, err)))
}

fn to_point(ll: LatLng) -> GeoPoint {
    GeoPoint::flat(ll.lng(), ll.lat())
}

impl GridSystem for H3Grid {
    fn kind(&self) -> GridKind {
        GridKind::H3
    }

    fn resolution_range(&self) -> RangeInclusive<u8> {
        0..=15
    }

    fn point_to_cell(&self, point: &GeoPoint, resolution: u8) -> Result<CellHandle> {
        let resolution = to_resolution(resolution)?;
        let ll = LatLng::new(point.lat, point.lon).map_err(|err| {
            Error::InvalidArgument(format!(
                "coordinate ({}, {}) cannot be indexed: {}",
                point.lat, point.lon, err
            ))
        })?;
        Ok(CellHandle(u64::from(ll.to_cell(resolution))))
    }

    fn cell_to_boundary(&self, cell: CellHandle) -> Result<Vec<GeoPoint>> {
        let index = to_index(cell)?;
        Ok(index.boundary().iter().map(|ll| to_point(*ll)).collect())
    }

    fn cell_center(&self, cell: CellHandle) -> Result<GeoPoint> {
        let index = to_index(cell)?;
        Ok(to_point(LatLng::from(index)))
    }

    fn resolution_of(&self, cell: CellHandle) -> Result<u8> {
        Ok(u8::from(to_index(cell)?.resolution()))
    }

    fn parent(&self, cell: CellHandle, resolution: u8) -> Result<CellHandle> {
        let index = to_index(cell)?;
        let target = to_resolution(resolution)?;
        index
            .parent(target)
            .map(|parent| CellHandle(u64::from(parent)))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "resolution {} is finer than cell {} (resolution {})",
                    resolution,
                    index,
                    u8::from(index.resolution())
                ))
            })
    }

    fn neighbors(&self, cell: CellHandle) -> Result<Vec<CellHandle>> {
        let index = to_index(cell)?;
        let mut ring: Vec<CellHandle> = index
            .grid_disk::<Vec<_>>(1)
            .into_iter()
            .filter(|neighbor| *neighbor != index)
            .map(|neighbor| CellHandle(u64::from(neighbor)))
            .collect();
        ring.sort_unstable();
        Ok(ring)
    }

    fn are_neighbors(&self, a: CellHandle, b: CellHandle) -> Result<bool> {
        let a = to_index(a)?;
        let b = to_index(b)?;
        // Cells at different resolutions are never neighbours.
        Ok(a.is_neighbor_with(b).unwrap_or(false))
    }

    fn edge_length_m(&self, resolution: u8) -> f64 {
        to_resolution(resolution)
            .map(|res| res.edge_length_m())
            .unwrap_or(f64::NAN)
    }

    fn format_cell(&self, cell: CellHandle) -> String {
        match CellIndex::try_from(cell.0) {
            Ok(index) => index.to_string(),
            Err(_) => format!("{:x}", cell.0),
        }
    }

    fn parse_cell(&self, token: &str) -> Result<CellHandle> {
        token
            .parse::<CellIndex>()
            .map(|index| CellHandle(u64::from(index)))
            .map_err(|err| Error::InvalidCellId(format!("'{}' is not an H3 cell: {}", token, err)))
    }

    /// Native polyfill in `Covers` mode: every cell overlapping the footprint, even
    /// partially.
    fn polygon_cover(&self, ring: &[GeoPoint], resolution: u8) -> Result<Vec<CellHandle>> {
        let resolution = to_resolution(resolution)?;
        validate_ring(ring)?;
        let exterior: geo_types::LineString<f64> = ring
            .iter()
            .map(|p| geo_types::Coord { x: p.lon, y: p.lat })
            .collect();
        let polygon = Polygon::from_degrees(geo_types::Polygon::new(exterior, Vec::new()))
            .map_err(|err| Error::InvalidGeometry(format!("footprint rejected by H3: {}", err)))?;
        let config = PolyfillConfig::new(resolution).containment_mode(ContainmentMode::Covers);
        let mut cells: Vec<CellHandle> = polygon
            .to_cells(config)
            .map(|cell| CellHandle(u64::from(cell)))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_southampton_reference_cell() {
        // Reference value from the H3 C library.
        let cell = H3Grid
            .point_to_cell(&GeoPoint::flat(-1.39200210, 50.90768760), 9)
            .unwrap();
        assert_eq!(H3Grid.format_cell(cell), "8919591565bffff");
    }

    #[test]
    fn reference_cell_center_is_near_input() {
        let cell = H3Grid.parse_cell("8919591565bffff").unwrap();
        let center = H3Grid.cell_center(cell).unwrap();
        assert!((center.lat - 50.90768760).abs() < 1e-2);
        assert!((center.lon - -1.39200210).abs() < 1e-2);
    }

    #[test]
    fn hexagon_has_six_neighbors() {
        let cell = H3Grid.parse_cell("8919591565bffff").unwrap();
        assert_eq!(H3Grid.neighbors(cell).unwrap().len(), 6);
        assert_eq!(H3Grid.cell_to_boundary(cell).unwrap().len(), 6);
    }

    #[test]
    fn edge_length_shrinks_with_resolution() {
        for res in 0..15 {
            assert!(H3Grid.edge_length_m(res) > H3Grid.edge_length_m(res + 1));
        }
    }

    fn harbour_square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::flat(-1.42, 50.89),
            GeoPoint::flat(-1.39, 50.89),
            GeoPoint::flat(-1.39, 50.91),
            GeoPoint::flat(-1.42, 50.91),
            GeoPoint::flat(-1.42, 50.89),
        ]
    }

    #[test]
    fn cover_keeps_cells_clipped_at_a_corner() {
        let cells = H3Grid.polygon_cover(&harbour_square(), 8).unwrap();
        // Overlaps the square by a sliver only; its center is well outside.
        let clipped = H3Grid.parse_cell("88195910b7fffff").unwrap();
        assert!(cells.binary_search(&clipped).is_ok());
        assert_eq!(cells.len(), 14);
    }

    #[test]
    fn cover_includes_every_cell_touching_the_outline() {
        let ring = harbour_square();
        for res in [7u8, 8, 9] {
            let cells = H3Grid.polygon_cover(&ring, res).unwrap();
            for pair in ring.windows(2) {
                for cell in crate::sampler::sample_segment(&H3Grid, &pair[0], &pair[1], res).unwrap() {
                    assert!(cells.binary_search(&cell).is_ok(), "res {res}");
                }
            }
        }
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert!(matches!(
            H3Grid.parse_cell("not-a-cell"),
            Err(Error::InvalidCellId(_))
        ));
        assert!(H3Grid.point_to_cell(&GeoPoint::flat(0.0, f64::NAN), 5).is_err());
    }
}
