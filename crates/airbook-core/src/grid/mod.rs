//! Grid adapter: one capability interface over the hexagonal (H3) and spherical
//! quadrilateral (S2) hierarchical grids.
//!
//! Everything above this module works against `&dyn GridSystem` and never inspects
//! which backend it has. Both backends are stateless unit structs over immutable
//! tables, so a single `&'static` instance is shared by every thread.

mod h3;
pub mod s2;

pub use h3::H3Grid;
pub use s2::S2Grid;

use crate::error::{Error, Result};
use crate::models::{CellHandle, GeoPoint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Capability set shared by every grid backend.
pub trait GridSystem: Send + Sync {
    /// Which backend this is (used for error messages and id codecs).
    fn kind(&self) -> GridKind;

    /// Supported resolution range, inclusive.
    fn resolution_range(&self) -> RangeInclusive<u8>;

    fn is_valid_resolution(&self, resolution: u8) -> bool {
        self.resolution_range().contains(&resolution)
    }

    /// Fail with [`Error::InvalidResolution`] outside the supported range.
    fn check_resolution(&self, resolution: u8) -> Result<()> {
        if self.is_valid_resolution(resolution) {
            return Ok(());
        }
        let range = self.resolution_range();
        Err(Error::InvalidResolution {
            grid: self.kind().name(),
            resolution,
            min: *range.start(),
            max: *range.end(),
        })
    }

    /// Cell containing `point` at `resolution`.
    fn point_to_cell(&self, point: &GeoPoint, resolution: u8) -> Result<CellHandle>;

    /// Cell outline as an open ring of vertices (no repeated closing vertex).
    fn cell_to_boundary(&self, cell: CellHandle) -> Result<Vec<GeoPoint>>;

    fn cell_center(&self, cell: CellHandle) -> Result<GeoPoint>;

    fn resolution_of(&self, cell: CellHandle) -> Result<u8>;

    /// Ancestor of `cell` at a coarser (or equal) resolution.
    fn parent(&self, cell: CellHandle, resolution: u8) -> Result<CellHandle>;

    /// Cells sharing an edge with `cell`, in a deterministic order.
    fn neighbors(&self, cell: CellHandle) -> Result<Vec<CellHandle>>;

    fn are_neighbors(&self, a: CellHandle, b: CellHandle) -> Result<bool> {
        Ok(self.neighbors(a)?.contains(&b))
    }

    /// Characteristic edge length in meters at `resolution`; sizes sampling steps.
    fn edge_length_m(&self, resolution: u8) -> f64;

    /// Native string form of a horizontal cell.
    fn format_cell(&self, cell: CellHandle) -> String;

    /// Inverse of [`GridSystem::format_cell`].
    fn parse_cell(&self, token: &str) -> Result<CellHandle>;

    /// Every cell intersecting the closed `ring` at `resolution`.
    fn polygon_cover(&self, ring: &[GeoPoint], resolution: u8) -> Result<Vec<CellHandle>> {
        crate::cover::cover_polygon(self, ring, resolution)
    }
}

/// Grid system selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// Hexagonal hierarchical grid
    H3,
    /// Spherical quadrilateral hierarchical grid
    S2,
}

static H3_GRID: H3Grid = H3Grid;
static S2_GRID: S2Grid = S2Grid;

impl GridKind {
    pub fn name(self) -> &'static str {
        match self {
            GridKind::H3 => "H3",
            GridKind::S2 => "S2",
        }
    }

    /// The process-wide backend instance for this kind.
    pub fn system(self) -> &'static dyn GridSystem {
        match self {
            GridKind::H3 => &H3_GRID,
            GridKind::S2 => &S2_GRID,
        }
    }

    /// Default booking resolution: H3 8, S2 13.
    pub fn default_resolution(self) -> u8 {
        match self {
            GridKind::H3 => 8,
            GridKind::S2 => 13,
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GridKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "h3" => Ok(GridKind::H3),
            "s2" => Ok(GridKind::S2),
            other => Err(Error::InvalidArgument(format!(
                "unknown grid system '{}' (expected h3 or s2)",
                other
            ))),
        }
    }
}

/// Build every backend's lookup tables up front instead of on first use.
pub fn warm_up() {
    s2::init_tables();
    tracing::debug!("Grid tables initialised");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_kind_parses_case_insensitively() {
        assert_eq!("H3".parse::<GridKind>().unwrap(), GridKind::H3);
        assert_eq!(" s2 ".parse::<GridKind>().unwrap(), GridKind::S2);
        assert!(matches!(
            "geohash".parse::<GridKind>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn invalid_resolution_reports_range() {
        let err = GridKind::H3.system().check_resolution(16).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidResolution {
                grid: "H3",
                resolution: 16,
                min: 0,
                max: 15
            }
        );
        assert!(GridKind::S2.system().check_resolution(30).is_ok());
        assert!(GridKind::S2.system().check_resolution(31).is_err());
    }

    #[test]
    fn both_backends_round_trip_parent_and_tokens() {
        let point = GeoPoint::flat(-1.3920021, 50.9076876);
        for kind in [GridKind::H3, GridKind::S2] {
            let grid = kind.system();
            let res = kind.default_resolution();
            let cell = grid.point_to_cell(&point, res).unwrap();
            assert_eq!(grid.resolution_of(cell).unwrap(), res);
            let parent = grid.parent(cell, res - 2).unwrap();
            assert_eq!(grid.resolution_of(parent).unwrap(), res - 2);
            assert_eq!(
                grid.point_to_cell(&point, res - 2).unwrap(),
                parent,
                "{kind} parent must contain the point"
            );
            let token = grid.format_cell(cell);
            assert_eq!(grid.parse_cell(&token).unwrap(), cell);
            assert!(grid.parent(cell, res + 1).is_err());
        }
    }

    #[test]
    fn neighbors_are_symmetric() {
        let point = GeoPoint::flat(-1.3920021, 50.9076876);
        for kind in [GridKind::H3, GridKind::S2] {
            let grid = kind.system();
            let cell = grid.point_to_cell(&point, kind.default_resolution()).unwrap();
            let neighbors = grid.neighbors(cell).unwrap();
            assert!(!neighbors.is_empty());
            assert!(!neighbors.contains(&cell));
            for n in neighbors {
                assert!(
                    grid.are_neighbors(n, cell).unwrap(),
                    "{kind} adjacency must be symmetric"
                );
            }
        }
    }

    #[test]
    fn center_lies_in_its_own_cell() {
        let point = GeoPoint::flat(36.931524, -17.854491);
        for kind in [GridKind::H3, GridKind::S2] {
            let grid = kind.system();
            let cell = grid.point_to_cell(&point, kind.default_resolution()).unwrap();
            let center = grid.cell_center(cell).unwrap();
            assert_eq!(grid.point_to_cell(&center, kind.default_resolution()).unwrap(), cell);
            assert!(grid.cell_to_boundary(cell).unwrap().len() >= 4);
        }
    }
}
