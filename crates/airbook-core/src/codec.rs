//! Cell identity codec: horizontal cell plus optional vertical layer <-> string id.
//!
//! 2D ids are the grid's native token. 3D ids append the layer as two lowercase hex
//! characters, so ids of different layers never collide and still sort by cell first.

use crate::altitude::VerticalBands;
use crate::error::{Error, Result};
use crate::grid::{GridKind, GridSystem};
use crate::models::{CellHandle, CellId, GeoPoint};

/// Characters used by the layer suffix.
pub const LAYER_SUFFIX_LEN: usize = 2;

/// Result of [`parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedCellId {
    pub cell: CellHandle,
    pub resolution: u8,
    pub layer: Option<u8>,
}

pub fn render(grid: &dyn GridSystem, cell: CellHandle, layer: Option<u8>) -> CellId {
    let token = grid.format_cell(cell);
    match layer {
        Some(layer) => CellId::new(format!("{}{:02x}", token, layer)),
        None => CellId::new(token),
    }
}

/// Decode an id produced by [`render`]. `layered` selects the 3D form.
pub fn parse(grid: &dyn GridSystem, id: &str, layered: bool) -> Result<ParsedCellId> {
    let (token, layer) = if layered {
        if id.len() <= LAYER_SUFFIX_LEN || !id.is_ascii() {
            return Err(Error::InvalidCellId(format!(
                "'{}' is too short for a layered id",
                id
            )));
        }
        let (token, suffix) = id.split_at(id.len() - LAYER_SUFFIX_LEN);
        if suffix.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(Error::InvalidCellId(format!(
                "layer suffix '{}' must be lowercase hex",
                suffix
            )));
        }
        let layer = u8::from_str_radix(suffix, 16).map_err(|_| {
            Error::InvalidCellId(format!("layer suffix '{}' is not hex", suffix))
        })?;
        (token, Some(layer))
    } else {
        (id, None)
    };
    let cell = grid.parse_cell(token)?;
    Ok(ParsedCellId {
        cell,
        resolution: grid.resolution_of(cell)?,
        layer,
    })
}

/// Resolution-dependent fill of a native token.
///
/// For H3 this is the minimum number of trailing `'f'` characters (unused digits are
/// all ones); for S2 it is the number of trailing zero nibbles stripped from the token.
pub fn padding_len(kind: GridKind, resolution: u8) -> usize {
    match kind {
        GridKind::H3 => 3 * 15usize.saturating_sub(resolution.into()) / 4,
        GridKind::S2 => 30usize.saturating_sub(resolution.into()) / 2,
    }
}

/// Native token length at `resolution`.
pub fn token_len(kind: GridKind, resolution: u8) -> usize {
    match kind {
        GridKind::H3 => 15,
        GridKind::S2 => 16 - padding_len(kind, resolution),
    }
}

fn index_point(
    kind: GridKind,
    point: GeoPoint,
    resolution: u8,
    vertical: Option<VerticalBands>,
) -> Result<CellId> {
    let grid = kind.system();
    let cell = grid.point_to_cell(&point, resolution)?;
    let layer = match vertical {
        Some(bands) => {
            bands.validate()?;
            Some(bands.layer_at(point.altitude_m)?)
        }
        None => None,
    };
    Ok(render(grid, cell, layer))
}

/// H3 id of the cell containing `(lat, lon)`.
pub fn geo_to_h3(lat: f64, lon: f64, resolution: u8) -> Result<CellId> {
    index_point(GridKind::H3, GeoPoint::flat(lon, lat), resolution, None)
}

/// Layered H3 id of the cell containing `(lat, lon, altitude_m)`.
pub fn geo_to_h3d(
    lat: f64,
    lon: f64,
    altitude_m: f64,
    resolution: u8,
    layer_height_m: f64,
) -> Result<CellId> {
    let bands = VerticalBands::new(layer_height_m)?;
    index_point(
        GridKind::H3,
        GeoPoint::new(lon, lat, altitude_m),
        resolution,
        Some(bands),
    )
}

/// S2 token of the cell containing `(lat, lon)`.
pub fn geo_to_s2(lat: f64, lon: f64, resolution: u8) -> Result<CellId> {
    index_point(GridKind::S2, GeoPoint::flat(lon, lat), resolution, None)
}

/// Layered S2 id of the cell containing `(lat, lon, altitude_m)`.
pub fn geo_to_s23d(
    lat: f64,
    lon: f64,
    altitude_m: f64,
    resolution: u8,
    layer_height_m: f64,
) -> Result<CellId> {
    let bands = VerticalBands::new(layer_height_m)?;
    index_point(
        GridKind::S2,
        GeoPoint::new(lon, lat, altitude_m),
        resolution,
        Some(bands),
    )
}
