//! Engine facade: validated configuration plus the trajectory and volume operations.

use crate::altitude::VerticalBands;
use crate::codec::{self, ParsedCellId};
use crate::cover::validate_ring;
use crate::error::{Error, Result};
use crate::grid::{GridKind, GridSystem};
use crate::models::{sort_bookings, CellBooking, CellId, GeoPoint, StateVector4D, Volume4D};
use crate::temporal::{annotate_trajectory, TrajectoryOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which grid, at which resolution, and whether ids carry a vertical layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub grid: GridKind,
    pub resolution: u8,
    /// `Some` switches to altitude-aware (3D) ids.
    #[serde(default)]
    pub vertical: Option<VerticalBands>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::h3(GridKind::H3.default_resolution())
    }
}

impl EngineConfig {
    pub fn h3(resolution: u8) -> Self {
        Self {
            grid: GridKind::H3,
            resolution,
            vertical: None,
        }
    }

    pub fn h3d(resolution: u8, layer_height_m: f64) -> Self {
        Self {
            vertical: Some(VerticalBands { layer_height_m }),
            ..Self::h3(resolution)
        }
    }

    pub fn s2(resolution: u8) -> Self {
        Self {
            grid: GridKind::S2,
            resolution,
            vertical: None,
        }
    }

    pub fn s23d(resolution: u8, layer_height_m: f64) -> Self {
        Self {
            vertical: Some(VerticalBands { layer_height_m }),
            ..Self::s2(resolution)
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.grid.system().check_resolution(self.resolution)?;
        if let Some(bands) = &self.vertical {
            bands.validate()?;
        }
        Ok(())
    }
}

/// Stateless cell-booking engine. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct CellEngine {
    config: EngineConfig,
    grid: &'static dyn GridSystem,
}

impl fmt::Debug for CellEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellEngine")
            .field("config", &self.config)
            .finish()
    }
}

impl CellEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            grid: config.grid.system(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn grid(&self) -> &'static dyn GridSystem {
        self.grid
    }

    /// Bookings for a 4D trajectory, sorted by start time (ties by cell id).
    pub fn trajectory_bookings(
        &self,
        trajectory: &[StateVector4D],
        options: &TrajectoryOptions,
    ) -> Result<Vec<CellBooking>> {
        let booked = annotate_trajectory(
            self.grid,
            self.config.resolution,
            self.config.vertical.as_ref(),
            trajectory,
            options,
        )?;
        let mut bookings: Vec<CellBooking> = booked
            .into_iter()
            .map(|b| CellBooking::new(codec::render(self.grid, b.cell, b.layer), b.time_slice))
            .collect();
        sort_bookings(&mut bookings);

        tracing::debug!(
            grid = %self.config.grid,
            resolution = self.config.resolution,
            layered = self.config.vertical.is_some(),
            waypoints = trajectory.len(),
            cells = bookings.len(),
            "Generated trajectory bookings"
        );
        Ok(bookings)
    }

    /// Bookings for a static volume. Every cell carries the volume's time slice.
    pub fn volume_bookings(&self, volume: &Volume4D) -> Result<Vec<CellBooking>> {
        validate_volume(volume)?;
        let cells = self
            .grid
            .polygon_cover(&volume.footprint, self.config.resolution)?;

        let mut bookings = Vec::with_capacity(cells.len());
        for cell in cells {
            match &self.config.vertical {
                Some(bands) => {
                    for layer in
                        bands.layers_for_range(volume.altitude_min_m, volume.altitude_max_m)?
                    {
                        bookings.push(CellBooking::new(
                            codec::render(self.grid, cell, Some(layer)),
                            volume.time_slice,
                        ));
                    }
                }
                None => bookings.push(CellBooking::new(
                    codec::render(self.grid, cell, None),
                    volume.time_slice,
                )),
            }
        }
        sort_bookings(&mut bookings);

        tracing::debug!(
            grid = %self.config.grid,
            resolution = self.config.resolution,
            layered = self.config.vertical.is_some(),
            vertices = volume.footprint.len(),
            cells = bookings.len(),
            "Generated volume bookings"
        );
        Ok(bookings)
    }

    /// Id of the cell (and layer, in 3D mode) containing `point`.
    pub fn index_point(&self, point: &GeoPoint) -> Result<CellId> {
        let cell = self.grid.point_to_cell(point, self.config.resolution)?;
        let layer = match &self.config.vertical {
            Some(bands) => Some(bands.layer_at(point.altitude_m)?),
            None => None,
        };
        Ok(codec::render(self.grid, cell, layer))
    }

    /// Decode an id in this engine's format.
    pub fn parse_id(&self, id: &str) -> Result<ParsedCellId> {
        codec::parse(self.grid, id, self.config.vertical.is_some())
    }
}

fn validate_volume(volume: &Volume4D) -> Result<()> {
    validate_ring(&volume.footprint)?;
    let (floor, ceiling) = (volume.altitude_min_m, volume.altitude_max_m);
    if !floor.is_finite() || !ceiling.is_finite() || floor > ceiling {
        return Err(Error::InvalidArgument(format!(
            "volume altitude range [{}, {}] is invalid",
            floor, ceiling
        )));
    }
    if volume.time_slice.start > volume.time_slice.end {
        return Err(Error::InvalidArgument(format!(
            "volume time slice ends ({}) before it starts ({})",
            volume.time_slice.end, volume.time_slice.start
        )));
    }
    Ok(())
}

fn trajectory_with(
    config: EngineConfig,
    trajectory: &[StateVector4D],
    options: &TrajectoryOptions,
) -> Result<Vec<CellBooking>> {
    CellEngine::new(config)?.trajectory_bookings(trajectory, options)
}

fn volume_with(config: EngineConfig, volume: &Volume4D) -> Result<Vec<CellBooking>> {
    CellEngine::new(config)?.volume_bookings(volume)
}

/// 2D H3 bookings for a trajectory.
pub fn h3_cell_bookings(
    trajectory: &[StateVector4D],
    resolution: u8,
    options: &TrajectoryOptions,
) -> Result<Vec<CellBooking>> {
    trajectory_with(EngineConfig::h3(resolution), trajectory, options)
}

/// Layered H3 bookings for a trajectory.
pub fn h3d_cell_bookings(
    trajectory: &[StateVector4D],
    resolution: u8,
    layer_height_m: f64,
    options: &TrajectoryOptions,
) -> Result<Vec<CellBooking>> {
    trajectory_with(
        EngineConfig::h3d(resolution, layer_height_m),
        trajectory,
        options,
    )
}

/// 2D S2 bookings for a trajectory.
pub fn s2_cell_bookings(
    trajectory: &[StateVector4D],
    resolution: u8,
    options: &TrajectoryOptions,
) -> Result<Vec<CellBooking>> {
    trajectory_with(EngineConfig::s2(resolution), trajectory, options)
}

/// Layered S2 bookings for a trajectory.
pub fn s23d_cell_bookings(
    trajectory: &[StateVector4D],
    resolution: u8,
    layer_height_m: f64,
    options: &TrajectoryOptions,
) -> Result<Vec<CellBooking>> {
    trajectory_with(
        EngineConfig::s23d(resolution, layer_height_m),
        trajectory,
        options,
    )
}

pub fn h3_volume_bookings(volume: &Volume4D, resolution: u8) -> Result<Vec<CellBooking>> {
    volume_with(EngineConfig::h3(resolution), volume)
}

pub fn h3d_volume_bookings(
    volume: &Volume4D,
    resolution: u8,
    layer_height_m: f64,
) -> Result<Vec<CellBooking>> {
    volume_with(EngineConfig::h3d(resolution, layer_height_m), volume)
}

pub fn s2_volume_bookings(volume: &Volume4D, resolution: u8) -> Result<Vec<CellBooking>> {
    volume_with(EngineConfig::s2(resolution), volume)
}

pub fn s23d_volume_bookings(
    volume: &Volume4D,
    resolution: u8,
    layer_height_m: f64,
) -> Result<Vec<CellBooking>> {
    volume_with(EngineConfig::s23d(resolution, layer_height_m), volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSlice;
    use chrono::{TimeZone, Utc};

    #[test]
    fn new_rejects_bad_config() {
        assert!(matches!(
            CellEngine::new(EngineConfig::h3(16)),
            Err(Error::InvalidResolution { .. })
        ));
        assert!(matches!(
            CellEngine::new(EngineConfig::s23d(13, 0.0)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(CellEngine::new(EngineConfig::default()).is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::s23d(13, 30.0);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"s2\""));
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn volume_rejects_inverted_altitudes() {
        let t = Utc.timestamp_opt(1_577_880_000, 0).unwrap();
        let volume = Volume4D {
            footprint: vec![
                GeoPoint::flat(0.0, 0.0),
                GeoPoint::flat(0.01, 0.0),
                GeoPoint::flat(0.01, 0.01),
                GeoPoint::flat(0.0, 0.0),
            ],
            altitude_min_m: 100.0,
            altitude_max_m: 50.0,
            time_slice: TimeSlice::instant(t),
        };
        assert!(matches!(
            h3d_volume_bookings(&volume, 8, 40.0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn index_point_follows_mode() {
        let engine = CellEngine::new(EngineConfig::h3d(9, 40.0)).unwrap();
        let id = engine
            .index_point(&GeoPoint::new(-1.39200210, 50.90768760, 85.0))
            .unwrap();
        assert_eq!(id.as_str(), "8919591565bffff02");
        assert_eq!(engine.parse_id(id.as_str()).unwrap().layer, Some(2));
    }
}
