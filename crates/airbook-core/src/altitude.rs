//! Altitude bander: maps altitudes onto fixed-height vertical layers.
//!
//! Layers only partition cell identity in 3D mode; they never change timing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Default layer height in meters.
pub const DEFAULT_LAYER_HEIGHT_M: f64 = 40.0;

/// Highest layer index; ids carry the layer as two hex characters.
pub const MAX_LAYER: u8 = u8::MAX;

/// Uniform altitude layers starting at 0 m.
///
/// Layers run from 0 to [`MAX_LAYER`], so the bookable ceiling is
/// `256 * layer_height_m` (10,240 m at the default 40 m). Altitudes above it fail
/// with [`crate::Error::InvalidArgument`]; pick taller layers for higher airspace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalBands {
    pub layer_height_m: f64,
}

impl Default for VerticalBands {
    fn default() -> Self {
        Self {
            layer_height_m: DEFAULT_LAYER_HEIGHT_M,
        }
    }
}

impl VerticalBands {
    pub fn new(layer_height_m: f64) -> Result<Self> {
        let bands = Self { layer_height_m };
        bands.validate()?;
        Ok(bands)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layer_height_m.is_finite() && self.layer_height_m > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "vertical layer height must be positive, got {}",
                self.layer_height_m
            )))
        }
    }

    /// Layer containing `altitude_m`. Negative altitudes fall in layer 0.
    pub fn layer_at(&self, altitude_m: f64) -> Result<u8> {
        self.checked_layer((self.scaled(altitude_m)?).floor())
    }

    /// Every layer touched by the closed altitude range `[lo_m, hi_m]`.
    ///
    /// A range ending exactly on a layer boundary does not spill into the layer above.
    pub fn layers_for_range(&self, lo_m: f64, hi_m: f64) -> Result<RangeInclusive<u8>> {
        if lo_m > hi_m {
            return Err(Error::InvalidArgument(format!(
                "altitude floor {} is above ceiling {}",
                lo_m, hi_m
            )));
        }
        let first = self.layer_at(lo_m)?;
        let top = self.scaled(hi_m)?.ceil() - 1.0;
        let last = self.checked_layer(top.max(f64::from(first)))?;
        Ok(first..=last)
    }

    fn scaled(&self, altitude_m: f64) -> Result<f64> {
        if !altitude_m.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "altitude {} is not finite",
                altitude_m
            )));
        }
        Ok(altitude_m.max(0.0) / self.layer_height_m)
    }

    fn checked_layer(&self, index: f64) -> Result<u8> {
        if index > f64::from(MAX_LAYER) {
            return Err(Error::InvalidArgument(format!(
                "altitude exceeds the top layer ({} layers of {} m)",
                u16::from(MAX_LAYER) + 1,
                self.layer_height_m
            )));
        }
        Ok(index.max(0.0) as u8)
    }
}
