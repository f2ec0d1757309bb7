//! CLI defaults from environment.

use airbook_core::{GridKind, TrajectoryOptions, DEFAULT_LAYER_HEIGHT_M};
use std::env;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub grid: GridKind,
    pub h3_resolution: u8,
    pub s2_resolution: u8,
    pub vertical_resolution_m: f64,
    pub backward_buffer_s: i64,
    pub forward_buffer_s: i64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            grid: GridKind::H3,
            h3_resolution: GridKind::H3.default_resolution(),
            s2_resolution: GridKind::S2.default_resolution(),
            vertical_resolution_m: DEFAULT_LAYER_HEIGHT_M,
            backward_buffer_s: 300,
            forward_buffer_s: 600,
        }
    }
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            grid: lookup("AIRBOOK_GRID")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.grid),
            h3_resolution: lookup("AIRBOOK_H3_RESOLUTION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.h3_resolution),
            s2_resolution: lookup("AIRBOOK_S2_RESOLUTION")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.s2_resolution),
            vertical_resolution_m: lookup("AIRBOOK_VERTICAL_RESOLUTION_M")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.vertical_resolution_m),
            backward_buffer_s: lookup("AIRBOOK_BACKWARD_BUFFER_S")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.backward_buffer_s),
            forward_buffer_s: lookup("AIRBOOK_FORWARD_BUFFER_S")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.forward_buffer_s),
        }
    }

    /// Configured resolution for `grid`.
    pub fn resolution_for(&self, grid: GridKind) -> u8 {
        match grid {
            GridKind::H3 => self.h3_resolution,
            GridKind::S2 => self.s2_resolution,
        }
    }

    pub fn trajectory_options(&self) -> TrajectoryOptions {
        TrajectoryOptions {
            temporal_backward_buffer_s: self.backward_buffer_s,
            temporal_forward_buffer_s: self.forward_buffer_s,
            ..TrajectoryOptions::default()
        }
    }
}
