//! Error types for the cell-generation engine.

use thiserror::Error;

/// Validation failures raised before any cell is generated.
///
/// Every variant is a caller error: the engine is deterministic, so retrying the same
/// input fails the same way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Fewer than two waypoints, or timestamps going backwards.
    #[error("Invalid trajectory: {0}")]
    InvalidTrajectory(String),

    /// Malformed polygon ring (unclosed, degenerate, self-intersecting).
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Resolution outside the grid system's supported range.
    #[error("Resolution {resolution} is out of range for {grid} (valid: {min}..={max})")]
    InvalidResolution {
        grid: &'static str,
        resolution: u8,
        min: u8,
        max: u8,
    },

    /// Out-of-domain scalar input (negative buffers, bad coordinates, speeds).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A cell id string that does not decode for the selected grid system.
    #[error("Invalid cell id: {0}")]
    InvalidCellId(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
