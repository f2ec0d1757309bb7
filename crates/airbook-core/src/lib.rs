pub mod altitude;
pub mod codec;
pub mod cover;
pub mod engine;
pub mod error;
pub mod grid;
pub mod models;
pub mod sampler;
pub mod spatial;
pub mod temporal;

pub use altitude::{VerticalBands, DEFAULT_LAYER_HEIGHT_M};
pub use codec::{geo_to_h3, geo_to_h3d, geo_to_s2, geo_to_s23d, ParsedCellId};
pub use cover::cover_polygon;
pub use engine::{
    h3_cell_bookings, h3_volume_bookings, h3d_cell_bookings, h3d_volume_bookings,
    s23d_cell_bookings, s23d_volume_bookings, s2_cell_bookings, s2_volume_bookings, CellEngine,
    EngineConfig,
};
pub use error::{Error, Result};
pub use grid::{GridKind, GridSystem, H3Grid, S2Grid};
pub use models::{
    sort_bookings, CellBooking, CellHandle, CellId, GeoPoint, StateVector4D, TimeSlice, Volume4D,
};
pub use sampler::{sample_segment, trace_segment, CellVisit};
pub use spatial::haversine_distance;
pub use temporal::{annotate_trajectory, BookedCell, TrajectoryOptions};
