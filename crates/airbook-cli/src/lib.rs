//! airbook CLI - command line access to the cell-generation engine.
//!
//! The `airbook` binary reads trajectories and volumes as JSON, books them on the
//! selected grid and writes the bookings to stdout as JSON.

pub mod config;
pub mod io;

pub use config::CliConfig;
pub use io::{read_trajectory, read_volume, write_json};
