//! Book trajectories and volumes onto H3 or S2 cells from the command line.

use airbook_cli::{read_trajectory, read_volume, write_json, CliConfig};
use airbook_core::{CellEngine, EngineConfig, GeoPoint, GridKind, VerticalBands};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Map 4D trajectories and volumes to grid cell bookings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Book the cells a trajectory flies through
    Trajectory {
        /// Trajectory JSON file, or - for stdin
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        grid: GridArgs,

        /// Seconds reserved before each cell is entered
        #[arg(long)]
        backward_buffer: Option<i64>,

        /// Seconds reserved after each cell is left
        #[arg(long)]
        forward_buffer: Option<i64>,

        /// Corridor half-width booked around the path, in meters
        #[arg(long, default_value_t = 0.0)]
        lateral_buffer: f64,

        /// Meters added above and below the path (layered mode)
        #[arg(long, default_value_t = 0.0)]
        vertical_buffer: f64,
    },
    /// Book the cells covering a static volume
    Volume {
        /// Volume JSON file, or - for stdin
        #[arg(long)]
        input: PathBuf,

        #[command(flatten)]
        grid: GridArgs,
    },
    /// Print the id of the cell containing a point
    IndexPoint {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Altitude in meters (layered mode)
        #[arg(long, default_value_t = 0.0)]
        alt: f64,

        #[command(flatten)]
        grid: GridArgs,
    },
    /// Decode a cell id
    ParseId {
        id: String,

        #[command(flatten)]
        grid: GridArgs,
    },
}

#[derive(Args, Debug)]
struct GridArgs {
    /// Grid system: h3 or s2 (default: AIRBOOK_GRID or h3)
    #[arg(long)]
    grid: Option<GridKind>,

    /// Grid resolution (default: AIRBOOK_H3_RESOLUTION / AIRBOOK_S2_RESOLUTION)
    #[arg(long)]
    resolution: Option<u8>,

    /// Append a vertical layer to every id
    #[arg(long)]
    layered: bool,

    /// Layer height in meters (default: AIRBOOK_VERTICAL_RESOLUTION_M or 40)
    #[arg(long)]
    vertical_resolution: Option<f64>,
}

impl GridArgs {
    fn engine(&self, defaults: &CliConfig) -> Result<CellEngine> {
        let grid = self.grid.unwrap_or(defaults.grid);
        let config = EngineConfig {
            grid,
            resolution: self
                .resolution
                .unwrap_or_else(|| defaults.resolution_for(grid)),
            vertical: self.layered.then(|| VerticalBands {
                layer_height_m: self
                    .vertical_resolution
                    .unwrap_or(defaults.vertical_resolution_m),
            }),
        };
        CellEngine::new(config).context("Invalid grid configuration")
    }
}

#[derive(Serialize)]
struct ParsedId {
    grid: GridKind,
    resolution: u8,
    layer: Option<u8>,
    center: GeoPoint,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("airbook=info".parse()?)
                .add_directive("airbook_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let defaults = CliConfig::from_env();
    airbook_core::grid::warm_up();

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Trajectory {
            input,
            grid,
            backward_buffer,
            forward_buffer,
            lateral_buffer,
            vertical_buffer,
        } => {
            let engine = grid.engine(&defaults)?;
            let trajectory = read_trajectory(&input)?;
            let mut options = defaults.trajectory_options();
            if let Some(secs) = backward_buffer {
                options.temporal_backward_buffer_s = secs;
            }
            if let Some(secs) = forward_buffer {
                options.temporal_forward_buffer_s = secs;
            }
            options.spatial_lateral_buffer_m = lateral_buffer;
            options.spatial_vertical_buffer_m = vertical_buffer;

            let bookings = engine
                .trajectory_bookings(&trajectory, &options)
                .with_context(|| format!("Failed to book trajectory {}", input.display()))?;
            tracing::info!(
                waypoints = trajectory.len(),
                cells = bookings.len(),
                "Booked trajectory"
            );
            write_json(&mut stdout, &bookings, cli.pretty)?;
        }
        Command::Volume { input, grid } => {
            let engine = grid.engine(&defaults)?;
            let volume = read_volume(&input)?;
            let bookings = engine
                .volume_bookings(&volume)
                .with_context(|| format!("Failed to book volume {}", input.display()))?;
            tracing::info!(cells = bookings.len(), "Booked volume");
            write_json(&mut stdout, &bookings, cli.pretty)?;
        }
        Command::IndexPoint {
            lat,
            lon,
            alt,
            grid,
        } => {
            let engine = grid.engine(&defaults)?;
            let id = engine.index_point(&GeoPoint::new(lon, lat, alt))?;
            write_json(&mut stdout, &id, cli.pretty)?;
        }
        Command::ParseId { id, grid } => {
            let engine = grid.engine(&defaults)?;
            let parsed = engine
                .parse_id(&id)
                .with_context(|| format!("Cannot decode '{}'", id))?;
            let center = engine.grid().cell_center(parsed.cell)?;
            tracing::debug!(id = %id, resolution = parsed.resolution, "Decoded cell id");
            write_json(
                &mut stdout,
                &ParsedId {
                    grid: engine.config().grid,
                    resolution: parsed.resolution,
                    layer: parsed.layer,
                    center,
                },
                cli.pretty,
            )?;
        }
    }
    Ok(())
}
