//! JSON input and output for the CLI.

use airbook_core::{StateVector4D, Volume4D};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// A trajectory file is either a bare array of state vectors or `{"trajectory": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TrajectoryFile {
    Bare(Vec<StateVector4D>),
    Wrapped { trajectory: Vec<StateVector4D> },
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse<T: DeserializeOwned>(text: &str, what: &str) -> Result<T> {
    serde_json::from_str(text).with_context(|| format!("Invalid {} JSON", what))
}

/// Read a trajectory from `path` (`-` for stdin).
pub fn read_trajectory(path: &Path) -> Result<Vec<StateVector4D>> {
    let file: TrajectoryFile = parse(&read_source(path)?, "trajectory")?;
    Ok(match file {
        TrajectoryFile::Bare(points) => points,
        TrajectoryFile::Wrapped { trajectory } => trajectory,
    })
}

/// Read a volume from `path` (`-` for stdin).
pub fn read_volume(path: &Path) -> Result<Volume4D> {
    parse(&read_source(path)?, "volume")
}

/// Write `value` to `out` as JSON followed by a newline.
pub fn write_json<T: Serialize, W: Write>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}
