//! Binary density grid files.
//!
//! Layout, all little-endian: `u32` width, `u32` height, then
//! `width * height` `f64` cell values in row-major order. Grids are square,
//! so width and height are always equal.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use heatgrid::{DensityGrid, HeatmapError};
use thiserror::Error;
use tracing::{debug, span, Level};

/// Refuse headers that would need more than this many cells
const MAX_CELLS: usize = 1 << 28;

/// Upfront allocation cap; larger grids grow as their values arrive
const PREALLOCATE_CELLS: usize = 1 << 16;

#[derive(Debug, Error)]
pub enum GridFileError {
    #[error("grid file is not square ({width}x{height})")]
    NotSquare { width: u32, height: u32 },

    #[error("grid file header claims {0} cells, which is too large")]
    TooLarge(usize),

    #[error("grid file has data after its {0} cell values")]
    TrailingData(usize),

    #[error(transparent)]
    InvalidGrid(#[from] HeatmapError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn write_grid<W: Write>(grid: &DensityGrid, mut out: W) -> std::io::Result<()> {
    let n = grid.resolution() as u32;
    out.write_all(&n.to_le_bytes())?;
    out.write_all(&n.to_le_bytes())?;
    for value in grid.values() {
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()
}

pub fn read_grid<R: Read>(mut input: R) -> Result<DensityGrid, GridFileError> {
    let mut width_bytes = [0u8; 4];
    let mut height_bytes = [0u8; 4];
    input.read_exact(&mut width_bytes)?;
    input.read_exact(&mut height_bytes)?;

    let width = u32::from_le_bytes(width_bytes);
    let height = u32::from_le_bytes(height_bytes);
    if width != height {
        return Err(GridFileError::NotSquare { width, height });
    }
    let n = width as usize;
    let cells = n.checked_mul(n).filter(|c| *c <= MAX_CELLS).ok_or(GridFileError::TooLarge(n.saturating_mul(n)))?;

    let mut values = Vec::with_capacity(cells.min(PREALLOCATE_CELLS));
    let mut bytes = [0u8; 8];
    for _ in 0..cells {
        input.read_exact(&mut bytes)?;
        values.push(f64::from_le_bytes(bytes));
    }
    if input.read(&mut [0u8; 1])? != 0 {
        return Err(GridFileError::TrailingData(cells));
    }

    Ok(DensityGrid::from_values(n, values)?)
}

/// Save a density grid to a binary file
pub fn save_grid_to_file(grid: &DensityGrid, path: &Path) -> std::io::Result<()> {
    let _span = span!(Level::DEBUG, "save_grid", path = %path.display()).entered();
    write_grid(grid, BufWriter::new(File::create(path)?))?;
    debug!("wrote {}x{} grid", grid.resolution(), grid.resolution());
    Ok(())
}

/// Load a density grid from a binary file
pub fn load_grid_from_file(path: &Path) -> Result<DensityGrid, GridFileError> {
    let _span = span!(Level::DEBUG, "load_grid", path = %path.display()).entered();
    let grid = read_grid(BufReader::new(File::open(path)?))?;
    debug!("loaded {}x{} grid", grid.resolution(), grid.resolution());
    Ok(grid)
}
