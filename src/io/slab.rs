//! Raw binary slab I/O for checkpointing.
//!
//! One file per named field per checkpoint time, named `<name>.%07d`.
//! Slabs store the inner cells only (no ghosts), row-major with i
//! fastest; 3D soil slabs store k slowest with stride `itot·jtot`.
//! Values are native-endian f64, so a restart on the same platform is
//! bit-exact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::grid::{AtmosphereGrid, SoilGrid};

/// Error type for slab I/O.
#[derive(Debug, Error)]
pub enum SlabError {
    /// File I/O error.
    #[error("slab I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file holds a different number of values than the grid expects.
    #[error("slab {path}: expected {expected} values, file holds {actual}")]
    SizeMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },
}

/// Checkpoint path for a named slab: `<dir>/<name>.%07d`.
pub fn slab_path(dir: &Path, name: &str, itime: u64) -> PathBuf {
    dir.join(format!("{}.{:07}", name, itime))
}

/// Write the inner cells of a 2D plane.
pub fn save_2d_slice(field: &[f64], path: &Path, grid: &AtmosphereGrid) -> Result<(), SlabError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            writer.write_all(&field[grid.ij(i, j)].to_ne_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read the inner cells of a 2D plane. Ghost cells are left untouched;
/// run a cyclic exchange afterwards if they are needed.
pub fn load_2d_slice(field: &mut [f64], path: &Path, grid: &AtmosphereGrid) -> Result<(), SlabError> {
    let values = read_all_f64(path, grid.itot * grid.jtot)?;

    let mut n = 0;
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            field[grid.ij(i, j)] = values[n];
            n += 1;
        }
    }
    Ok(())
}

/// Write the inner cells of a 3D soil field, k slowest.
pub fn save_3d_field(
    field: &[f64],
    path: &Path,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) -> Result<(), SlabError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                writer.write_all(&field[grid.ijk(i, j, k)].to_ne_bytes())?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read the inner cells of a 3D soil field, k slowest.
pub fn load_3d_field(
    field: &mut [f64],
    path: &Path,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) -> Result<(), SlabError> {
    let values = read_all_f64(path, grid.itot * grid.jtot * soil_grid.ktot)?;

    let mut n = 0;
    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                field[grid.ijk(i, j, k)] = values[n];
                n += 1;
            }
        }
    }
    Ok(())
}

/// Read a whole slab file and check its length.
fn read_all_f64(path: &Path, expected: usize) -> Result<Vec<f64>, SlabError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    if bytes.len() != expected * 8 {
        return Err(SlabError::SizeMismatch {
            path: path.display().to_string(),
            expected,
            actual: bytes.len() / 8,
        });
    }

    Ok(bytes
        .chunks_exact(8)
        .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
        .collect())
}
