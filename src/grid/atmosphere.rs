//! Horizontal atmosphere grid with ghost cells.
//!
//! The surface scheme only touches 2D (x, y) planes and the lowest interior
//! model level of 3D fields, but it shares the index conventions of the full
//! 3D grid: a field plane is `icells × jcells` values with the interior in
//! `[istart, iend) × [jstart, jend)` and `igc`/`jgc` ghost cells on each
//! side. Flat indices are `ij = i + j·icells` and `ijk = ij + k·ijcells`.
//!
//! # Memory Layout
//!
//! All fields are contiguous `Vec<f64>` with i fastest, matching the
//! row-major on-disk slab layout.

/// Horizontal grid dimensions and vertical level heights.
#[derive(Clone, Debug)]
pub struct AtmosphereGrid {
    /// Number of interior cells in x.
    pub itot: usize,
    /// Number of interior cells in y.
    pub jtot: usize,
    /// Ghost cells per side in x.
    pub igc: usize,
    /// Ghost cells per side in y.
    pub jgc: usize,
    /// Padded cell count in x: `itot + 2·igc`.
    pub icells: usize,
    /// Padded cell count in y: `jtot + 2·jgc`.
    pub jcells: usize,
    /// Cells per horizontal plane: `icells·jcells`.
    pub ijcells: usize,
    /// First interior index in x.
    pub istart: usize,
    /// One-past-last interior index in x.
    pub iend: usize,
    /// First interior index in y.
    pub jstart: usize,
    /// One-past-last interior index in y.
    pub jend: usize,
    /// Index of the first interior model level.
    pub kstart: usize,
    /// Full-level heights above the surface (m), length `kstart + n_levels`.
    pub z: Vec<f64>,
}

impl AtmosphereGrid {
    /// Create a grid from interior dimensions, ghost-cell counts, and the
    /// full-level heights (including `kstart` ghost levels below).
    pub fn new(itot: usize, jtot: usize, igc: usize, jgc: usize, kstart: usize, z: Vec<f64>) -> Self {
        let icells = itot + 2 * igc;
        let jcells = jtot + 2 * jgc;
        assert!(z.len() > kstart, "need at least one interior model level");
        Self {
            itot,
            jtot,
            igc,
            jgc,
            icells,
            jcells,
            ijcells: icells * jcells,
            istart: igc,
            iend: igc + itot,
            jstart: jgc,
            jend: jgc + jtot,
            kstart,
            z,
        }
    }

    /// Flat 2D index.
    #[inline(always)]
    pub fn ij(&self, i: usize, j: usize) -> usize {
        i + j * self.icells
    }

    /// Flat 3D index.
    #[inline(always)]
    pub fn ijk(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.icells + k * self.ijcells
    }

    /// Height of the lowest interior model level (m), the surface-layer
    /// reference height.
    #[inline]
    pub fn zsl(&self) -> f64 {
        self.z[self.kstart]
    }

    /// Allocate a zeroed 2D plane.
    pub fn plane(&self) -> Vec<f64> {
        vec![0.0; self.ijcells]
    }

    /// Allocate a 2D plane filled with `value`.
    pub fn plane_filled(&self, value: f64) -> Vec<f64> {
        vec![value; self.ijcells]
    }
}
