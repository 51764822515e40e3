//! Vertical soil grid.
//!
//! The soil column uses `ktot` full levels at depths `z[k]` (negative,
//! increasing towards the surface) and `ktot + 1` half levels `zh[k]`,
//! with `zh[ktot]` at the surface. Grid spacings and their inverses are
//! precomputed once, so the column kernels only multiply.
//!
//! Soil fields on full levels hold `ijcells·ktot` values indexed
//! `ijk = ij + k·ijcells`; half-level fields hold `ijcells·(ktot+1)`.

/// Definition of the 1D soil grid shared by all columns.
#[derive(Clone, Debug)]
pub struct SoilGrid {
    /// Number of full soil levels.
    pub ktot: usize,
    /// First full-level index (always 0; kept for symmetry with the
    /// atmosphere indexing in the kernels).
    pub kstart: usize,
    /// One-past-last full-level index.
    pub kend: usize,
    /// Full-level depths (m, negative), length `ktot`.
    pub z: Vec<f64>,
    /// Half-level depths (m), length `ktot + 1`; `zh[ktot] = 0`.
    pub zh: Vec<f64>,
    /// Full-level spacings `dz[k] = zh[k+1] - zh[k]`.
    pub dz: Vec<f64>,
    /// Half-level spacings `dzh[k] = z[k] - z[k-1]` (half distances at the
    /// column ends).
    pub dzh: Vec<f64>,
    /// Inverse full-level spacings.
    pub dzi: Vec<f64>,
    /// Inverse half-level spacings.
    pub dzhi: Vec<f64>,
}

impl SoilGrid {
    /// Build the grid from half-level depths (negative, strictly
    /// increasing, ending at the surface).
    pub fn from_half_levels(zh: Vec<f64>) -> Self {
        let ktot = zh.len() - 1;
        assert!(ktot > 0, "soil grid needs at least one level");

        let z: Vec<f64> = (0..ktot).map(|k| 0.5 * (zh[k] + zh[k + 1])).collect();
        let dz: Vec<f64> = (0..ktot).map(|k| zh[k + 1] - zh[k]).collect();

        let mut dzh = vec![0.0; ktot + 1];
        dzh[0] = 2.0 * (z[0] - zh[0]);
        for k in 1..ktot {
            dzh[k] = z[k] - z[k - 1];
        }
        dzh[ktot] = 2.0 * (zh[ktot] - z[ktot - 1]);

        let dzi = dz.iter().map(|&d| 1.0 / d).collect();
        let dzhi = dzh.iter().map(|&d| 1.0 / d).collect();

        Self {
            ktot,
            kstart: 0,
            kend: ktot,
            z,
            zh,
            dz,
            dzh,
            dzi,
            dzhi,
        }
    }

    /// Equidistant grid over `depth` metres (convenience constructor,
    /// mostly for tests).
    pub fn equidistant(ktot: usize, depth: f64) -> Self {
        let dz = depth / ktot as f64;
        let zh: Vec<f64> = (0..=ktot).map(|k| -depth + k as f64 * dz).collect();
        Self::from_half_levels(zh)
    }

    /// Number of full-level cells per horizontal plane count.
    #[inline]
    pub fn ncells(&self, ijcells: usize) -> usize {
        ijcells * self.ktot
    }

    /// Number of half-level cells per horizontal plane count.
    #[inline]
    pub fn ncells_h(&self, ijcells: usize) -> usize {
        ijcells * (self.ktot + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equidistant_grid() {
        let grid = SoilGrid::equidistant(4, 2.0);
        assert_eq!(grid.ktot, 4);
        assert!((grid.zh[0] + 2.0).abs() < 1e-14);
        assert!(grid.zh[4].abs() < 1e-14);
        for k in 0..4 {
            assert!((grid.dz[k] - 0.5).abs() < 1e-14);
            assert!((grid.dzi[k] - 2.0).abs() < 1e-14);
        }
        // Interior half-level spacing equals the full spacing.
        assert!((grid.dzh[2] - 0.5).abs() < 1e-14);
        // End spacings are half distances.
        assert!((grid.dzh[0] - 0.5).abs() < 1e-14);
        assert!((grid.dzh[4] - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_stretched_grid_midpoints() {
        let grid = SoilGrid::from_half_levels(vec![-1.0, -0.5, -0.2, 0.0]);
        assert_eq!(grid.ktot, 3);
        assert!((grid.z[0] + 0.75).abs() < 1e-14);
        assert!((grid.z[1] + 0.35).abs() < 1e-14);
        assert!((grid.z[2] + 0.1).abs() < 1e-14);
        assert!((grid.dzh[1] - 0.4).abs() < 1e-14);
    }
}
