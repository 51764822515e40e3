//! Surface tiles.
//!
//! Each grid cell is split into three sub-grid tiles that solve their own
//! surface energy balance: vegetation, bare soil, and the wet skin (the
//! liquid water intercepted on canopy and ground). The split is known at
//! compile time, so the tiles live in a plain struct rather than a map.

use crate::constants::WL_SAT;
use crate::grid::AtmosphereGrid;

/// Identifier of a surface tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileKind {
    /// Transpiring vegetation.
    Vegetation,
    /// Bare soil evaporating through the soil resistance.
    BareSoil,
    /// Liquid water skin with zero surface resistance.
    WetSkin,
}

impl TileKind {
    /// Human-readable name, used in messages and diagnostics.
    pub fn long_name(self) -> &'static str {
        match self {
            TileKind::Vegetation => "vegetation",
            TileKind::BareSoil => "bare soil",
            TileKind::WetSkin => "wet skin",
        }
    }
}

/// Per-tile 2D state.
#[derive(Clone, Debug)]
pub struct SurfaceTile {
    /// Dynamic area fraction (-).
    pub fraction: Vec<f64>,
    /// Surface (canopy/soil) resistance (s m⁻¹).
    pub rs: Vec<f64>,
    /// Sensible heat flux (W m⁻²).
    pub h: Vec<f64>,
    /// Latent heat flux (W m⁻²).
    pub le: Vec<f64>,
    /// Ground heat flux (W m⁻²).
    pub g: Vec<f64>,
    /// Skin temperature (K).
    pub t_bot: Vec<f64>,
    /// Skin liquid potential temperature (K).
    pub thl_bot: Vec<f64>,
    /// Skin total humidity (kg kg⁻¹).
    pub qt_bot: Vec<f64>,
    /// Kinematic surface heat flux (K m s⁻¹).
    pub thl_fluxbot: Vec<f64>,
    /// Kinematic surface moisture flux (kg kg⁻¹ m s⁻¹).
    pub qt_fluxbot: Vec<f64>,
}

impl SurfaceTile {
    /// Allocate a zeroed tile.
    pub fn new(ijcells: usize) -> Self {
        Self {
            fraction: vec![0.0; ijcells],
            rs: vec![0.0; ijcells],
            h: vec![0.0; ijcells],
            le: vec![0.0; ijcells],
            g: vec![0.0; ijcells],
            t_bot: vec![0.0; ijcells],
            thl_bot: vec![0.0; ijcells],
            qt_bot: vec![0.0; ijcells],
            thl_fluxbot: vec![0.0; ijcells],
            qt_fluxbot: vec![0.0; ijcells],
        }
    }
}

/// The three tiles of the land surface.
#[derive(Clone, Debug)]
pub struct Tiles {
    /// Vegetation tile.
    pub veg: SurfaceTile,
    /// Bare-soil tile.
    pub soil: SurfaceTile,
    /// Wet-skin tile.
    pub wet: SurfaceTile,
}

impl Tiles {
    /// Allocate the three tiles.
    pub fn new(ijcells: usize) -> Self {
        Self {
            veg: SurfaceTile::new(ijcells),
            soil: SurfaceTile::new(ijcells),
            wet: SurfaceTile::new(ijcells),
        }
    }

    /// The tiles paired with their kind, in a fixed order.
    pub fn iter_mut(&mut self) -> [(TileKind, &mut SurfaceTile); 3] {
        [
            (TileKind::Vegetation, &mut self.veg),
            (TileKind::BareSoil, &mut self.soil),
            (TileKind::WetSkin, &mut self.wet),
        ]
    }
}

/// Maximum liquid water storage for the cell: `w_l,sat·(1 - c_veg + c_veg·LAI)`.
#[inline]
pub fn wl_max(c_veg: f64, lai: f64) -> f64 {
    WL_SAT * (1.0 - c_veg + c_veg * lai)
}

/// Dynamic tile fractions from the liquid water reservoir.
///
/// The wet fraction saturates at one when the reservoir is full; the
/// remaining area splits between vegetation and bare soil by `c_veg`.
pub fn calc_tile_fractions(
    frac_veg: &mut [f64],
    frac_soil: &mut [f64],
    frac_wet: &mut [f64],
    wl: &[f64],
    c_veg: &[f64],
    lai: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let wlm = wl_max(c_veg[ij], lai[ij]);

            frac_wet[ij] = (wl[ij] / wlm).min(1.0);
            frac_veg[ij] = (1.0 - frac_wet[ij]) * c_veg[ij];
            frac_soil[ij] = (1.0 - frac_wet[ij]) * (1.0 - c_veg[ij]);
        }
    }
}

/// Fraction-weighted mean over the three tiles.
#[allow(clippy::too_many_arguments)]
pub fn calc_tiled_mean(
    fld_mean: &mut [f64],
    fld_veg: &[f64],
    fld_soil: &[f64],
    fld_wet: &[f64],
    frac_veg: &[f64],
    frac_soil: &[f64],
    frac_wet: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            fld_mean[ij] =
                frac_veg[ij] * fld_veg[ij] + frac_soil[ij] * fld_soil[ij] + frac_wet[ij] * fld_wet[ij];
        }
    }
}

/// Scale a tile field with its fraction into a scratch plane.
pub fn scale_tile_with_fraction(
    fld_scaled: &mut [f64],
    fld: &[f64],
    tile_frac: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            fld_scaled[ij] = fld[ij] * tile_frac[ij];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractions_sum_to_one() {
        let grid = AtmosphereGrid::new(3, 3, 1, 1, 1, vec![-10.0, 10.0]);
        let c_veg = grid.plane_filled(0.8);
        let lai = grid.plane_filled(2.5);
        let wl = grid.plane_filled(0.5 * WL_SAT);

        let mut fv = grid.plane();
        let mut fs = grid.plane();
        let mut fw = grid.plane();
        calc_tile_fractions(&mut fv, &mut fs, &mut fw, &wl, &c_veg, &lai, &grid);

        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ij = grid.ij(i, j);
                let sum = fv[ij] + fs[ij] + fw[ij];
                assert!((sum - 1.0).abs() < 1e-12, "sum = {}", sum);
                assert!(fw[ij] > 0.0 && fw[ij] < 1.0);
            }
        }
    }

    #[test]
    fn test_overfull_reservoir_saturates_wet_tile() {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let c_veg = grid.plane_filled(0.6);
        let lai = grid.plane_filled(3.0);
        let wl = grid.plane_filled(10.0 * WL_SAT);

        let mut fv = grid.plane();
        let mut fs = grid.plane();
        let mut fw = grid.plane();
        calc_tile_fractions(&mut fv, &mut fs, &mut fw, &wl, &c_veg, &lai, &grid);

        let ij = grid.ij(grid.istart, grid.jstart);
        assert!((fw[ij] - 1.0).abs() < 1e-14);
        assert!(fv[ij].abs() < 1e-14);
        assert!(fs[ij].abs() < 1e-14);
    }

    #[test]
    fn test_tiled_mean_weights() {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let fv = grid.plane_filled(0.5);
        let fs = grid.plane_filled(0.3);
        let fw = grid.plane_filled(0.2);
        let a = grid.plane_filled(10.0);
        let b = grid.plane_filled(20.0);
        let c = grid.plane_filled(30.0);

        let mut mean = grid.plane();
        calc_tiled_mean(&mut mean, &a, &b, &c, &fv, &fs, &fw, &grid);

        let ij = grid.ij(grid.istart, grid.jstart);
        assert!((mean[ij] - 17.0).abs() < 1e-12);
    }
}
