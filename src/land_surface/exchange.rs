//! Closure of the atmospheric bottom boundary condition.
//!
//! The tile fluxes are blended into kinematic surface fluxes and handed
//! back to the atmosphere as Dirichlet surface values through the
//! aerodynamic resistance:
//!
//! ```text
//! w'θ'_s = Σ_t frac_t·H_t/(ρ·c_p)        θ_l,bot = θ_l,atm + w'θ'_s·r_a
//! w'q'_s = Σ_t frac_t·LE_t/(ρ·L_v)       q_t,bot = q_t,atm + w'q'_s·r_a
//! ```

use crate::constants::{CP, LV};
use crate::grid::AtmosphereGrid;
use crate::land_surface::tile::SurfaceTile;

/// Aggregate the tile fluxes into the surface θ_l and q_t values.
#[allow(clippy::too_many_arguments)]
pub fn calc_bcs(
    thl_bot: &mut [f64],
    qt_bot: &mut [f64],
    thl: &[f64],
    qt: &[f64],
    veg: &SurfaceTile,
    soil: &SurfaceTile,
    wet: &SurfaceTile,
    ra: &[f64],
    rho_air: f64,
    grid: &AtmosphereGrid,
) {
    let rhocp_i = 1.0 / (rho_air * CP);
    let rholv_i = 1.0 / (rho_air * LV);
    let kstart = grid.kstart;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);

            let wthl = (veg.fraction[ij] * veg.h[ij]
                + soil.fraction[ij] * soil.h[ij]
                + wet.fraction[ij] * wet.h[ij])
                * rhocp_i;

            let wqt = (veg.fraction[ij] * veg.le[ij]
                + soil.fraction[ij] * soil.le[ij]
                + wet.fraction[ij] * wet.le[ij])
                * rholv_i;

            thl_bot[ij] = thl[ijk] + wthl * ra[ij];
            qt_bot[ij] = qt[ijk] + wqt * ra[ij];
        }
    }
}

/// Per-tile surface values and kinematic fluxes, for diagnostics and
/// checkpointing of the tile state.
pub fn calc_tile_bcs(
    tile: &mut SurfaceTile,
    thl: &[f64],
    qt: &[f64],
    ra: &[f64],
    rho_air: f64,
    grid: &AtmosphereGrid,
) {
    let rhocp_i = 1.0 / (rho_air * CP);
    let rholv_i = 1.0 / (rho_air * LV);
    let kstart = grid.kstart;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);

            tile.thl_fluxbot[ij] = tile.h[ij] * rhocp_i;
            tile.qt_fluxbot[ij] = tile.le[ij] * rholv_i;
            tile.thl_bot[ij] = thl[ijk] + tile.thl_fluxbot[ij] * ra[ij];
            tile.qt_bot[ij] = qt[ijk] + tile.qt_fluxbot[ij] * ra[ij];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::land_surface::tile::Tiles;

    #[test]
    fn test_flux_aggregation() {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let n3 = grid.ijcells * 2;
        let mut tiles = Tiles::new(grid.ijcells);

        for (frac, h, le, tile) in [
            (0.5, 100.0, 50.0, &mut tiles.veg),
            (0.3, 60.0, 20.0, &mut tiles.soil),
            (0.2, 20.0, 80.0, &mut tiles.wet),
        ] {
            tile.fraction = grid.plane_filled(frac);
            tile.h = grid.plane_filled(h);
            tile.le = grid.plane_filled(le);
        }

        let thl = vec![285.0; n3];
        let qt = vec![0.008; n3];
        let ra = grid.plane_filled(40.0);
        let rho = 1.2;

        let mut thl_bot = grid.plane();
        let mut qt_bot = grid.plane();
        calc_bcs(
            &mut thl_bot,
            &mut qt_bot,
            &thl,
            &qt,
            &tiles.veg,
            &tiles.soil,
            &tiles.wet,
            &ra,
            rho,
            &grid,
        );

        let ij = grid.ij(grid.istart, grid.jstart);
        let h_mean = 0.5 * 100.0 + 0.3 * 60.0 + 0.2 * 20.0;
        let le_mean = 0.5 * 50.0 + 0.3 * 20.0 + 0.2 * 80.0;
        let thl_expected = 285.0 + h_mean / (rho * CP) * 40.0;
        let qt_expected = 0.008 + le_mean / (rho * LV) * 40.0;
        assert!((thl_bot[ij] - thl_expected).abs() < 1e-12);
        assert!((qt_bot[ij] - qt_expected).abs() < 1e-15);

        // Upward fluxes make the surface warmer and moister than the air.
        assert!(thl_bot[ij] > 285.0);
        assert!(qt_bot[ij] > 0.008);
    }

    #[test]
    fn test_tile_bcs_consistency() {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let n3 = grid.ijcells * 2;
        let mut tile = SurfaceTile::new(grid.ijcells);
        tile.h = grid.plane_filled(120.0);
        tile.le = grid.plane_filled(60.0);

        let thl = vec![290.0; n3];
        let qt = vec![0.01; n3];
        let ra = grid.plane_filled(30.0);

        calc_tile_bcs(&mut tile, &thl, &qt, &ra, 1.1, &grid);

        let ij = grid.ij(grid.istart, grid.jstart);
        assert!((tile.thl_fluxbot[ij] - 120.0 / (1.1 * CP)).abs() < 1e-15);
        assert!((tile.thl_bot[ij] - (290.0 + tile.thl_fluxbot[ij] * 30.0)).abs() < 1e-12);
        assert!((tile.qt_bot[ij] - (0.01 + tile.qt_fluxbot[ij] * 30.0)).abs() < 1e-15);
    }
}
