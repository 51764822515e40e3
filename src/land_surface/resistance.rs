//! Canopy and soil surface resistances.
//!
//! The Jarvis-Stewart reduction functions of the IFS/H-TESSEL scheme:
//!
//! - `f1(SW↓)`: stomata open with incoming shortwave radiation,
//! - `f2(θ̄_n)`: transpiration shuts down towards the wilting point,
//!   using the root-fraction weighted mean soil moisture,
//! - `f2b(θ_top)`: the bare-soil equivalent, on the top soil layer,
//! - `f3(VPD)`: stomata close with vapour pressure deficit.
//!
//! `r_s,veg = rs_veg_min/LAI · f1·f2·f3` and `r_s,soil = rs_soil_min · f2b`;
//! the wet-skin tile has no surface resistance.

use crate::grid::{AtmosphereGrid, SoilGrid};
use crate::soil::VanGenuchtenTable;

/// Root-fraction weighted mean of the plant-available soil moisture,
/// normalised between wilting point and field capacity.
#[allow(clippy::too_many_arguments)]
pub fn calc_root_weighted_mean_theta(
    theta_mean_n: &mut [f64],
    theta: &[f64],
    soil_index: &[usize],
    root_fraction: &[f64],
    table: &VanGenuchtenTable,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            theta_mean_n[grid.ij(i, j)] = 0.0;
        }
    }

    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ij = grid.ij(i, j);
                let ijk = grid.ijk(i, j, k);
                let si = soil_index[ijk];

                let theta_lim = theta[ijk].max(table.theta_wp[si]);
                theta_mean_n[ij] += root_fraction[ijk] * (theta_lim - table.theta_wp[si])
                    / (table.theta_fc[si] - table.theta_wp[si]);
            }
        }
    }
}

/// The four resistance reduction functions.
#[allow(clippy::too_many_arguments)]
pub fn calc_resistance_functions(
    f1: &mut [f64],
    f2: &mut [f64],
    f2b: &mut [f64],
    f3: &mut [f64],
    sw_dn: &[f64],
    theta: &[f64],
    theta_mean_n: &[f64],
    vpd: &[f64],
    gd: &[f64],
    c_veg: &[f64],
    soil_index: &[usize],
    table: &VanGenuchtenTable,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    // f1 coefficients.
    let a_f1 = 0.81;
    let b_f1 = 0.004;
    let c_f1 = 0.05;

    let k_top = soil_grid.kend - 1;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, k_top);
            let si = soil_index[ijk];

            let sw_dn_lim = sw_dn[ij].max(0.0);
            f1[ij] = 1.0
                / ((b_f1 * sw_dn_lim + c_f1) / (a_f1 * (b_f1 * sw_dn_lim + 1.0))).min(1.0);

            f2[ij] = 1.0 / theta_mean_n[ij].max(1e-9).min(1.0);

            f3[ij] = 1.0 / (-gd[ij] * vpd[ij]).exp();

            // Bare soil dries out between a c_veg-weighted minimum and
            // field capacity.
            let theta_min =
                c_veg[ij] * table.theta_wp[si] + (1.0 - c_veg[ij]) * table.theta_res[si];
            let theta_rel = (theta[ijk] - theta_min) / (table.theta_fc[si] - theta_min);
            f2b[ij] = 1.0 / theta_rel.max(1e-9).min(1.0);
        }
    }
}

/// Canopy resistance of the vegetation tile.
pub fn calc_canopy_resistance(
    rs: &mut [f64],
    rs_min: &[f64],
    lai: &[f64],
    f1: &[f64],
    f2: &[f64],
    f3: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            rs[ij] = rs_min[ij] / lai[ij] * f1[ij] * f2[ij] * f3[ij];
        }
    }
}

/// Surface resistance of the bare-soil tile.
pub fn calc_soil_resistance(
    rs: &mut [f64],
    rs_min: &[f64],
    f2b: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            rs[ij] = rs_min[ij] * f2b[ij];
        }
    }
}
