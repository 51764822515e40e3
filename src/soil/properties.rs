//! Soil property fields: thermal and hydraulic diffusivity/conductivity
//! at full levels, and their interpolation to half levels.

use crate::constants::{GAMMA_T_MATRIX, GAMMA_T_WATER};
use crate::grid::{AtmosphereGrid, SoilGrid};
use crate::soil::van_genuchten::{self, VanGenuchtenTable};

/// Vertical interpolation rule for half-level soil properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoilInterpolation {
    /// Arithmetic mean; used for the thermal diffusivity.
    Mean,
    /// Cell-wise maximum of the two neighbours (IFS convention); used for
    /// the hydraulic properties so a wet cell drains through a dry one.
    Max,
}

/// Thermal diffusivity and conductivity at full soil levels.
///
/// Saturated conductivity from the geometric-mean mixing of matrix and
/// water conductivities, reduced towards the dry value with the Kersten
/// number (IFS eqs. 8.62-8.64).
pub fn calc_thermal_properties(
    kappa: &mut [f64],
    gamma: &mut [f64],
    soil_index: &[usize],
    theta: &[f64],
    table: &VanGenuchtenTable,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                let si = soil_index[ijk];

                let lambda_t_sat = GAMMA_T_MATRIX.powf(1.0 - table.theta_sat[si])
                    * GAMMA_T_WATER.powf(theta[ijk])
                    * 2.2f64.powf(table.theta_sat[si] - theta[ijk]);

                let kersten = (theta[ijk] / table.theta_sat[si]).max(0.1).log10() + 1.0;

                gamma[ijk] = kersten * (lambda_t_sat - table.gamma_t_dry[si]) + table.gamma_t_dry[si];
                kappa[ijk] = gamma[ijk] / table.rho_c[si];
            }
        }
    }
}

/// Hydraulic diffusivity and conductivity at full soil levels, with the
/// per-type clamping bounds applied.
pub fn calc_hydraulic_properties(
    kappa: &mut [f64],
    gamma: &mut [f64],
    soil_index: &[usize],
    theta: &[f64],
    table: &VanGenuchtenTable,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                let si = soil_index[ijk];

                // Keep θ just above the residual content.
                let theta_lim = theta[ijk].max(1.001 * table.theta_res[si]);
                let theta_norm =
                    (theta_lim - table.theta_res[si]) / (table.theta_sat[si] - table.theta_res[si]);

                kappa[ijk] = van_genuchten::diffusivity(
                    table.vg_a[si],
                    table.vg_l[si],
                    table.vg_m[si],
                    table.gamma_sat[si],
                    table.theta_res[si],
                    table.theta_sat[si],
                    theta_norm,
                )
                .min(table.kappa_max[si])
                .max(table.kappa_min[si]);

                gamma[ijk] = van_genuchten::conductivity(
                    theta_norm,
                    table.vg_l[si],
                    table.vg_m[si],
                    table.gamma_sat[si],
                )
                .min(table.gamma_max[si])
                .max(table.gamma_min[si]);
            }
        }
    }
}

/// Interpolate a full-level soil property to the interior half levels.
///
/// The bottom (`kstart`) and top (`kend`) half levels are boundary
/// conditions and are set elsewhere.
pub fn interp_to_half_levels(
    fld_h: &mut [f64],
    fld: &[f64],
    interpolation: SoilInterpolation,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let kk = grid.ijcells;

    for k in soil_grid.kstart + 1..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                fld_h[ijk] = match interpolation {
                    SoilInterpolation::Mean => 0.5 * (fld[ijk] + fld[ijk - kk]),
                    SoilInterpolation::Max => fld[ijk].max(fld[ijk - kk]),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AtmosphereGrid, SoilGrid, VanGenuchtenTable) {
        (
            AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]),
            SoilGrid::equidistant(4, 2.0),
            VanGenuchtenTable::medium_fine(),
        )
    }

    #[test]
    fn test_hydraulic_clamping() {
        let (grid, sgrid, table) = setup();
        let n = sgrid.ncells(grid.ijcells);
        let soil_index = vec![0usize; n];

        // Bone-dry soil: below the residual content.
        let theta = vec![0.005; n];
        let mut kappa = vec![0.0; n];
        let mut gamma = vec![0.0; n];
        calc_hydraulic_properties(&mut kappa, &mut gamma, &soil_index, &theta, &table, &grid, &sgrid);

        let ijk = grid.ijk(grid.istart, grid.jstart, 0);
        assert!((kappa[ijk] - table.kappa_min[0]).abs() < 1e-18);
        assert!(gamma[ijk] >= 0.0);

        // Saturated soil clamps at the maxima.
        let theta = vec![table.theta_sat[0]; n];
        calc_hydraulic_properties(&mut kappa, &mut gamma, &soil_index, &theta, &table, &grid, &sgrid);
        assert!(kappa[ijk] <= table.kappa_max[0] * (1.0 + 1e-12));
        assert!((gamma[ijk] - table.gamma_max[0]).abs() < 1e-14 * table.gamma_max[0]);
    }

    #[test]
    fn test_thermal_properties_increase_with_moisture() {
        let (grid, sgrid, table) = setup();
        let n = sgrid.ncells(grid.ijcells);
        let soil_index = vec![0usize; n];
        let ijk = grid.ijk(grid.istart, grid.jstart, 0);

        let mut kappa = vec![0.0; n];
        let mut gamma = vec![0.0; n];

        let theta_dry = vec![0.08; n];
        calc_thermal_properties(&mut kappa, &mut gamma, &soil_index, &theta_dry, &table, &grid, &sgrid);
        let gamma_dry = gamma[ijk];

        let theta_wet = vec![0.40; n];
        calc_thermal_properties(&mut kappa, &mut gamma, &soil_index, &theta_wet, &table, &grid, &sgrid);
        assert!(gamma[ijk] > gamma_dry);
        assert!(kappa[ijk] > 0.0);
    }

    #[test]
    fn test_half_level_interpolation_rules() {
        let (grid, sgrid, _) = setup();
        let n = sgrid.ncells(grid.ijcells);
        let nh = sgrid.ncells_h(grid.ijcells);

        let mut fld = vec![0.0; n];
        for k in 0..sgrid.ktot {
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    fld[grid.ijk(i, j, k)] = k as f64;
                }
            }
        }

        let mut fld_h = vec![-1.0; nh];
        interp_to_half_levels(&mut fld_h, &fld, SoilInterpolation::Mean, &grid, &sgrid);
        let ijk = grid.ijk(grid.istart, grid.jstart, 2);
        assert!((fld_h[ijk] - 1.5).abs() < 1e-14);

        interp_to_half_levels(&mut fld_h, &fld, SoilInterpolation::Max, &grid, &sgrid);
        assert!((fld_h[ijk] - 2.0).abs() < 1e-14);
    }
}
