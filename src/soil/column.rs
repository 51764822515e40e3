//! Soil column kernels: initialisation, boundary conditions, root water
//! extraction, and the explicit vertical diffusion tendency.

use crate::constants::{LV, RHO_W};
use crate::grid::{AtmosphereGrid, SoilGrid};
use crate::soil::van_genuchten::VanGenuchtenTable;

/// Broadcast a 1D soil profile over all columns.
pub fn init_soil_homogeneous<T: Copy>(
    soil_fld: &mut [T],
    soil_prof: &[T],
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);
                soil_fld[ijk] = soil_prof[k - soil_grid.kstart];
            }
        }
    }
}

/// Root fraction profile from the two-exponential IFS root distribution.
///
/// Explicit fractions are integrated per layer from the half-level depths;
/// the top (surface) layer receives the residual so the column sums to one
/// exactly, in floating point and not just analytically.
pub fn calc_root_column(root_frac: &mut [f64], zh: &[f64], a_root: f64, b_root: f64) {
    let ktot = root_frac.len();
    debug_assert_eq!(zh.len(), ktot + 1);

    let mut root_frac_sum = 0.0;
    for k in 0..ktot - 1 {
        root_frac[k] = 0.5
            * ((a_root * zh[k + 1]).exp() + (b_root * zh[k + 1]).exp()
                - (a_root * zh[k]).exp()
                - (b_root * zh[k]).exp());
        root_frac_sum += root_frac[k];
    }

    root_frac[ktot - 1] = 1.0 - root_frac_sum;
}

/// Per-column variant of [`calc_root_column`] for heterogeneous root
/// parameters.
pub fn calc_root_fraction(
    root_frac: &mut [f64],
    a_root: &[f64],
    b_root: &[f64],
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let zh = &soil_grid.zh;
    let kstart = soil_grid.kstart;
    let kend = soil_grid.kend;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let mut root_frac_sum = 0.0;

            for k in kstart..kend - 1 {
                let ijk = grid.ijk(i, j, k);
                root_frac[ijk] = 0.5
                    * ((a_root[ij] * zh[k + 1]).exp() + (b_root[ij] * zh[k + 1]).exp()
                        - (a_root[ij] * zh[k]).exp()
                        - (b_root[ij] * zh[k]).exp());
                root_frac_sum += root_frac[ijk];
            }

            let ijk_top = grid.ijk(i, j, kend - 1);
            root_frac[ijk_top] = 1.0 - root_frac_sum;
        }
    }
}

/// Moisture sink from root water uptake.
///
/// The transpiration demand `frac_veg·LE_veg` is distributed over the
/// column proportionally to `root_frac·θ`, so roots draw preferentially
/// from the wetter layers. `le_veg` must already be scaled with the
/// vegetation tile fraction; `tmp` is a scratch plane.
#[allow(clippy::too_many_arguments)]
pub fn calc_root_water_extraction(
    extraction: &mut [f64],
    tmp: &mut [f64],
    theta: &[f64],
    root_frac: &[f64],
    le_veg: &[f64],
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let fac = 1.0 / (RHO_W * LV);

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            tmp[grid.ij(i, j)] = 0.0;
        }
    }

    for k in soil_grid.kstart..soil_grid.kend {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ij = grid.ij(i, j);
                let ijk = grid.ijk(i, j, k);
                tmp[ij] += root_frac[ijk] * theta[ijk];
            }
        }
    }

    for k in soil_grid.kstart..soil_grid.kend {
        let dzi = soil_grid.dzi[k - soil_grid.kstart];
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ij = grid.ij(i, j);
                let ijk = grid.ijk(i, j, k);

                let theta_frac = root_frac[ijk] * theta[ijk] / tmp[ij];
                extraction[ijk] = -le_veg[ij].max(0.0) * fac * dzi * theta_frac;
            }
        }
    }
}

/// Flux boundary conditions for the temperature diffusion.
///
/// Top flux is the tile-averaged ground heat flux converted to a kinematic
/// temperature flux with the top-cell heat capacity; the bottom is closed.
pub fn set_bcs_temperature(
    flux_top: &mut [f64],
    flux_bot: &mut [f64],
    g_mean: &[f64],
    soil_index: &[usize],
    table: &VanGenuchtenTable,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let k_top = soil_grid.kend - 1;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, k_top);
            let si = soil_index[ijk];

            flux_top[ij] = g_mean[ij] / table.rho_c[si];
            flux_bot[ij] = 0.0;
        }
    }
}

/// Flux boundary conditions for the moisture diffusion.
///
/// Top flux combines bare-soil evaporation and throughfall. The bottom is
/// a zero diffusive flux; under free drainage the bottom half-level
/// conductivity copies the first interior one, so gravity keeps draining
/// the lowest layer.
#[allow(clippy::too_many_arguments)]
pub fn set_bcs_moisture(
    flux_top: &mut [f64],
    flux_bot: &mut [f64],
    conductivity_h: &mut [f64],
    le_soil: &[f64],
    tile_frac_soil: &[f64],
    throughfall: &[f64],
    free_drainage: bool,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let fac = 1.0 / (RHO_W * LV);
    let kk = grid.ijcells;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            flux_top[ij] = tile_frac_soil[ij] * le_soil[ij] * fac + throughfall[ij];
            flux_bot[ij] = 0.0;

            let ijk = grid.ijk(i, j, soil_grid.kstart);
            conductivity_h[ijk] = if free_drainage {
                conductivity_h[ijk + kk]
            } else {
                0.0
            };
        }
    }
}

/// Explicit vertical diffusion tendency for one soil field.
///
/// Adds to `tend`; the caller owns time integration. The conductivity
/// (gravitational drainage) and source (root extraction) terms only apply
/// to the moisture field.
#[allow(clippy::too_many_arguments)]
pub fn diff_explicit(
    tend: &mut [f64],
    fld: &[f64],
    kappa_h: &[f64],
    gamma_h: &[f64],
    source: &[f64],
    flux_top: &[f64],
    flux_bot: &[f64],
    conductivity_term: bool,
    source_term: bool,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let kk = grid.ijcells;
    let kstart = soil_grid.kstart;
    let kend = soil_grid.kend;
    let dzi = &soil_grid.dzi;
    let dzhi = &soil_grid.dzhi;

    // Bottom soil level: prescribed bottom flux replaces the lower
    // diffusive flux.
    let k = kstart;
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, k);

            tend[ijk] += (kappa_h[ijk + kk] * (fld[ijk + kk] - fld[ijk]) * dzhi[k - kstart + 1]
                + flux_bot[ij])
                * dzi[k - kstart];

            if conductivity_term {
                tend[ijk] += (gamma_h[ijk + kk] - gamma_h[ijk]) * dzi[k - kstart];
            }
            if source_term {
                tend[ijk] += source[ijk];
            }
        }
    }

    // Top soil level: prescribed top flux replaces the upper diffusive
    // flux; the conductivity drains into this cell from above nothing, so
    // only the lower half-level conductivity appears.
    let k = kend - 1;
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, k);

            tend[ijk] += (-flux_top[ij]
                - kappa_h[ijk] * (fld[ijk] - fld[ijk - kk]) * dzhi[k - kstart])
                * dzi[k - kstart];

            if conductivity_term {
                tend[ijk] -= gamma_h[ijk] * dzi[k - kstart];
            }
            if source_term {
                tend[ijk] += source[ijk];
            }
        }
    }

    // Interior levels.
    for k in kstart + 1..kend - 1 {
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ijk = grid.ijk(i, j, k);

                tend[ijk] += (kappa_h[ijk + kk] * (fld[ijk + kk] - fld[ijk])
                    * dzhi[k - kstart + 1]
                    - kappa_h[ijk] * (fld[ijk] - fld[ijk - kk]) * dzhi[k - kstart])
                    * dzi[k - kstart];

                if conductivity_term {
                    tend[ijk] += (gamma_h[ijk + kk] - gamma_h[ijk]) * dzi[k - kstart];
                }
                if source_term {
                    tend[ijk] += source[ijk];
                }
            }
        }
    }
}
