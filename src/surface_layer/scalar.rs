//! Surface closure for scalars and derived surface-layer diagnostics.

use crate::constants::{D_SMALL, KAPPA};
use crate::grid::AtmosphereGrid;
use crate::surface_layer::most;
use crate::types::ScalarBc;

/// Scalar surface closure.
///
/// Dirichlet: the surface value is known, the flux follows from the
/// similarity profile. Flux: the flux is known, the surface value follows.
/// The surface gradient is the linear difference in both cases, for the
/// same reason as the momentum closure.
#[allow(clippy::too_many_arguments)]
pub fn surfs(
    varbot: &mut [f64],
    vargradbot: &mut [f64],
    varfluxbot: &mut [f64],
    ustar: &[f64],
    obuk: &[f64],
    var: &[f64],
    z0h: &[f64],
    grid: &AtmosphereGrid,
    bcbot: ScalarBc,
) {
    let kstart = grid.kstart;
    let zsl = grid.zsl();

    match bcbot {
        ScalarBc::Dirichlet => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, kstart);
                    varfluxbot[ij] =
                        -(var[ijk] - varbot[ij]) * ustar[ij] * most::fh(zsl, z0h[ij], obuk[ij]);
                    vargradbot[ij] = (var[ijk] - varbot[ij]) / zsl;
                }
            }
        }
        ScalarBc::Flux => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, kstart);
                    varbot[ij] = varfluxbot[ij] / (ustar[ij] * most::fh(zsl, z0h[ij], obuk[ij]))
                        + var[ijk];
                    vargradbot[ij] = (var[ijk] - varbot[ij]) / zsl;
                }
            }
        }
    }
}

/// Monin-Obukhov buoyancy gradient at the lowest model level.
pub fn calc_dbdz(
    dbdz_mo: &mut [f64],
    b_flux_bot: &[f64],
    ustar: &[f64],
    obuk: &[f64],
    grid: &AtmosphereGrid,
) {
    let zsl = grid.zsl();

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            dbdz_mo[ij] =
                -b_flux_bot[ij] / (KAPPA * zsl * ustar[ij]) * most::phi_h(zsl / obuk[ij]);
        }
    }
}

/// Aerodynamic resistance `r_a = 1/(u*·f_h)` (s m⁻¹).
pub fn calc_ra(
    ra: &mut [f64],
    ustar: &[f64],
    obuk: &[f64],
    z0h: &[f64],
    grid: &AtmosphereGrid,
) {
    let zsl = grid.zsl();

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let exchange = (ustar[ij] * most::fh(zsl, z0h[ij], obuk[ij])).max(D_SMALL);
            ra[ij] = 1.0 / exchange;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::L_BIG;

    #[test]
    fn test_scalar_dirichlet_flux_roundtrip() {
        // Solving Dirichlet then feeding the flux back through the Flux
        // branch must reproduce the surface value.
        let grid = AtmosphereGrid::new(4, 4, 1, 1, 1, vec![-10.0, 10.0]);
        let n3 = grid.ijcells * 2;
        let var = vec![300.0; n3];
        let ustar = grid.plane_filled(0.3);
        let obuk = grid.plane_filled(-100.0);
        let z0h = grid.plane_filled(0.01);

        let mut varbot = grid.plane_filled(301.5);
        let mut vargradbot = grid.plane();
        let mut varfluxbot = grid.plane();

        surfs(
            &mut varbot,
            &mut vargradbot,
            &mut varfluxbot,
            &ustar,
            &obuk,
            &var,
            &z0h,
            &grid,
            ScalarBc::Dirichlet,
        );

        let ij = grid.ij(2, 2);
        // Warm surface: upward (positive) flux.
        assert!(varfluxbot[ij] > 0.0);

        let mut varbot2 = grid.plane();
        let mut vargradbot2 = grid.plane();
        surfs(
            &mut varbot2,
            &mut vargradbot2,
            &mut varfluxbot,
            &ustar,
            &obuk,
            &var,
            &z0h,
            &grid,
            ScalarBc::Flux,
        );
        assert!((varbot2[ij] - 301.5).abs() < 1e-10);
        assert!((vargradbot2[ij] - vargradbot[ij]).abs() < 1e-12);
    }

    #[test]
    fn test_ra_neutral_value() {
        // Neutral: r_a = ln(z/z0h)/(κ·u*).
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let ustar = grid.plane_filled(0.4);
        let obuk = grid.plane_filled(-L_BIG);
        let z0h = grid.plane_filled(0.01);
        let mut ra = grid.plane();

        calc_ra(&mut ra, &ustar, &obuk, &z0h, &grid);

        let ij = grid.ij(grid.istart, grid.jstart);
        let expected = (1000.0f64).ln() / (0.4 * KAPPA);
        assert!((ra[ij] - expected).abs() / expected < 1e-10);
        assert!(ra.iter().all(|v| v.is_finite()));
    }
}
