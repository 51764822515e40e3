//! Surface-layer stability driver.
//!
//! Produces the friction velocity u* and Obukhov length L for every
//! horizontal cell from the atmospheric state at the lowest model level
//! and the configured bottom boundary conditions.
//!
//! The wind difference with the surface is first interpolated to the
//! scalar location and floored, then exchanged over the halos, and the
//! Obukhov solve dispatches on the (momentum, thermo) boundary-condition
//! pair. The solver loops run over the full padded plane so that the
//! momentum closure can read u* and L at `i-1`/`j-1` neighbours without a
//! second exchange.

use crate::boundary::BoundaryCyclic;
use crate::constants::{B_NEUTRAL_EPS, DUTOT_MIN, KAPPA, L_BIG, USTAR_MIN};
use crate::grid::AtmosphereGrid;
use crate::surface_layer::most;
use crate::surface_layer::obukhov::{
    calc_obuk_noslip_dirichlet_iterative, calc_obuk_noslip_flux_iterative, ObukhovLookup,
};
use crate::types::{MomentumBc, ThermoBc};

/// Obukhov solver selection; the lookup table requires horizontally
/// constant roughness.
#[derive(Clone, Debug)]
pub enum ObukhovSolver {
    /// Precomputed lookup table with per-cell bracket hints.
    Lookup(ObukhovLookup),
    /// Per-cell Newton iteration.
    Iterative,
}

/// Interpolate the wind difference with the surface to the scalar
/// location and floor it, then make the halos consistent.
///
/// The floor prevents the surface-layer transfer coefficients (and with
/// them the eddy viscosity at the first level) from blowing up in calms.
pub fn calc_dutot(
    dutot: &mut [f64],
    u: &[f64],
    v: &[f64],
    ubot: &[f64],
    vbot: &[f64],
    grid: &AtmosphereGrid,
    cyclic: &dyn BoundaryCyclic,
) {
    let ii = 1;
    let jj = grid.icells;
    let kstart = grid.kstart;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);
            let du = 0.5 * (u[ijk] + u[ijk + ii]) - 0.5 * (ubot[ij] + ubot[ij + ii]);
            let dv = 0.5 * (v[ijk] + v[ijk + jj]) - 0.5 * (vbot[ij] + vbot[ij + jj]);
            dutot[ij] = (du * du + dv * dv).sqrt().max(DUTOT_MIN);
        }
    }

    cyclic.exec_2d(dutot);
}

/// Solve for {u*, L} over the plane.
///
/// Returns the number of cells whose iterative solve did not converge
/// (always zero for the lookup solver).
#[allow(clippy::too_many_arguments)]
pub fn stability(
    ustar: &mut [f64],
    obuk: &mut [f64],
    nobuk: &mut [usize],
    dutot: &[f64],
    b: &[f64],
    b_bot: &[f64],
    b_flux_bot: &[f64],
    z0m: &[f64],
    z0h: &[f64],
    db_ref: f64,
    grid: &AtmosphereGrid,
    mbcbot: MomentumBc,
    thermobc: ThermoBc,
    solver: &ObukhovSolver,
) -> usize {
    let zsl = grid.zsl();
    let kstart = grid.kstart;
    let mut non_converged = 0;

    match (mbcbot, thermobc) {
        // Fixed buoyancy flux and fixed u*: L follows directly.
        (MomentumBc::Ustar, ThermoBc::Flux) => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    obuk[ij] = if b_flux_bot[ij].abs() < B_NEUTRAL_EPS {
                        -L_BIG
                    } else {
                        -ustar[ij].powi(3) / (KAPPA * b_flux_bot[ij])
                    };
                }
            }
        }

        // Fixed buoyancy flux, free u*.
        (MomentumBc::Dirichlet, ThermoBc::Flux) => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    obuk[ij] = match solver {
                        ObukhovSolver::Lookup(lut) => {
                            lut.solve_flux(&mut nobuk[ij], dutot[ij], b_flux_bot[ij], zsl)
                        }
                        ObukhovSolver::Iterative => {
                            let res = calc_obuk_noslip_flux_iterative(
                                obuk[ij],
                                dutot[ij],
                                b_flux_bot[ij],
                                zsl,
                                z0m[ij],
                            );
                            if !res.converged {
                                non_converged += 1;
                            }
                            if res.obuk.is_finite() {
                                res.obuk
                            } else {
                                obuk[ij]
                            }
                        }
                    };
                    ustar[ij] = (dutot[ij] * most::fm(zsl, z0m[ij], obuk[ij])).max(USTAR_MIN);
                }
            }
        }

        // Fixed buoyancy surface value, free u*.
        (MomentumBc::Dirichlet, ThermoBc::Dirichlet) => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, kstart);
                    let db = b[ijk] - b_bot[ij] + db_ref;

                    obuk[ij] = match solver {
                        ObukhovSolver::Lookup(lut) => {
                            lut.solve_dirichlet(&mut nobuk[ij], dutot[ij], db, zsl)
                        }
                        ObukhovSolver::Iterative => {
                            let res = calc_obuk_noslip_dirichlet_iterative(
                                obuk[ij],
                                dutot[ij],
                                db,
                                zsl,
                                z0m[ij],
                                z0h[ij],
                            );
                            if !res.converged {
                                non_converged += 1;
                            }
                            if res.obuk.is_finite() {
                                res.obuk
                            } else {
                                obuk[ij]
                            }
                        }
                    };
                    ustar[ij] = (dutot[ij] * most::fm(zsl, z0m[ij], obuk[ij])).max(USTAR_MIN);
                }
            }
        }

        // Rejected at configuration time.
        (MomentumBc::Ustar, ThermoBc::Dirichlet) => {}
    }

    non_converged
}

/// Stability without active thermodynamics: neutral everywhere.
pub fn stability_neutral(
    ustar: &mut [f64],
    obuk: &mut [f64],
    dutot: &[f64],
    z0m: &[f64],
    grid: &AtmosphereGrid,
    mbcbot: MomentumBc,
) {
    let zsl = grid.zsl();

    match mbcbot {
        MomentumBc::Ustar => {
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    let ij = grid.ij(i, j);
                    obuk[ij] = -L_BIG;
                }
            }
        }
        MomentumBc::Dirichlet => {
            for j in 0..grid.jcells {
                for i in 0..grid.icells {
                    let ij = grid.ij(i, j);
                    obuk[ij] = -L_BIG;
                    ustar[ij] = (dutot[ij] * most::fm(zsl, z0m[ij], obuk[ij])).max(USTAR_MIN);
                }
            }
        }
    }
}

/// Row-parallel variant of [`stability`] for the iterative solver paths.
///
/// The per-cell solves are independent; the plane is split by j rows.
#[cfg(feature = "parallel")]
#[allow(clippy::too_many_arguments)]
pub fn stability_parallel(
    ustar: &mut [f64],
    obuk: &mut [f64],
    nobuk: &mut [usize],
    dutot: &[f64],
    b: &[f64],
    b_bot: &[f64],
    b_flux_bot: &[f64],
    z0m: &[f64],
    z0h: &[f64],
    db_ref: f64,
    grid: &AtmosphereGrid,
    mbcbot: MomentumBc,
    thermobc: ThermoBc,
    solver: &ObukhovSolver,
) -> usize {
    use rayon::prelude::*;

    if mbcbot != MomentumBc::Dirichlet {
        return stability(
            ustar, obuk, nobuk, dutot, b, b_bot, b_flux_bot, z0m, z0h, db_ref, grid, mbcbot,
            thermobc, solver,
        );
    }

    let zsl = grid.zsl();
    let kstart = grid.kstart;
    let ic = grid.icells;

    ustar
        .par_chunks_mut(ic)
        .zip(obuk.par_chunks_mut(ic))
        .zip(nobuk.par_chunks_mut(ic))
        .enumerate()
        .map(|(j, ((ustar_row, obuk_row), nobuk_row))| {
            let mut non_converged = 0;
            for i in 0..ic {
                let ij = i + j * ic;
                let ijk = ij + kstart * grid.ijcells;

                let l = match thermobc {
                    ThermoBc::Flux => match solver {
                        ObukhovSolver::Lookup(lut) => {
                            lut.solve_flux(&mut nobuk_row[i], dutot[ij], b_flux_bot[ij], zsl)
                        }
                        ObukhovSolver::Iterative => {
                            let res = calc_obuk_noslip_flux_iterative(
                                obuk_row[i],
                                dutot[ij],
                                b_flux_bot[ij],
                                zsl,
                                z0m[ij],
                            );
                            if !res.converged {
                                non_converged += 1;
                            }
                            if res.obuk.is_finite() {
                                res.obuk
                            } else {
                                obuk_row[i]
                            }
                        }
                    },
                    ThermoBc::Dirichlet => {
                        let db = b[ijk] - b_bot[ij] + db_ref;
                        match solver {
                            ObukhovSolver::Lookup(lut) => {
                                lut.solve_dirichlet(&mut nobuk_row[i], dutot[ij], db, zsl)
                            }
                            ObukhovSolver::Iterative => {
                                let res = calc_obuk_noslip_dirichlet_iterative(
                                    obuk_row[i],
                                    dutot[ij],
                                    db,
                                    zsl,
                                    z0m[ij],
                                    z0h[ij],
                                );
                                if !res.converged {
                                    non_converged += 1;
                                }
                                if res.obuk.is_finite() {
                                    res.obuk
                                } else {
                                    obuk_row[i]
                                }
                            }
                        }
                    }
                };

                obuk_row[i] = l;
                ustar_row[i] = (dutot[ij] * most::fm(zsl, z0m[ij], l)).max(USTAR_MIN);
            }
            non_converged
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::PeriodicCyclic;

    fn test_grid() -> AtmosphereGrid {
        AtmosphereGrid::new(4, 4, 1, 1, 1, vec![-10.0, 10.0])
    }

    #[test]
    fn test_dutot_floor_and_halo() {
        let grid = test_grid();
        let cyclic = PeriodicCyclic::new(&grid);
        let n3 = grid.ijcells * 2;

        let u = vec![0.0; n3];
        let v = vec![0.0; n3];
        let ubot = vec![0.0; grid.ijcells];
        let vbot = vec![0.0; grid.ijcells];
        let mut dutot = grid.plane();

        calc_dutot(&mut dutot, &u, &v, &ubot, &vbot, &grid, &cyclic);

        // Calm winds floor at 0.1 m/s, halos included.
        for j in 0..grid.jcells {
            for i in 0..grid.icells {
                if i >= grid.istart - 1 && j >= grid.jstart - 1 {
                    assert!((dutot[grid.ij(i, j)] - DUTOT_MIN).abs() < 1e-14);
                }
            }
        }
    }

    #[test]
    fn test_prescribed_ustar_flux() {
        // u* = 0.2 prescribed with B0 = -5e-4 gives L = 40 m.
        let grid = test_grid();
        let mut ustar = grid.plane_filled(0.2);
        let mut obuk = grid.plane();
        let mut nobuk = vec![0usize; grid.ijcells];
        let dutot = grid.plane_filled(1.0);
        let b = vec![0.0; grid.ijcells * 2];
        let b_bot = grid.plane();
        let b_flux = grid.plane_filled(-5e-4);
        let z0m = grid.plane_filled(0.1);
        let z0h = grid.plane_filled(0.1);

        let n = stability(
            &mut ustar,
            &mut obuk,
            &mut nobuk,
            &dutot,
            &b,
            &b_bot,
            &b_flux,
            &z0m,
            &z0h,
            0.0,
            &grid,
            MomentumBc::Ustar,
            ThermoBc::Flux,
            &ObukhovSolver::Iterative,
        );
        assert_eq!(n, 0);

        let ij = grid.ij(grid.istart, grid.jstart);
        assert!((obuk[ij] - 40.0).abs() < 1e-10, "L = {}", obuk[ij]);
    }

    #[test]
    fn test_neutral_log_law() {
        // Neutral log law: u = 5, z = 10, z0m = 0.1 gives
        // u* = 5·κ/ln(100) = 0.4343.
        let grid = test_grid();
        let mut ustar = grid.plane();
        let mut obuk = grid.plane();
        let dutot = grid.plane_filled(5.0);
        let z0m = grid.plane_filled(0.1);

        stability_neutral(&mut ustar, &mut obuk, &dutot, &z0m, &grid, MomentumBc::Dirichlet);

        let ij = grid.ij(grid.istart, grid.jstart);
        assert!((obuk[ij] + L_BIG).abs() < 1.0);
        assert!((ustar[ij] - 5.0 * KAPPA / 100.0f64.ln()).abs() < 1e-6);
    }
}
