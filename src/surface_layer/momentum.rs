//! Surface closure for momentum.
//!
//! Computes the bottom flux, surface gradient, and (for the prescribed-u*
//! case) the directional partitioning of the momentum flux, honouring the
//! staggered grid: u lives at (i-1/2, j), v at (i, j-1/2), u* and L at the
//! scalar location.

use crate::boundary::BoundaryCyclic;
use crate::constants::KAPPA;
use crate::grid::AtmosphereGrid;
use crate::surface_layer::most;
use crate::types::MomentumBc;

/// Floor on the squared velocity differences in the flux partitioning.
const DU2_MIN: f64 = 1e-2;

/// Momentum surface closure.
///
/// For the Dirichlet (no-slip) case the flux follows from the interpolated
/// stability function; for the prescribed-u* case the flux is split over
/// the two components so that `u*⁴ = ufluxbot² + vfluxbot²` holds in
/// magnitude. The surface gradient is the plain linear difference in both
/// cases: handing the much steeper similarity gradient to the advection
/// scheme would put unresolvable profiles at the first level.
#[allow(clippy::too_many_arguments)]
pub fn surfm(
    ufluxbot: &mut [f64],
    vfluxbot: &mut [f64],
    ugradbot: &mut [f64],
    vgradbot: &mut [f64],
    ustar: &[f64],
    obuk: &[f64],
    u: &[f64],
    ubot: &[f64],
    v: &[f64],
    vbot: &[f64],
    z0m: &[f64],
    grid: &AtmosphereGrid,
    bcbot: MomentumBc,
    cyclic: &dyn BoundaryCyclic,
) {
    let ii = 1;
    let jj = grid.icells;
    let kstart = grid.kstart;
    let zsl = grid.zsl();

    match bcbot {
        // Surface velocity known: flux from the similarity profile,
        // interpolating the whole stability function to the velocity
        // locations rather than u* or L separately.
        MomentumBc::Dirichlet => {
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, kstart);

                    ufluxbot[ij] = -(u[ijk] - ubot[ij])
                        * 0.5
                        * (ustar[ij - ii] * most::fm(zsl, z0m[ij - ii], obuk[ij - ii])
                            + ustar[ij] * most::fm(zsl, z0m[ij], obuk[ij]));
                    vfluxbot[ij] = -(v[ijk] - vbot[ij])
                        * 0.5
                        * (ustar[ij - jj] * most::fm(zsl, z0m[ij - jj], obuk[ij - jj])
                            + ustar[ij] * most::fm(zsl, z0m[ij], obuk[ij]));
                }
            }

            cyclic.exec_2d(ufluxbot);
            cyclic.exec_2d(vfluxbot);
        }

        // u* known: partition the flux magnitude using the local and
        // bilinearly interpolated opposite-component velocity differences.
        MomentumBc::Ustar => {
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, kstart);

                    let vonu2 = (0.25
                        * (pow2(v[ijk - ii] - vbot[ij - ii])
                            + pow2(v[ijk - ii + jj] - vbot[ij - ii + jj])
                            + pow2(v[ijk] - vbot[ij])
                            + pow2(v[ijk + jj] - vbot[ij + jj])))
                    .max(DU2_MIN);
                    let uonv2 = (0.25
                        * (pow2(u[ijk - jj] - ubot[ij - jj])
                            + pow2(u[ijk + ii - jj] - ubot[ij + ii - jj])
                            + pow2(u[ijk] - ubot[ij])
                            + pow2(u[ijk + ii] - ubot[ij + ii])))
                    .max(DU2_MIN);

                    let u2 = pow2(u[ijk] - ubot[ij]).max(DU2_MIN);
                    let v2 = pow2(v[ijk] - vbot[ij]).max(DU2_MIN);

                    let ustaronu4 = 0.5 * (pow4(ustar[ij - ii]) + pow4(ustar[ij]));
                    let ustaronv4 = 0.5 * (pow4(ustar[ij - jj]) + pow4(ustar[ij]));

                    ufluxbot[ij] = -(1.0f64).copysign(u[ijk] - ubot[ij])
                        * (ustaronu4 / (1.0 + vonu2 / u2)).sqrt();
                    vfluxbot[ij] = -(1.0f64).copysign(v[ijk] - vbot[ij])
                        * (ustaronv4 / (1.0 + uonv2 / v2)).sqrt();
                }
            }

            cyclic.exec_2d(ufluxbot);
            cyclic.exec_2d(vfluxbot);
        }
    }

    for j in 0..grid.jcells {
        for i in 0..grid.icells {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);
            ugradbot[ij] = (u[ijk] - ubot[ij]) / zsl;
            vgradbot[ij] = (v[ijk] - vbot[ij]) / zsl;
        }
    }
}

/// Monin-Obukhov wind gradients at the lowest model level.
///
/// Needed by the subgrid diffusion scheme; part of the checkpoint state
/// because the first step after a restart has no surface history yet.
#[allow(clippy::too_many_arguments)]
pub fn calc_duvdz(
    dudz_mo: &mut [f64],
    dvdz_mo: &mut [f64],
    u: &[f64],
    v: &[f64],
    ubot: &[f64],
    vbot: &[f64],
    ustar: &[f64],
    obuk: &[f64],
    z0m: &[f64],
    grid: &AtmosphereGrid,
) {
    let ii = 1;
    let jj = grid.icells;
    let kstart = grid.kstart;
    let zsl = grid.zsl();

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);

            let du_c = 0.5 * ((u[ijk] - ubot[ij]) + (u[ijk + ii] - ubot[ij + ii]));
            let dv_c = 0.5 * ((v[ijk] - vbot[ij]) + (v[ijk + jj] - vbot[ij + jj]));

            let ufluxbot = -du_c * ustar[ij] * most::fm(zsl, z0m[ij], obuk[ij]);
            let vfluxbot = -dv_c * ustar[ij] * most::fm(zsl, z0m[ij], obuk[ij]);

            let phim = most::phi_m(zsl / obuk[ij]);
            dudz_mo[ij] = -ufluxbot / (KAPPA * zsl * ustar[ij]) * phim;
            dvdz_mo[ij] = -vfluxbot / (KAPPA * zsl * ustar[ij]) * phim;
        }
    }
}

#[inline(always)]
fn pow2(x: f64) -> f64 {
    x * x
}

#[inline(always)]
fn pow4(x: f64) -> f64 {
    let x2 = x * x;
    x2 * x2
}
