//! Obukhov length solvers.
//!
//! The Obukhov length L is defined implicitly through the similarity
//! functions. Two bottom boundary conditions occur:
//!
//! - **no-slip + flux**: the surface buoyancy flux B0 is prescribed and
//!   `L = -u*³/(κ·B0)` with `u* = |Δu|·f_m(z, z0m, L)`. Eliminating u*
//!   gives the scalar equation `B0·z/|Δu|³ = -ζ·f_m³(ζ)/κ` in ζ = z/L.
//! - **no-slip + Dirichlet**: the surface buoyancy difference Δb is
//!   prescribed and the bulk Richardson number satisfies
//!   `Rb = z·Δb/|Δu|² = ζ·f_m²(ζ)/(κ·f_h(ζ))`.
//!
//! Both target functions are monotone in ζ on the unstable side and on the
//! stable side up to a critical ζ beyond which the prescribed forcing can
//! no longer be sustained (the classic maximum-downward-flux limit). The
//! solvers restrict the stable side to the monotone range and clamp
//! stronger forcings to its end.
//!
//! Two interchangeable solvers are provided: a per-cell Newton iteration
//! with a bisection safety net, and a precomputed lookup table for runs
//! with horizontally constant roughness. The lookup search starts from a
//! per-cell bracket hint that persists between time steps, so in a slowly
//! evolving boundary layer it touches only a handful of entries.

use crate::constants::{B_NEUTRAL_EPS, KAPPA, L_BIG};
use crate::surface_layer::most;
use crate::types::ThermoBc;

/// Number of entries in the ζ lookup table.
pub const NZL_LUT: usize = 10_000;

/// Smallest |ζ| resolved by the lookup table.
const ZL_LUT_MIN: f64 = 1e-4;
/// Largest |ζ| covered by the lookup table (unstable side).
const ZL_LUT_MAX: f64 = 50.0;

/// Near-neutral |ζ| bound for the iterative solver.
const ZETA_MIN_ABS: f64 = 1e-10;
/// Most unstable ζ considered by the iterative solver.
const ZETA_UNSTABLE_MAX: f64 = 1e4;

const MAX_ITERS: usize = 40;
const TOL_RESIDUAL: f64 = 1e-5;
const TOL_STEP: f64 = 1e-4;

/// Outcome of a single-cell iterative solve.
#[derive(Clone, Copy, Debug)]
pub struct ObukhovResult {
    /// Obukhov length (m).
    pub obuk: f64,
    /// False when the iteration hit its cap and fell back to the bracket
    /// midpoint.
    pub converged: bool,
}

/// Target function for the no-slip + flux case: `-ζ·f_m³(ζ)/κ`.
///
/// Equals `B0·z/|Δu|³` at the solution; monotonically decreasing in ζ.
#[inline]
fn f_flux(zeta: f64, zsl: f64, z0m: f64) -> f64 {
    -zeta * most::fm(zsl, z0m, zsl / zeta).powi(3) / KAPPA
}

/// Target function for the no-slip + Dirichlet case: `ζ·f_m²(ζ)/(κ·f_h(ζ))`.
///
/// Equals `Rb = z·Δb/|Δu|²` at the solution; monotonically increasing in ζ.
#[inline]
fn f_dirichlet(zeta: f64, zsl: f64, z0m: f64, z0h: f64) -> f64 {
    zeta * most::fm(zsl, z0m, zsl / zeta).powi(2) / (KAPPA * most::fh(zsl, z0h, zsl / zeta))
}

/// Largest stable ζ for which the flux-form target is still monotone.
///
/// With the stable Businger-Dyer functions the denominator of f_m grows as
/// `ln(z/z0m) + 5ζ`, and `ζ/(ln(z/z0m) + 5ζ)³` peaks at `ζ = ln(z/z0m)/10`.
fn zeta_limit_flux(zsl: f64, z0m: f64) -> f64 {
    0.95 * (zsl / z0m).ln() / 10.0
}

/// Largest stable ζ for which the Dirichlet-form target is still monotone.
///
/// `Rb(ζ)` saturates towards 1/5; with `a = ln(z/z0m)`, `b = ln(z/z0h)` its
/// derivative changes sign at `ζ = a·b/(5(b - 2a))` when `b > 2a`.
fn zeta_limit_dirichlet(zsl: f64, z0m: f64, z0h: f64) -> f64 {
    let a = (zsl / z0m).ln();
    let b = (zsl / z0h).ln();
    if b > 2.0 * a {
        0.95 * a * b / (5.0 * (b - 2.0 * a))
    } else {
        f64::INFINITY
    }
}

/// Shared damped-Newton solve on ζ with a shrinking bracket.
///
/// `increasing` states the monotonicity of `f` over the bracket. When the
/// target lies outside the attainable range the nearer bracket end is
/// returned as a converged (capped) solution.
fn newton_solve<F>(
    f: F,
    target: f64,
    mut lo: f64,
    mut hi: f64,
    increasing: bool,
    obuk_prev: f64,
    zsl: f64,
) -> ObukhovResult
where
    F: Fn(f64) -> f64,
{
    let r_lo = f(lo) - target;
    let r_hi = f(hi) - target;

    // No sign change: the forcing is outside the representable range.
    // Clamp to the nearer end.
    if r_lo.signum() == r_hi.signum() {
        let zeta = if r_lo.abs() < r_hi.abs() { lo } else { hi };
        return ObukhovResult {
            obuk: zsl / zeta,
            converged: true,
        };
    }

    // Start from the previous step's ζ when it lies inside the bracket.
    let mut zeta = zsl / obuk_prev;
    if !zeta.is_finite() || zeta <= lo || zeta >= hi {
        let unit = if lo < 0.0 { -1.0 } else { 1.0 };
        zeta = if unit > lo && unit < hi {
            unit
        } else {
            // Geometric mean of the (same-signed) bracket ends.
            (lo * hi).sqrt().copysign(lo)
        };
    }

    let mut converged = false;
    for _ in 0..MAX_ITERS {
        let r = f(zeta) - target;
        if r.abs() < TOL_RESIDUAL {
            converged = true;
            break;
        }

        let left_of_root = if increasing { r < 0.0 } else { r > 0.0 };
        if left_of_root {
            lo = zeta;
        } else {
            hi = zeta;
        }

        // Newton step on a numerically differenced slope; bisect whenever
        // the step would leave the bracket.
        let dz = 1e-3 * zeta.abs();
        let slope = (f(zeta + dz) - f(zeta - dz)) / (2.0 * dz);
        let mut zeta_new = zeta - r / slope;
        if !zeta_new.is_finite() || zeta_new <= lo || zeta_new >= hi {
            zeta_new = 0.5 * (lo + hi);
        }

        if (zeta_new - zeta).abs() < TOL_STEP * zeta.abs() {
            zeta = zeta_new;
            converged = true;
            break;
        }
        zeta = zeta_new;
    }

    if !converged {
        zeta = 0.5 * (lo + hi);
    }

    ObukhovResult {
        obuk: zsl / zeta,
        converged,
    }
}

/// Iterative Obukhov solve for a prescribed surface buoyancy flux.
pub fn calc_obuk_noslip_flux_iterative(
    obuk_prev: f64,
    du: f64,
    b_flux: f64,
    zsl: f64,
    z0m: f64,
) -> ObukhovResult {
    if b_flux.abs() < B_NEUTRAL_EPS {
        return ObukhovResult {
            obuk: -L_BIG,
            converged: true,
        };
    }

    let target = b_flux * zsl / du.powi(3);
    let (lo, hi) = if b_flux > 0.0 {
        // Unstable side.
        (-ZETA_UNSTABLE_MAX, -ZETA_MIN_ABS)
    } else {
        (ZETA_MIN_ABS, zeta_limit_flux(zsl, z0m))
    };

    newton_solve(
        |zeta| f_flux(zeta, zsl, z0m),
        target,
        lo,
        hi,
        false,
        obuk_prev,
        zsl,
    )
}

/// Iterative Obukhov solve for a prescribed surface buoyancy difference.
pub fn calc_obuk_noslip_dirichlet_iterative(
    obuk_prev: f64,
    du: f64,
    db: f64,
    zsl: f64,
    z0m: f64,
    z0h: f64,
) -> ObukhovResult {
    if db.abs() < B_NEUTRAL_EPS {
        return ObukhovResult {
            obuk: -L_BIG,
            converged: true,
        };
    }

    let target = zsl * db / du.powi(2);
    let (lo, hi) = if db < 0.0 {
        // Warm surface: unstable.
        (-ZETA_UNSTABLE_MAX, -ZETA_MIN_ABS)
    } else {
        (
            ZETA_MIN_ABS,
            zeta_limit_dirichlet(zsl, z0m, z0h).min(ZETA_UNSTABLE_MAX),
        )
    };

    newton_solve(
        |zeta| f_dirichlet(zeta, zsl, z0m, z0h),
        target,
        lo,
        hi,
        true,
        obuk_prev,
        zsl,
    )
}

/// Precomputed ζ lookup table for horizontally constant roughness.
///
/// Entries are ordered by ascending ζ: the unstable half runs from -50 up
/// to -1e-4 and the stable half from +1e-4 up to the monotone limit of the
/// tabulated function, both logarithmically spaced in |ζ|.
#[derive(Clone, Debug)]
pub struct ObukhovLookup {
    zl: Vec<f64>,
    f: Vec<f64>,
    thermobc: ThermoBc,
}

impl ObukhovLookup {
    /// Build the table for the given surface-layer geometry and thermal
    /// boundary condition.
    pub fn new(zsl: f64, z0m: f64, z0h: f64, thermobc: ThermoBc) -> Self {
        let half = NZL_LUT / 2;

        let zl_stable_max = match thermobc {
            ThermoBc::Flux => zeta_limit_flux(zsl, z0m).min(ZL_LUT_MAX),
            ThermoBc::Dirichlet => zeta_limit_dirichlet(zsl, z0m, z0h).min(ZL_LUT_MAX),
        };

        let mut zl = Vec::with_capacity(NZL_LUT);

        // Unstable half, ascending ζ (descending |ζ|).
        let ratio_u = (ZL_LUT_MAX / ZL_LUT_MIN).ln() / (half - 1) as f64;
        for n in 0..half {
            let mag = ZL_LUT_MIN * ((half - 1 - n) as f64 * ratio_u).exp();
            zl.push(-mag);
        }

        // Stable half, ascending ζ.
        let ratio_s = (zl_stable_max / ZL_LUT_MIN).ln() / (half - 1) as f64;
        for n in 0..half {
            zl.push(ZL_LUT_MIN * (n as f64 * ratio_s).exp());
        }

        let f = zl
            .iter()
            .map(|&zeta| match thermobc {
                ThermoBc::Flux => f_flux(zeta, zsl, z0m),
                ThermoBc::Dirichlet => f_dirichlet(zeta, zsl, z0m, z0h),
            })
            .collect();

        Self { zl, f, thermobc }
    }

    /// Solve for L under a prescribed surface buoyancy flux.
    ///
    /// `nobuk` is the cell's persistent bracket hint.
    pub fn solve_flux(&self, nobuk: &mut usize, du: f64, b_flux: f64, zsl: f64) -> f64 {
        debug_assert_eq!(self.thermobc, ThermoBc::Flux);
        if b_flux.abs() < B_NEUTRAL_EPS {
            return -L_BIG;
        }
        let target = b_flux * zsl / du.powi(3);
        let zeta = self.locate(target, false, nobuk);
        finite_obuk(zsl, zeta)
    }

    /// Solve for L under a prescribed surface buoyancy difference.
    pub fn solve_dirichlet(&self, nobuk: &mut usize, du: f64, db: f64, zsl: f64) -> f64 {
        debug_assert_eq!(self.thermobc, ThermoBc::Dirichlet);
        if db.abs() < B_NEUTRAL_EPS {
            return -L_BIG;
        }
        let target = zsl * db / du.powi(2);
        let zeta = self.locate(target, true, nobuk);
        finite_obuk(zsl, zeta)
    }

    /// Hinted monotone bracket search plus linear interpolation in ζ.
    fn locate(&self, target: f64, increasing: bool, nobuk: &mut usize) -> f64 {
        let last = self.zl.len() - 2;
        let mut idx = (*nobuk).min(last);

        if increasing {
            while idx > 0 && self.f[idx] > target {
                idx -= 1;
            }
            while idx < last && self.f[idx + 1] <= target {
                idx += 1;
            }
        } else {
            while idx > 0 && self.f[idx] < target {
                idx -= 1;
            }
            while idx < last && self.f[idx + 1] >= target {
                idx += 1;
            }
        }
        *nobuk = idx;

        let (f0, f1) = (self.f[idx], self.f[idx + 1]);
        let w = if (f1 - f0).abs() > 0.0 {
            ((target - f0) / (f1 - f0)).clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.zl[idx] + w * (self.zl[idx + 1] - self.zl[idx])
    }

    /// Number of table entries.
    pub fn len(&self) -> usize {
        self.zl.len()
    }

    /// True when the table holds no entries (never the case after `new`).
    pub fn is_empty(&self) -> bool {
        self.zl.is_empty()
    }
}

/// Convert an interpolated ζ into L, guarding the neutral crossing where
/// the interpolation may land arbitrarily close to ζ = 0.
#[inline]
fn finite_obuk(zsl: f64, zeta: f64) -> f64 {
    if zeta.abs() < 1e-9 {
        -L_BIG
    } else {
        zsl / zeta
    }
}
