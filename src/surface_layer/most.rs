//! Monin-Obukhov similarity functions.
//!
//! Universal stability functions in the Businger-Dyer form with the Paulson
//! integrated profiles:
//!
//! ```text
//! unstable (ζ < 0):  φ_m = (1 - 16ζ)^(-1/4)    φ_h = (1 - 16ζ)^(-1/2)
//! stable   (ζ > 0):  φ_m = φ_h = 1 + 5ζ
//! ```
//!
//! The integrated factors `f_m` and `f_h` relate the wind and scalar
//! differences over the surface layer to the surface fluxes:
//!
//! ```text
//! f_m(z, z0m, L) = κ / (ln(z/z0m) - ψ_m(z/L) + ψ_m(z0m/L))
//! ```
//!
//! All functions are branch-per-side and return the neutral limit exactly
//! at ζ = 0.

use std::f64::consts::FRAC_PI_2;

use crate::constants::KAPPA;

/// Dimensionless wind gradient φ_m(ζ).
#[inline]
pub fn phi_m(zeta: f64) -> f64 {
    if zeta <= 0.0 {
        (1.0 - 16.0 * zeta).powf(-0.25)
    } else {
        1.0 + 5.0 * zeta
    }
}

/// Dimensionless scalar gradient φ_h(ζ).
#[inline]
pub fn phi_h(zeta: f64) -> f64 {
    if zeta <= 0.0 {
        (1.0 - 16.0 * zeta).powf(-0.5)
    } else {
        1.0 + 5.0 * zeta
    }
}

/// Integrated stability correction for momentum ψ_m(ζ).
#[inline]
pub fn psi_m(zeta: f64) -> f64 {
    if zeta <= 0.0 {
        let x = (1.0 - 16.0 * zeta).powf(0.25);
        2.0 * ((1.0 + x) / 2.0).ln() + ((1.0 + x * x) / 2.0).ln() - 2.0 * x.atan() + FRAC_PI_2
    } else {
        -5.0 * zeta
    }
}

/// Integrated stability correction for scalars ψ_h(ζ).
#[inline]
pub fn psi_h(zeta: f64) -> f64 {
    if zeta <= 0.0 {
        let y = (1.0 - 16.0 * zeta).powf(0.5);
        2.0 * ((1.0 + y) / 2.0).ln()
    } else {
        -5.0 * zeta
    }
}

/// Integrated profile factor for momentum: `u* = |Δu| · f_m`.
#[inline]
pub fn fm(zsl: f64, z0m: f64, obuk: f64) -> f64 {
    KAPPA / ((zsl / z0m).ln() - psi_m(zsl / obuk) + psi_m(z0m / obuk))
}

/// Integrated profile factor for scalars: `flux = -Δs · u* · f_h`.
#[inline]
pub fn fh(zsl: f64, z0h: f64, obuk: f64) -> f64 {
    KAPPA / ((zsl / z0h).ln() - psi_h(zsl / obuk) + psi_h(z0h / obuk))
}
