//! Van Genuchten soil hydraulics.
//!
//! Closed-form moisture diffusivity and hydraulic conductivity from the
//! van Genuchten (1980) retention curve with Mualem pore connectivity,
//! parameterised per soil type by `{α, n, l, γ_sat, θ_res, θ_sat}`.
//!
//! A [`VanGenuchtenTable`] holds one row per soil type. The derived
//! columns (m = 1 - 1/n, the κ/γ clamping bounds, the dry thermal
//! conductivity, and the volumetric heat capacity) are computed once at
//! construction; the per-cell property kernels then only index.

use crate::constants::{RHO_C_MATRIX, RHO_C_WATER, RHO_SOLID_SOIL};

/// Moisture diffusivity κ(θ_n) (m² s⁻¹).
///
/// `theta_norm` is the normalised water content `(θ - θ_res)/(θ_sat - θ_res)`,
/// which callers must keep strictly inside (0, 1).
#[inline]
pub fn diffusivity(
    vg_a: f64,
    vg_l: f64,
    vg_m: f64,
    gamma_sat: f64,
    theta_res: f64,
    theta_sat: f64,
    theta_norm: f64,
) -> f64 {
    let vg_mi = 1.0 / vg_m;

    (1.0 - vg_m) * gamma_sat / (vg_a * vg_m * (theta_sat - theta_res))
        * theta_norm.powf(vg_l - vg_mi)
        * ((1.0 - theta_norm.powf(vg_mi)).powf(-vg_m)
            + (1.0 - theta_norm.powf(vg_mi)).powf(vg_m)
            - 2.0)
}

/// Hydraulic conductivity γ(θ_n) (m s⁻¹).
#[inline]
pub fn conductivity(theta_norm: f64, vg_l: f64, vg_m: f64, gamma_sat: f64) -> f64 {
    gamma_sat
        * theta_norm.powf(vg_l)
        * (1.0 - (1.0 - theta_norm.powf(1.0 / vg_m)).powf(vg_m)).powi(2)
}

/// Lookup table of van Genuchten parameters, one row per soil type.
///
/// The raw columns match the on-disk parameter table; everything below
/// `vg_m` is derived at construction.
#[derive(Clone, Debug)]
pub struct VanGenuchtenTable {
    /// Residual water content (m³ m⁻³).
    pub theta_res: Vec<f64>,
    /// Wilting point (m³ m⁻³).
    pub theta_wp: Vec<f64>,
    /// Field capacity (m³ m⁻³).
    pub theta_fc: Vec<f64>,
    /// Saturated water content (m³ m⁻³).
    pub theta_sat: Vec<f64>,
    /// Saturated hydraulic conductivity (m s⁻¹).
    pub gamma_sat: Vec<f64>,
    /// Retention curve parameter α (m⁻¹).
    pub vg_a: Vec<f64>,
    /// Pore connectivity parameter l (-).
    pub vg_l: Vec<f64>,
    /// Retention curve parameter n (-).
    pub vg_n: Vec<f64>,
    /// Derived `m = 1 - 1/n`.
    pub vg_m: Vec<f64>,
    /// Diffusivity evaluated just above the residual content.
    pub kappa_min: Vec<f64>,
    /// Diffusivity evaluated just below saturation.
    pub kappa_max: Vec<f64>,
    /// Lower conductivity bound (zero).
    pub gamma_min: Vec<f64>,
    /// Upper conductivity bound (the saturated value).
    pub gamma_max: Vec<f64>,
    /// Dry-soil thermal conductivity (W m⁻¹ K⁻¹).
    pub gamma_t_dry: Vec<f64>,
    /// Volumetric heat capacity at field capacity (J m⁻³ K⁻¹).
    pub rho_c: Vec<f64>,
}

impl VanGenuchtenTable {
    /// Build the table from the raw parameter columns.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        theta_res: Vec<f64>,
        theta_wp: Vec<f64>,
        theta_fc: Vec<f64>,
        theta_sat: Vec<f64>,
        gamma_sat: Vec<f64>,
        vg_a: Vec<f64>,
        vg_l: Vec<f64>,
        vg_n: Vec<f64>,
    ) -> Self {
        let size = theta_res.len();
        assert!(
            [&theta_wp, &theta_fc, &theta_sat, &gamma_sat, &vg_a, &vg_l, &vg_n]
                .iter()
                .all(|c| c.len() == size),
            "van Genuchten table columns differ in length"
        );

        let mut vg_m = vec![0.0; size];
        let mut kappa_min = vec![0.0; size];
        let mut kappa_max = vec![0.0; size];
        let mut gamma_min = vec![0.0; size];
        let mut gamma_max = vec![0.0; size];
        let mut gamma_t_dry = vec![0.0; size];
        let mut rho_c = vec![0.0; size];

        for i in 0..size {
            vg_m[i] = 1.0 - 1.0 / vg_n[i];

            // Clamping bounds for the moisture diffusivity, evaluated at
            // 1.001·θ_res and 0.999·θ_sat.
            let span = theta_sat[i] - theta_res[i];
            let theta_norm_min = (1.001 * theta_res[i] - theta_res[i]) / span;
            let theta_norm_max = (0.999 * theta_sat[i] - theta_res[i]) / span;

            kappa_min[i] = diffusivity(
                vg_a[i],
                vg_l[i],
                vg_m[i],
                gamma_sat[i],
                theta_res[i],
                theta_sat[i],
                theta_norm_min,
            );
            kappa_max[i] = diffusivity(
                vg_a[i],
                vg_l[i],
                vg_m[i],
                gamma_sat[i],
                theta_res[i],
                theta_sat[i],
                theta_norm_max,
            );

            gamma_min[i] = 0.0;
            gamma_max[i] = gamma_sat[i];

            // Dry thermal conductivity from the dry soil density
            // (Peters-Lidard et al. 1998, eq. 6).
            let rho_dry = (1.0 - theta_sat[i]) * RHO_SOLID_SOIL;
            gamma_t_dry[i] = (0.135 * rho_dry + 64.7) / (RHO_SOLID_SOIL - 0.947 * rho_dry);
            rho_c[i] = (1.0 - theta_sat[i]) * RHO_C_MATRIX + theta_fc[i] * RHO_C_WATER;
        }

        Self {
            theta_res,
            theta_wp,
            theta_fc,
            theta_sat,
            gamma_sat,
            vg_a,
            vg_l,
            vg_n,
            vg_m,
            kappa_min,
            kappa_max,
            gamma_min,
            gamma_max,
            gamma_t_dry,
            rho_c,
        }
    }

    /// Number of soil types in the table.
    pub fn len(&self) -> usize {
        self.theta_res.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.theta_res.is_empty()
    }

    /// A single-row table with ECMWF medium-fine parameters, used by the
    /// tests and as a fallback reference type.
    pub fn medium_fine() -> Self {
        Self::new(
            vec![0.010],
            vec![0.151],
            vec![0.346],
            vec![0.439],
            vec![0.2842 / 86400.0],
            vec![0.0314 * 100.0],
            vec![-2.342],
            vec![1.28],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_columns() {
        let table = VanGenuchtenTable::medium_fine();
        assert_eq!(table.len(), 1);
        assert!((table.vg_m[0] - (1.0 - 1.0 / 1.28)).abs() < 1e-14);
        assert!(table.kappa_min[0] > 0.0);
        assert!(table.kappa_max[0] > table.kappa_min[0]);
        assert!((table.gamma_max[0] - table.gamma_sat[0]).abs() < 1e-20);
        assert!(table.gamma_t_dry[0] > 0.0);
        assert!(table.rho_c[0] > 1e6);
    }

    #[test]
    fn test_conductivity_limits() {
        let t = VanGenuchtenTable::medium_fine();
        // γ vanishes at the residual content and reaches γ_sat at saturation.
        let g_dry = conductivity(1e-6, t.vg_l[0], t.vg_m[0], t.gamma_sat[0]);
        let g_sat = conductivity(1.0, t.vg_l[0], t.vg_m[0], t.gamma_sat[0]);
        assert!(g_dry.abs() < 1e-12 * t.gamma_sat[0].abs().max(1.0));
        assert!((g_sat - t.gamma_sat[0]).abs() < 1e-14);
    }

    #[test]
    fn test_diffusivity_monotone_midrange() {
        let t = VanGenuchtenTable::medium_fine();
        let k = |tn: f64| {
            diffusivity(
                t.vg_a[0],
                t.vg_l[0],
                t.vg_m[0],
                t.gamma_sat[0],
                t.theta_res[0],
                t.theta_sat[0],
                tn,
            )
        };
        assert!(k(0.5) > 0.0);
        assert!(k(0.8) > k(0.5));
    }
}
