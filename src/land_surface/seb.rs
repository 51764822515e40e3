//! Tile surface energy balance.
//!
//! Per tile the balance `Q_net = H + LE + G` is solved analytically for a
//! new skin temperature by linearising the Stefan-Boltzmann emission and
//! the saturated humidity around the previous skin temperature:
//!
//! ```text
//! f_H  = ρ·c_p/r_a       f_LE = ρ·L_v/(r_a + r_s)       f_G = Λ
//! num  = -(Q_net - LW↑ - f_H·T_a
//!          + (q_sat - dq_sat/dT·T_0 - q_t)·f_LE - f_G·T_s - 3σT_0⁴)
//! den  = f_H + f_LE·dq_sat/dT + f_G + 4σT_0³
//! T_new = num/den
//! ```
//!
//! Because the humidity update uses the same linearised `q_sat`, the
//! residual of the balance closes to rounding error by construction.

use crate::constants::{CP, LV, SIGMA_B};
use crate::grid::{AtmosphereGrid, SoilGrid};

/// Select the skin conductivity by the stability of the previous step.
///
/// Stable conditions decouple the skin from the soil (a thinner effective
/// contact layer), unstable conditions couple them more strongly.
pub fn choose_skin_conductivity(
    lambda: &mut [f64],
    lambda_stable: &[f64],
    lambda_unstable: &[f64],
    obuk: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            lambda[ij] = if obuk[ij] < 0.0 {
                lambda_unstable[ij]
            } else {
                lambda_stable[ij]
            };
        }
    }
}

/// Solve the linearised SEB for one tile.
///
/// `t_bot` is the previous skin temperature (the linearisation point);
/// the solved temperature is written to `t_bot_new`. In dew conditions
/// (`q_sat < q_t`) the surface resistance is bypassed: condensation does
/// not pass through stomata.
#[allow(clippy::too_many_arguments)]
pub fn calc_fluxes(
    h: &mut [f64],
    le: &mut [f64],
    g: &mut [f64],
    t_bot_new: &mut [f64],
    t_a: &[f64],
    qt: &[f64],
    t_soil: &[f64],
    t_bot: &[f64],
    qsat_bot: &[f64],
    dqsatdt_bot: &[f64],
    ra: &[f64],
    rs: &[f64],
    lambda: &[f64],
    sw_dn: &[f64],
    sw_up: &[f64],
    lw_dn: &[f64],
    lw_up: &[f64],
    rho_air: f64,
    grid: &AtmosphereGrid,
    soil_grid: &SoilGrid,
) {
    let kstart = grid.kstart;
    let k_soil_top = soil_grid.kend - 1;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let ijk = grid.ijk(i, j, kstart);
            let ijk_s = grid.ijk(i, j, k_soil_top);

            // No canopy/soil resistance for dew fall.
            let rs_lim = if qsat_bot[ij] < qt[ijk] { 0.0 } else { rs[ij] };

            let f_h = rho_air * CP / ra[ij];
            let f_le = rho_air * LV / (ra[ij] + rs_lim);
            let f_g = lambda[ij];

            // Net radiation; negative sign = net input of energy at the
            // surface.
            let q_net = -(sw_dn[ij] - sw_up[ij] + lw_dn[ij] - lw_up[ij]);

            let t0 = t_bot[ij];
            let num = -(q_net - lw_up[ij] - f_h * t_a[ij]
                + (qsat_bot[ij] - dqsatdt_bot[ij] * t0 - qt[ijk]) * f_le
                - f_g * t_soil[ijk_s]
                - 3.0 * SIGMA_B * t0.powi(4));
            let den = f_h + f_le * dqsatdt_bot[ij] + f_g + 4.0 * SIGMA_B * t0.powi(3);
            let t_new = num / den;

            // The linearised q_sat keeps the balance closed.
            let qsat_new = qsat_bot[ij] + dqsatdt_bot[ij] * (t_new - t0);

            t_bot_new[ij] = t_new;
            h[ij] = f_h * (t_new - t_a[ij]);
            le[ij] = f_le * (qsat_new - qt[ijk]);
            g[ij] = f_g * (t_soil[ijk_s] - t_new);
        }
    }
}

/// Fluxes over open water: the skin temperature is pinned.
///
/// Same linearised expressions with `r_s = 0` and no soil coupling; the
/// skin holds `tskin_water` instead of solving the balance.
#[allow(clippy::too_many_arguments)]
pub fn calc_fluxes_water(
    h: &mut [f64],
    le: &mut [f64],
    g: &mut [f64],
    t_bot_new: &mut [f64],
    water_mask: &[u8],
    t_a: &[f64],
    qt: &[f64],
    t_bot: &[f64],
    qsat_bot: &[f64],
    dqsatdt_bot: &[f64],
    ra: &[f64],
    tskin_water: f64,
    rho_air: f64,
    grid: &AtmosphereGrid,
) {
    let kstart = grid.kstart;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            if water_mask[ij] == 0 {
                continue;
            }
            let ijk = grid.ijk(i, j, kstart);

            let f_h = rho_air * CP / ra[ij];
            let f_le = rho_air * LV / ra[ij];

            let qsat_new = qsat_bot[ij] + dqsatdt_bot[ij] * (tskin_water - t_bot[ij]);

            t_bot_new[ij] = tskin_water;
            h[ij] = f_h * (tskin_water - t_a[ij]);
            le[ij] = f_le * (qsat_new - qt[ijk]);
            g[ij] = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SebSetup {
        grid: AtmosphereGrid,
        soil_grid: SoilGrid,
        t_a: Vec<f64>,
        qt: Vec<f64>,
        t_soil: Vec<f64>,
        t_bot: Vec<f64>,
        qsat_bot: Vec<f64>,
        dqsatdt_bot: Vec<f64>,
        ra: Vec<f64>,
        rs: Vec<f64>,
        lambda: Vec<f64>,
        sw_dn: Vec<f64>,
        sw_up: Vec<f64>,
        lw_dn: Vec<f64>,
        lw_up: Vec<f64>,
    }

    fn setup(qt_val: f64) -> SebSetup {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let soil_grid = SoilGrid::equidistant(4, 2.0);
        let n3 = grid.ijcells * 2;
        let ns = soil_grid.ncells(grid.ijcells);

        SebSetup {
            t_a: grid.plane_filled(288.0),
            qt: vec![qt_val; n3],
            t_soil: vec![287.0; ns],
            t_bot: grid.plane_filled(290.0),
            // Tetens at 290 K, sea level.
            qsat_bot: grid.plane_filled(0.0120),
            dqsatdt_bot: grid.plane_filled(7.5e-4),
            ra: grid.plane_filled(50.0),
            rs: grid.plane_filled(100.0),
            lambda: grid.plane_filled(5.0),
            sw_dn: grid.plane_filled(600.0),
            sw_up: grid.plane_filled(120.0),
            lw_dn: grid.plane_filled(350.0),
            lw_up: grid.plane_filled(400.0),
            grid,
            soil_grid,
        }
    }

    fn solve(s: &SebSetup) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut h = s.grid.plane();
        let mut le = s.grid.plane();
        let mut g = s.grid.plane();
        let mut t_new = s.grid.plane();
        calc_fluxes(
            &mut h,
            &mut le,
            &mut g,
            &mut t_new,
            &s.t_a,
            &s.qt,
            &s.t_soil,
            &s.t_bot,
            &s.qsat_bot,
            &s.dqsatdt_bot,
            &s.ra,
            &s.rs,
            &s.lambda,
            &s.sw_dn,
            &s.sw_up,
            &s.lw_dn,
            &s.lw_up,
            1.2,
            &s.grid,
            &s.soil_grid,
        );
        (h, le, g, t_new)
    }

    #[test]
    fn test_energy_balance_closes() {
        // Q_net - H - LE - G = 0 with the linearised emission, to within
        // 1e-6 W m⁻².
        let s = setup(0.008);
        let (h, le, g, t_new) = solve(&s);

        let ij = s.grid.ij(s.grid.istart, s.grid.jstart);
        let t0 = s.t_bot[ij];
        // Emitted longwave with the linearised Stefan-Boltzmann term.
        let lw_up_new = SIGMA_B * t0.powi(4) + 4.0 * SIGMA_B * t0.powi(3) * (t_new[ij] - t0);
        let q_net = s.sw_dn[ij] - s.sw_up[ij] + s.lw_dn[ij] - lw_up_new;

        // G is positive towards the skin, so it enters the closure as a
        // source alongside the net radiation.
        let residual = q_net + g[ij] - h[ij] - le[ij];
        assert!(residual.abs() < 1e-6, "residual = {}", residual);
    }

    #[test]
    fn test_daytime_fluxes_plausible() {
        let s = setup(0.008);
        let (h, le, g, t_new) = solve(&s);
        let ij = s.grid.ij(s.grid.istart, s.grid.jstart);

        // Strong insolation: warm skin, upward turbulent fluxes.
        assert!(t_new[ij] > s.t_a[ij]);
        assert!(h[ij] > 0.0);
        assert!(le[ij] > 0.0);
        // The soil is colder than the skin: G negative (into the soil).
        assert!(g[ij] < 0.0);
    }

    #[test]
    fn test_dew_disables_surface_resistance() {
        // Saturated air above the surface gives negative LE
        // regardless of the canopy resistance.
        let s = setup(0.014);
        let (_, le, _, _) = solve(&s);
        let ij = s.grid.ij(s.grid.istart, s.grid.jstart);
        assert!(le[ij] < 0.0);

        // With the resistance bypassed, a larger rs must not change LE.
        let mut s2 = setup(0.014);
        for v in s2.rs.iter_mut() {
            *v = 1e6;
        }
        let (_, le2, _, _) = solve(&s2);
        assert!((le[ij] - le2[ij]).abs() < 1e-12);
    }

    #[test]
    fn test_skin_conductivity_switch() {
        let grid = AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0]);
        let stable = grid.plane_filled(10.0);
        let unstable = grid.plane_filled(3.0);
        let mut obuk = grid.plane_filled(-50.0);
        let ij = grid.ij(grid.istart, grid.jstart);
        obuk[ij] = 200.0;

        let mut lambda = grid.plane();
        choose_skin_conductivity(&mut lambda, &stable, &unstable, &obuk, &grid);
        assert_eq!(lambda[ij], 10.0);
        assert_eq!(lambda[grid.ij(grid.istart + 1, grid.jstart)], 3.0);
    }

    #[test]
    fn test_water_cells_pin_skin_temperature() {
        let s = setup(0.008);
        let mut h = s.grid.plane();
        let mut le = s.grid.plane();
        let mut g = s.grid.plane_filled(99.0);
        let mut t_new = s.grid.plane();
        let mut mask = vec![0u8; s.grid.ijcells];
        let ij = s.grid.ij(s.grid.istart, s.grid.jstart);
        mask[ij] = 1;

        calc_fluxes_water(
            &mut h,
            &mut le,
            &mut g,
            &mut t_new,
            &mask,
            &s.t_a,
            &s.qt,
            &s.t_bot,
            &s.qsat_bot,
            &s.dqsatdt_bot,
            &s.ra,
            285.0,
            1.2,
            &s.grid,
        );

        assert_eq!(t_new[ij], 285.0);
        assert_eq!(g[ij], 0.0);
        // Cold water under warm air: downward sensible heat flux.
        assert!(h[ij] < 0.0);
        // Unmasked cells stay untouched.
        let ij2 = s.grid.ij(s.grid.istart + 1, s.grid.jstart);
        assert_eq!(g[ij2], 99.0);
        assert_eq!(t_new[ij2], 0.0);
    }
}
