//! Liquid water skin reservoir.
//!
//! The canopy and ground hold a thin film of intercepted rain and dew,
//! bounded by `w_l,max = w_l,sat·(1 - c_veg + c_veg·LAI)`. Its tendency
//! collects evaporation of the wet fraction, dew fall from any tile, and
//! interception of precipitation; the sum is clamped so the reservoir
//! stays inside `[0, w_l,max]` over the sub-step, and the clamped-off
//! water is diagnosed as additional throughfall.
//!
//! Sign conventions: the rain rate is positive downwards; `throughfall`
//! accumulates negative (downward) contributions so it can be added
//! directly to the soil moisture top flux.

use crate::constants::{INTERCEPT_EFF, LV, RHO_W};
use crate::grid::AtmosphereGrid;
use crate::land_surface::tile::wl_max;

/// Advance the reservoir tendency and diagnose interception/throughfall.
///
/// Adds the limited tendency to `wl_tend`; `wl` is the state at the start
/// of the sub-step of length `sub_dt`.
#[allow(clippy::too_many_arguments)]
pub fn calc_liquid_water_reservoir(
    wl_tend: &mut [f64],
    interception: &mut [f64],
    throughfall: &mut [f64],
    wl: &[f64],
    le_veg: &[f64],
    le_soil: &[f64],
    le_wet: &[f64],
    frac_veg: &[f64],
    frac_soil: &[f64],
    frac_wet: &[f64],
    rain_rate: &[f64],
    c_veg: &[f64],
    lai: &[f64],
    sub_dt: f64,
    grid: &AtmosphereGrid,
) {
    let to_ms = 1.0 / (RHO_W * LV);
    let sub_dti = 1.0 / sub_dt;

    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);

            let wlm = wl_max(c_veg[ij], lai[ij]);

            // Largest tendencies which keep 0 <= wl + dt·tend <= wl_max.
            let wl_tend_max = (wlm - wl[ij]) * sub_dti - wl_tend[ij];
            let wl_tend_min = -wl[ij] * sub_dti - wl_tend[ij];

            // Evaporation of the wet-skin fraction drains the reservoir.
            let wl_tend_liq = -(frac_wet[ij] * le_wet[ij] * to_ms).max(0.0);

            // Dew fall (negative LE) from any tile collects on the skin.
            let wl_tend_dew = -((frac_wet[ij] * le_wet[ij] * to_ms).min(0.0)
                + (frac_veg[ij] * le_veg[ij] * to_ms).min(0.0)
                + (frac_soil[ij] * le_soil[ij] * to_ms).min(0.0));

            // Interception of precipitation by the vegetated fraction.
            let wl_tend_precip = INTERCEPT_EFF * c_veg[ij] * rain_rate[ij];

            let wl_tend_sum = wl_tend_liq + wl_tend_dew + wl_tend_precip;
            let wl_tend_lim = wl_tend_sum.max(wl_tend_min).min(wl_tend_max);

            // Rain that never hits the canopy, plus the part the full
            // reservoir rejected.
            throughfall[ij] = -(1.0 - c_veg[ij]) * rain_rate[ij]
                - (1.0 - INTERCEPT_EFF) * c_veg[ij] * rain_rate[ij]
                + (wl_tend_lim - wl_tend_sum).min(0.0);

            interception[ij] = wl_tend_lim.max(0.0);

            wl_tend[ij] += wl_tend_lim;
        }
    }
}

/// Infiltration diagnostic: the throughfall water entering the topsoil,
/// positive downwards.
pub fn diagnose_infiltration(
    infiltration: &mut [f64],
    throughfall: &[f64],
    grid: &AtmosphereGrid,
) {
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            infiltration[ij] = -throughfall[ij];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WL_SAT;

    fn grid() -> AtmosphereGrid {
        AtmosphereGrid::new(2, 2, 1, 1, 1, vec![-10.0, 10.0])
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        grid: &AtmosphereGrid,
        wl_val: f64,
        le_wet: f64,
        le_veg: f64,
        rain: f64,
        c_veg_val: f64,
        sub_dt: f64,
    ) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut wl_tend = grid.plane();
        let mut interception = grid.plane();
        let mut throughfall = grid.plane();
        let wl = grid.plane_filled(wl_val);
        let le_veg = grid.plane_filled(le_veg);
        let le_soil = grid.plane();
        let le_wet = grid.plane_filled(le_wet);
        let frac_veg = grid.plane_filled(0.6);
        let frac_soil = grid.plane_filled(0.2);
        let frac_wet = grid.plane_filled(0.2);
        let rain_rate = grid.plane_filled(rain);
        let c_veg = grid.plane_filled(c_veg_val);
        let lai = grid.plane_filled(2.0);

        calc_liquid_water_reservoir(
            &mut wl_tend,
            &mut interception,
            &mut throughfall,
            &wl,
            &le_veg,
            &le_soil,
            &le_wet,
            &frac_veg,
            &frac_soil,
            &frac_wet,
            &rain_rate,
            &c_veg,
            &lai,
            sub_dt,
            grid,
        );
        (wl_tend, interception, throughfall)
    }

    #[test]
    fn test_rain_partition_no_canopy_storage_limit() {
        // Half-full reservoir, moderate rain: interception takes
        // 0.5·c_veg of the rain, throughfall carries the rest.
        let g = grid();
        let rain = 1e-6; // m/s
        let (wl_tend, interception, throughfall) = run(&g, 0.5 * WL_SAT, 0.0, 0.0, rain, 0.8, 10.0);

        let ij = g.ij(g.istart, g.jstart);
        assert!((interception[ij] - 0.5 * 0.8 * rain).abs() < 1e-18);
        assert!((throughfall[ij] + (0.2 + 0.5 * 0.8) * rain).abs() < 1e-18);
        assert!((wl_tend[ij] - interception[ij]).abs() < 1e-18);
        // Water is conserved: interception - throughfall = rain.
        assert!((interception[ij] - throughfall[ij] - rain).abs() < 1e-18);
    }

    #[test]
    fn test_full_reservoir_rejects_interception() {
        // A brim-full reservoir cannot intercept: everything falls through.
        let g = grid();
        let c_veg = 0.8;
        let lai = 2.0;
        let wlm = WL_SAT * (1.0 - c_veg + c_veg * lai);
        let rain = 1e-6;
        let (wl_tend, interception, throughfall) = run(&g, wlm, 0.0, 0.0, rain, c_veg, 10.0);

        let ij = g.ij(g.istart, g.jstart);
        assert!(wl_tend[ij].abs() < 1e-18);
        assert!(interception[ij].abs() < 1e-18);
        assert!((throughfall[ij] + rain).abs() < 1e-18);
    }

    #[test]
    fn test_wet_evaporation_drains_reservoir() {
        let g = grid();
        let (wl_tend, _, _) = run(&g, 0.5 * WL_SAT, 50.0, 0.0, 0.0, 0.8, 10.0);
        let ij = g.ij(g.istart, g.jstart);
        let expected = -0.2 * 50.0 / (RHO_W * LV);
        assert!((wl_tend[ij] - expected).abs() < 1e-18);
    }

    #[test]
    fn test_dew_fills_reservoir() {
        // Dew (negative LE) adds water from any tile.
        let g = grid();
        let (wl_tend, _, _) = run(&g, 0.5 * WL_SAT, -20.0, -10.0, 0.0, 0.8, 10.0);
        let ij = g.ij(g.istart, g.jstart);
        let expected = (0.2 * 20.0 + 0.6 * 10.0) / (RHO_W * LV);
        assert!((wl_tend[ij] - expected).abs() < 1e-18);
        assert!(wl_tend[ij] > 0.0);
    }

    #[test]
    fn test_tendency_never_overfills() {
        // Torrential rain on a nearly full reservoir: the limited tendency
        // must stop exactly at wl_max.
        let g = grid();
        let c_veg = 0.8;
        let lai = 2.0;
        let wlm = WL_SAT * (1.0 - c_veg + c_veg * lai);
        let sub_dt = 10.0;
        let (wl_tend, _, _) = run(&g, 0.95 * wlm, 0.0, 0.0, 1e-4, c_veg, sub_dt);

        let ij = g.ij(g.istart, g.jstart);
        let wl_new = 0.95 * wlm + sub_dt * wl_tend[ij];
        assert!(wl_new <= wlm * (1.0 + 1e-12));
        assert!((wl_new - wlm).abs() < 1e-15);
    }
}
