//! Integration tests for the tiled surface energy balance.
//!
//! These tests verify:
//! - Per-tile energy closure with the linearised emission
//! - Tile fraction invariants
//! - Dew fall: negative LE feeds the reservoir
//! - The surface θ_l/q_t closure handed back to the atmosphere

use lsm_rs::constants::{CP, LV, SIGMA_B};
use lsm_rs::{
    AtmosphereGrid, BuoyancyInput, Config, LandSurfaceModel, MomentumInput, PeriodicCyclic,
    RadiationInput, ScalarInput, SkinInput, SoilGrid, VanGenuchtenTable,
};

const RHO_AIR: f64 = 1.2;
const SUB_DT: f64 = 10.0;

struct Case {
    model: LandSurfaceModel,
    cyclic: PeriodicCyclic,
    u: Vec<f64>,
    v: Vec<f64>,
    u_bot: Vec<f64>,
    v_bot: Vec<f64>,
    thl: Vec<f64>,
    qt: Vec<f64>,
    b: Vec<f64>,
    b_bot: Vec<f64>,
    b_flux_bot: Vec<f64>,
    t_bot: Vec<f64>,
    t_a: Vec<f64>,
    vpd: Vec<f64>,
    qsat_bot: Vec<f64>,
    dqsat_dt: Vec<f64>,
    sw_down: Vec<f64>,
    sw_up: Vec<f64>,
    lw_down: Vec<f64>,
    lw_up: Vec<f64>,
    rain: Vec<f64>,
}

impl Case {
    fn new(qt_val: f64) -> Self {
        let grid = AtmosphereGrid::new(4, 4, 1, 1, 1, vec![-10.0, 10.0]);
        let soil_grid = SoilGrid::equidistant(4, 2.0);
        let mut model = LandSurfaceModel::new(
            grid,
            soil_grid,
            Config {
                c_veg: 0.9,
                lai: 2.0,
                gd: 0.0,
                ..Config::default()
            },
            VanGenuchtenTable::medium_fine(),
        )
        .unwrap();
        model.init_soil_homogeneous(
            &[286.0, 286.5, 287.0, 287.5],
            &[0.35; 4],
            &[0; 4],
            &[0.1, 0.2, 0.3, 0.4],
        );
        model.init_cold_start(288.0, qt_val);

        let n2 = model.grid.ijcells;
        let n3 = n2 * 2;
        let cyclic = PeriodicCyclic::new(&model.grid);

        Self {
            u: vec![4.0; n3],
            v: vec![0.0; n3],
            u_bot: vec![0.0; n2],
            v_bot: vec![0.0; n2],
            thl: vec![288.0; n3],
            qt: vec![qt_val; n3],
            b: vec![0.0; n3],
            b_bot: vec![0.02; n2],
            b_flux_bot: vec![0.0; n2],
            t_bot: vec![290.0; n2],
            t_a: vec![288.0; n2],
            vpd: vec![300.0; n2],
            qsat_bot: vec![0.0120; n2],
            dqsat_dt: vec![7.5e-4; n2],
            sw_down: vec![600.0; n2],
            sw_up: vec![120.0; n2],
            lw_down: vec![350.0; n2],
            lw_up: vec![400.0; n2],
            rain: vec![0.0; n2],
            model,
            cyclic,
        }
    }

    fn step_surface(&mut self) {
        self.model
            .exec_stability(
                &MomentumInput {
                    u: &self.u,
                    v: &self.v,
                    u_bot: &self.u_bot,
                    v_bot: &self.v_bot,
                },
                &ScalarInput {
                    thl: &self.thl,
                    qt: &self.qt,
                },
                Some(&BuoyancyInput {
                    b: &self.b,
                    b_bot: &self.b_bot,
                    b_flux_bot: &self.b_flux_bot,
                    db_ref: 0.0,
                }),
                &self.cyclic,
            )
            .unwrap();

        self.model
            .exec_surface(
                &RadiationInput {
                    sw_down: &self.sw_down,
                    sw_up: &self.sw_up,
                    lw_down: &self.lw_down,
                    lw_up: &self.lw_up,
                },
                &SkinInput {
                    t_bot: &self.t_bot,
                    t_a: &self.t_a,
                    vpd: &self.vpd,
                    qsat_bot: &self.qsat_bot,
                    dqsat_dt: &self.dqsat_dt,
                },
                &ScalarInput {
                    thl: &self.thl,
                    qt: &self.qt,
                },
                &self.rain,
                RHO_AIR,
                SUB_DT,
            )
            .unwrap();
    }
}

#[test]
fn per_tile_energy_closure() {
    let mut case = Case::new(0.008);
    case.step_surface();

    let grid = &case.model.grid;
    let ij = grid.ij(grid.istart + 1, grid.jstart + 1);
    let t0 = case.t_bot[ij];

    for tile in [
        &case.model.tiles.veg,
        &case.model.tiles.soil,
        &case.model.tiles.wet,
    ] {
        let lw_up_lin = SIGMA_B * t0.powi(4) + 4.0 * SIGMA_B * t0.powi(3) * (tile.t_bot[ij] - t0);
        let q_net = case.sw_down[ij] - case.sw_up[ij] + case.lw_down[ij] - lw_up_lin;
        // G is positive towards the skin.
        let residual = q_net + tile.g[ij] - tile.h[ij] - tile.le[ij];
        assert!(
            residual.abs() < 1e-6,
            "tile closure residual = {}",
            residual
        );
    }
}

#[test]
fn tile_fractions_partition_unity() {
    let mut case = Case::new(0.008);
    // Give the reservoir some water so the wet tile participates.
    let wl_half = 0.5 * lsm_rs::land_surface::wl_max(0.9, 2.0);
    case.model.wl.fill(wl_half);
    case.step_surface();

    let grid = &case.model.grid;
    for j in grid.jstart..grid.jend {
        for i in grid.istart..grid.iend {
            let ij = grid.ij(i, j);
            let sum = case.model.tiles.veg.fraction[ij]
                + case.model.tiles.soil.fraction[ij]
                + case.model.tiles.wet.fraction[ij];
            assert!((sum - 1.0).abs() < 1e-12, "fraction sum = {}", sum);
            assert!(case.model.tiles.wet.fraction[ij] > 0.0);
        }
    }
}

#[test]
fn dew_fall_feeds_reservoir() {
    // Humidity above saturation: all tiles condense and the
    // reservoir tendency turns positive.
    let mut case = Case::new(0.014);
    case.step_surface();

    let grid = &case.model.grid;
    let ij = grid.ij(grid.istart, grid.jstart);

    assert!(case.model.tiles.veg.le[ij] < 0.0, "expected dew on vegetation");
    assert!(case.model.wl_tend[ij] > 0.0, "dew must fill the reservoir");
    // Dew is not interception.
    assert!(case.model.interception[ij] >= 0.0);
}

#[test]
fn surface_values_follow_tiled_fluxes() {
    let mut case = Case::new(0.008);
    case.step_surface();

    let grid = &case.model.grid;
    let ij = grid.ij(grid.istart + 1, grid.jstart);

    let mut h_mean = vec![0.0; grid.ijcells];
    let mut le_mean = vec![0.0; grid.ijcells];
    case.model.tiled_mean_h(&mut h_mean);
    case.model.tiled_mean_le(&mut le_mean);

    let ra = 1.0
        / (case.model.ustar[ij]
            * lsm_rs::surface_layer::most::fh(10.0, case.model.z0h[ij], case.model.obuk[ij]));

    let thl_expected = case.thl[grid.ijk(grid.istart + 1, grid.jstart, grid.kstart)]
        + h_mean[ij] / (RHO_AIR * CP) * ra;
    let qt_expected = case.qt[grid.ijk(grid.istart + 1, grid.jstart, grid.kstart)]
        + le_mean[ij] / (RHO_AIR * LV) * ra;

    assert!((case.model.thl_bot[ij] - thl_expected).abs() < 1e-10);
    assert!((case.model.qt_bot[ij] - qt_expected).abs() < 1e-13);

    // Daytime over moist soil: the surface is warmer and moister than
    // the first model level.
    assert!(case.model.thl_bot[ij] > 288.0);
    assert!(case.model.qt_bot[ij] > 0.008);
}
