//! Model driver: configuration, state ownership, and the per-step
//! sequence of the surface scheme.
//!
//! [`LandSurfaceModel`] owns every 2D surface field, the three tiles, and
//! the soil state, and drives the mandated order of operations:
//!
//! 1. [`LandSurfaceModel::exec_stability`]: friction velocity and
//!    Obukhov length, momentum and scalar surface closure, similarity
//!    gradients.
//! 2. [`LandSurfaceModel::exec_surface`]: aerodynamic and surface
//!    resistances, per-tile energy balance, tile fractions, liquid water
//!    skin, and the surface θ_l/q_t for the next atmospheric step.
//! 3. [`LandSurfaceModel::exec_soil`]: soil property fields and the
//!    explicit diffusion tendencies of the soil column.
//!
//! The atmosphere, thermodynamics, radiation, and microphysics stay
//! outside; their state enters through borrowed-slice input structs.

use std::path::Path;

use thiserror::Error;

use crate::boundary::BoundaryCyclic;
use crate::constants::D_SMALL;
use crate::grid::{AtmosphereGrid, SoilGrid};
use crate::io;
use crate::io::SlabError;
use crate::land_surface::{self, Tiles};
use crate::soil::{self, SoilInterpolation, VanGenuchtenTable};
use crate::surface_layer::{self, ObukhovLookup, ObukhovSolver};
use crate::types::{MomentumBc, ScalarBc, ThermoBc};

/// Configuration of the surface scheme.
///
/// Scalar land-surface properties apply in homogeneous mode; in
/// heterogeneous mode the corresponding 2D fields are read from slabs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Horizontally constant roughness; enables the lookup Obukhov solver.
    pub sw_constant_z0: bool,
    /// Momentum roughness length (m), when constant.
    pub z0m: f64,
    /// Scalar roughness length (m), when constant.
    pub z0h: f64,
    /// Horizontally homogeneous land surface.
    pub sw_homogeneous: bool,
    /// Free drainage at the soil bottom (else closed).
    pub sw_free_drainage: bool,
    /// Open-water cells present (heterogeneous only).
    pub sw_water: bool,
    /// Fixed water skin temperature (K), when `sw_water` is set.
    pub tskin_water: f64,
    /// Canopy VPD response coefficient gD (Pa⁻¹).
    pub gd: f64,
    /// Vegetation cover fraction (-).
    pub c_veg: f64,
    /// Leaf area index (-).
    pub lai: f64,
    /// Minimum canopy resistance (s m⁻¹).
    pub rs_veg_min: f64,
    /// Minimum soil resistance (s m⁻¹).
    pub rs_soil_min: f64,
    /// Skin conductivity under stable stratification (W m⁻² K⁻¹).
    pub lambda_stable: f64,
    /// Skin conductivity under unstable stratification (W m⁻² K⁻¹).
    pub lambda_unstable: f64,
    /// Heat capacity of the vegetation skin layer (J m⁻² K⁻¹).
    pub cs_veg: f64,
    /// Bottom boundary condition for momentum.
    pub mbcbot: MomentumBc,
    /// Bottom boundary condition for the stability solver.
    pub thermobc: ThermoBc,
    /// Bottom boundary condition for the transported scalars.
    pub sbcbot: ScalarBc,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sw_constant_z0: true,
            z0m: 0.1,
            z0h: 0.01,
            sw_homogeneous: true,
            sw_free_drainage: true,
            sw_water: false,
            tskin_water: 283.15,
            gd: 0.0,
            c_veg: 0.95,
            lai: 2.6,
            rs_veg_min: 100.0,
            rs_soil_min: 50.0,
            lambda_stable: 10.0,
            lambda_unstable: 10.0,
            cs_veg: 0.0,
            mbcbot: MomentumBc::Dirichlet,
            thermobc: ThermoBc::Dirichlet,
            sbcbot: ScalarBc::Dirichlet,
        }
    }
}

/// Error type for configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Water cells need per-cell masks, which homogeneous mode lacks.
    #[error("homogeneous land surface with water cells is not supported")]
    HomogeneousWater,

    /// The land surface closes the scalar boundary through Dirichlet
    /// values; other combinations have no consistent closure.
    #[error("land surface requires {0}")]
    UnsupportedBc(&'static str),
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sw_homogeneous && self.sw_water {
            return Err(ConfigError::HomogeneousWater);
        }
        if self.mbcbot != MomentumBc::Dirichlet {
            return Err(ConfigError::UnsupportedBc("mbcbot=dirichlet (no-slip)"));
        }
        if self.thermobc != ThermoBc::Dirichlet {
            return Err(ConfigError::UnsupportedBc("thermobc=dirichlet"));
        }
        if self.sbcbot != ScalarBc::Dirichlet {
            return Err(ConfigError::UnsupportedBc("sbcbot=dirichlet"));
        }
        Ok(())
    }
}

/// Error type for the model driver.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid configuration.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// Checkpoint I/O failure.
    #[error("{0}")]
    Slab(#[from] SlabError),

    /// Non-finite value in an input or prognostic field.
    #[error("non-finite value in '{field}' at cell ({i}, {j})")]
    DomainViolation {
        /// Field name.
        field: &'static str,
        /// Interior i index.
        i: usize,
        /// Interior j index.
        j: usize,
    },
}

/// Per-step solver statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolverStats {
    /// Obukhov iterations that fell back to the bracket midpoint in the
    /// last stability solve.
    pub obukhov_non_converged: usize,
    /// Running total of non-converged Obukhov solves.
    pub obukhov_non_converged_total: usize,
    /// Soil cells clamped at the residual water content in the last
    /// integration.
    pub theta_clamped: usize,
    /// Running total of clamped soil cells.
    pub theta_clamped_total: usize,
}

/// Atmospheric wind at the lowest level plus the surface velocities.
pub struct MomentumInput<'a> {
    /// u velocity, 3D layout, at least `kstart + 1` planes.
    pub u: &'a [f64],
    /// v velocity, 3D layout.
    pub v: &'a [f64],
    /// Surface u velocity, 2D.
    pub u_bot: &'a [f64],
    /// Surface v velocity, 2D.
    pub v_bot: &'a [f64],
}

/// Lowest-level values of the transported scalars.
pub struct ScalarInput<'a> {
    /// Liquid water potential temperature, 3D layout.
    pub thl: &'a [f64],
    /// Total humidity, 3D layout.
    pub qt: &'a [f64],
}

/// Buoyancy state from the thermodynamics.
pub struct BuoyancyInput<'a> {
    /// Buoyancy, 3D layout.
    pub b: &'a [f64],
    /// Surface buoyancy, 2D.
    pub b_bot: &'a [f64],
    /// Surface buoyancy flux, 2D.
    pub b_flux_bot: &'a [f64],
    /// Reference buoyancy offset between the surface and the first level.
    pub db_ref: f64,
}

/// Surface radiation slabs.
pub struct RadiationInput<'a> {
    /// Downwelling shortwave (W m⁻²).
    pub sw_down: &'a [f64],
    /// Upwelling shortwave (W m⁻²).
    pub sw_up: &'a [f64],
    /// Downwelling longwave (W m⁻²).
    pub lw_down: &'a [f64],
    /// Upwelling longwave (W m⁻²).
    pub lw_up: &'a [f64],
}

/// Skin-level thermodynamic state from the previous step.
pub struct SkinInput<'a> {
    /// Previous skin temperature (K), the SEB linearisation point.
    pub t_bot: &'a [f64],
    /// Air temperature at the lowest level (K).
    pub t_a: &'a [f64],
    /// Vapour pressure deficit (Pa).
    pub vpd: &'a [f64],
    /// Saturated humidity at the previous skin temperature.
    pub qsat_bot: &'a [f64],
    /// Slope dq_sat/dT at the previous skin temperature.
    pub dqsat_dt: &'a [f64],
}

/// The surface boundary and land-surface model.
pub struct LandSurfaceModel {
    /// Horizontal grid.
    pub grid: AtmosphereGrid,
    /// Soil grid.
    pub soil_grid: SoilGrid,
    /// Configuration.
    pub config: Config,
    /// Van Genuchten parameter table.
    pub table: VanGenuchtenTable,

    // Surface layer.
    /// Friction velocity (m s⁻¹).
    pub ustar: Vec<f64>,
    /// Obukhov length (m).
    pub obuk: Vec<f64>,
    /// Per-cell lookup bracket hint.
    pub nobuk: Vec<usize>,
    /// Momentum roughness length (m).
    pub z0m: Vec<f64>,
    /// Scalar roughness length (m).
    pub z0h: Vec<f64>,
    /// Similarity wind gradient du/dz at the lowest level.
    pub dudz_mo: Vec<f64>,
    /// Similarity wind gradient dv/dz at the lowest level.
    pub dvdz_mo: Vec<f64>,
    /// Similarity buoyancy gradient at the lowest level.
    pub dbdz_mo: Vec<f64>,
    /// Total wind difference with the surface (m s⁻¹).
    pub dutot: Vec<f64>,
    /// Aerodynamic resistance (s m⁻¹).
    pub ra: Vec<f64>,

    // Momentum and scalar closure.
    /// Surface u momentum flux.
    pub u_fluxbot: Vec<f64>,
    /// Surface v momentum flux.
    pub v_fluxbot: Vec<f64>,
    /// Surface u gradient.
    pub u_gradbot: Vec<f64>,
    /// Surface v gradient.
    pub v_gradbot: Vec<f64>,
    /// Surface θ_l value handed to the atmosphere.
    pub thl_bot: Vec<f64>,
    /// Surface q_t value handed to the atmosphere.
    pub qt_bot: Vec<f64>,
    /// Kinematic surface θ_l flux.
    pub thl_fluxbot: Vec<f64>,
    /// Kinematic surface q_t flux.
    pub qt_fluxbot: Vec<f64>,
    /// Surface θ_l gradient.
    pub thl_gradbot: Vec<f64>,
    /// Surface q_t gradient.
    pub qt_gradbot: Vec<f64>,

    // Land surface.
    /// The three surface tiles.
    pub tiles: Tiles,
    /// Liquid water reservoir (m).
    pub wl: Vec<f64>,
    /// Reservoir tendency (m s⁻¹).
    pub wl_tend: Vec<f64>,
    /// Interception diagnostic (m s⁻¹).
    pub interception: Vec<f64>,
    /// Throughfall diagnostic (m s⁻¹, negative downwards).
    pub throughfall: Vec<f64>,
    /// Infiltration diagnostic (m s⁻¹, positive downwards).
    pub infiltration: Vec<f64>,
    /// Saturation-excess runoff diagnostic (m s⁻¹).
    pub runoff: Vec<f64>,
    /// Canopy VPD response coefficient.
    pub gd_coeff: Vec<f64>,
    /// Vegetation fraction.
    pub c_veg: Vec<f64>,
    /// Leaf area index.
    pub lai: Vec<f64>,
    /// Minimum canopy resistance.
    pub rs_veg_min: Vec<f64>,
    /// Minimum soil resistance.
    pub rs_soil_min: Vec<f64>,
    /// Stable skin conductivity.
    pub lambda_stable: Vec<f64>,
    /// Unstable skin conductivity.
    pub lambda_unstable: Vec<f64>,
    /// Vegetation skin heat capacity.
    pub cs_veg: Vec<f64>,
    /// Open-water mask (1 = water).
    pub water_mask: Vec<u8>,

    // Soil state.
    /// Soil temperature (K), prognostic.
    pub t_soil: Vec<f64>,
    /// Soil water content (m³ m⁻³), prognostic.
    pub theta_soil: Vec<f64>,
    /// Soil temperature tendency.
    pub t_soil_tend: Vec<f64>,
    /// Soil moisture tendency.
    pub theta_soil_tend: Vec<f64>,
    /// Soil type index per cell.
    pub soil_index: Vec<usize>,
    /// Root fraction per cell.
    pub root_fraction: Vec<f64>,

    solver: ObukhovSolver,
    stats: SolverStats,

    // Working fields.
    diffusivity: Vec<f64>,
    diffusivity_h: Vec<f64>,
    conductivity: Vec<f64>,
    conductivity_h: Vec<f64>,
    source: Vec<f64>,
    lambda: Vec<f64>,
    theta_mean_n: Vec<f64>,
    f1: Vec<f64>,
    f2: Vec<f64>,
    f2b: Vec<f64>,
    f3: Vec<f64>,
    flux_top: Vec<f64>,
    flux_bot: Vec<f64>,
    tmp2d: Vec<f64>,
    tmp2d_b: Vec<f64>,
}

impl LandSurfaceModel {
    /// Create the model, validating the configuration and preparing the
    /// Obukhov solver.
    pub fn new(
        grid: AtmosphereGrid,
        soil_grid: SoilGrid,
        config: Config,
        table: VanGenuchtenTable,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let ij = grid.ijcells;
        let nc = soil_grid.ncells(ij);
        let nch = soil_grid.ncells_h(ij);

        let solver = if config.sw_constant_z0 {
            ObukhovSolver::Lookup(ObukhovLookup::new(
                grid.zsl(),
                config.z0m,
                config.z0h,
                config.thermobc,
            ))
        } else {
            ObukhovSolver::Iterative
        };

        let mut model = Self {
            ustar: vec![D_SMALL; ij],
            obuk: vec![D_SMALL; ij],
            nobuk: vec![0; ij],
            z0m: vec![config.z0m; ij],
            z0h: vec![config.z0h; ij],
            dudz_mo: vec![0.0; ij],
            dvdz_mo: vec![0.0; ij],
            dbdz_mo: vec![0.0; ij],
            dutot: vec![0.0; ij],
            ra: vec![0.0; ij],
            u_fluxbot: vec![0.0; ij],
            v_fluxbot: vec![0.0; ij],
            u_gradbot: vec![0.0; ij],
            v_gradbot: vec![0.0; ij],
            thl_bot: vec![0.0; ij],
            qt_bot: vec![0.0; ij],
            thl_fluxbot: vec![0.0; ij],
            qt_fluxbot: vec![0.0; ij],
            thl_gradbot: vec![0.0; ij],
            qt_gradbot: vec![0.0; ij],
            tiles: Tiles::new(ij),
            wl: vec![0.0; ij],
            wl_tend: vec![0.0; ij],
            interception: vec![0.0; ij],
            throughfall: vec![0.0; ij],
            infiltration: vec![0.0; ij],
            runoff: vec![0.0; ij],
            gd_coeff: vec![config.gd; ij],
            c_veg: vec![config.c_veg; ij],
            lai: vec![config.lai; ij],
            rs_veg_min: vec![config.rs_veg_min; ij],
            rs_soil_min: vec![config.rs_soil_min; ij],
            lambda_stable: vec![config.lambda_stable; ij],
            lambda_unstable: vec![config.lambda_unstable; ij],
            cs_veg: vec![config.cs_veg; ij],
            water_mask: vec![0; ij],
            t_soil: vec![0.0; nc],
            theta_soil: vec![0.0; nc],
            t_soil_tend: vec![0.0; nc],
            theta_soil_tend: vec![0.0; nc],
            soil_index: vec![0; nc],
            root_fraction: vec![0.0; nc],
            solver,
            stats: SolverStats::default(),
            diffusivity: vec![0.0; nc],
            diffusivity_h: vec![0.0; nch],
            conductivity: vec![0.0; nc],
            conductivity_h: vec![0.0; nch],
            source: vec![0.0; nc],
            lambda: vec![0.0; ij],
            theta_mean_n: vec![0.0; ij],
            f1: vec![0.0; ij],
            f2: vec![0.0; ij],
            f2b: vec![0.0; ij],
            f3: vec![0.0; ij],
            flux_top: vec![0.0; ij],
            flux_bot: vec![0.0; ij],
            tmp2d: vec![0.0; ij],
            tmp2d_b: vec![0.0; ij],
            grid,
            soil_grid,
            config,
            table,
        };

        // The wet tile never has a surface resistance.
        model.tiles.wet.rs.fill(0.0);

        Ok(model)
    }

    /// Initialise the soil column from homogeneous profiles, ordered
    /// bottom (deepest) to top.
    pub fn init_soil_homogeneous(
        &mut self,
        t_prof: &[f64],
        theta_prof: &[f64],
        index_prof: &[usize],
        root_prof: &[f64],
    ) {
        soil::init_soil_homogeneous(&mut self.t_soil, t_prof, &self.grid, &self.soil_grid);
        soil::init_soil_homogeneous(&mut self.theta_soil, theta_prof, &self.grid, &self.soil_grid);
        soil::init_soil_homogeneous(&mut self.soil_index, index_prof, &self.grid, &self.soil_grid);
        soil::init_soil_homogeneous(&mut self.root_fraction, root_prof, &self.grid, &self.soil_grid);
    }

    /// Cold-start initialisation of the skin state from the lowest
    /// atmospheric values.
    pub fn init_cold_start(&mut self, thl_1: f64, qt_1: f64) {
        self.wl.fill(0.0);
        self.thl_bot.fill(thl_1);
        self.qt_bot.fill(qt_1);
        self.thl_fluxbot.fill(D_SMALL);
        self.qt_fluxbot.fill(D_SMALL);

        for (_, tile) in self.tiles.iter_mut() {
            tile.thl_bot.fill(thl_1);
            tile.qt_bot.fill(qt_1);
            tile.t_bot.fill(thl_1);
        }
    }

    /// Solver statistics of the last step.
    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    /// Surface-layer stability, momentum closure, scalar closure, and the
    /// similarity gradients.
    ///
    /// Pass `buoyancy: None` when thermodynamics are disabled; the layer
    /// is then neutral everywhere.
    pub fn exec_stability(
        &mut self,
        momentum: &MomentumInput,
        scalars: &ScalarInput,
        buoyancy: Option<&BuoyancyInput>,
        cyclic: &dyn BoundaryCyclic,
    ) -> Result<(), ModelError> {
        self.check_level("u", momentum.u)?;
        self.check_level("v", momentum.v)?;
        if let Some(buoy) = buoyancy {
            self.check_level("b", buoy.b)?;
            self.check_plane("b_flux_bot", buoy.b_flux_bot)?;
        }

        surface_layer::calc_dutot(
            &mut self.dutot,
            momentum.u,
            momentum.v,
            momentum.u_bot,
            momentum.v_bot,
            &self.grid,
            cyclic,
        );

        match buoyancy {
            Some(buoy) => {
                let non_converged = surface_layer::stability(
                    &mut self.ustar,
                    &mut self.obuk,
                    &mut self.nobuk,
                    &self.dutot,
                    buoy.b,
                    buoy.b_bot,
                    buoy.b_flux_bot,
                    &self.z0m,
                    &self.z0h,
                    buoy.db_ref,
                    &self.grid,
                    self.config.mbcbot,
                    self.config.thermobc,
                    &self.solver,
                );
                self.stats.obukhov_non_converged = non_converged;
                self.stats.obukhov_non_converged_total += non_converged;
                if non_converged > 0 {
                    eprintln!(
                        "Warning: Obukhov solver did not converge in {} cells, \
                         keeping bracket midpoints",
                        non_converged
                    );
                }
            }
            None => {
                surface_layer::stability_neutral(
                    &mut self.ustar,
                    &mut self.obuk,
                    &self.dutot,
                    &self.z0m,
                    &self.grid,
                    self.config.mbcbot,
                );
            }
        }

        surface_layer::surfm(
            &mut self.u_fluxbot,
            &mut self.v_fluxbot,
            &mut self.u_gradbot,
            &mut self.v_gradbot,
            &self.ustar,
            &self.obuk,
            momentum.u,
            momentum.u_bot,
            momentum.v,
            momentum.v_bot,
            &self.z0m,
            &self.grid,
            self.config.mbcbot,
            cyclic,
        );

        surface_layer::calc_duvdz(
            &mut self.dudz_mo,
            &mut self.dvdz_mo,
            momentum.u,
            momentum.v,
            momentum.u_bot,
            momentum.v_bot,
            &self.ustar,
            &self.obuk,
            &self.z0m,
            &self.grid,
        );

        surface_layer::surfs(
            &mut self.thl_bot,
            &mut self.thl_gradbot,
            &mut self.thl_fluxbot,
            &self.ustar,
            &self.obuk,
            scalars.thl,
            &self.z0h,
            &self.grid,
            self.config.sbcbot,
        );
        surface_layer::surfs(
            &mut self.qt_bot,
            &mut self.qt_gradbot,
            &mut self.qt_fluxbot,
            &self.ustar,
            &self.obuk,
            scalars.qt,
            &self.z0h,
            &self.grid,
            self.config.sbcbot,
        );

        if let Some(buoy) = buoyancy {
            surface_layer::calc_dbdz(
                &mut self.dbdz_mo,
                buoy.b_flux_bot,
                &self.ustar,
                &self.obuk,
                &self.grid,
            );
        }

        Ok(())
    }

    /// Resistances, tile energy balances, tile fractions, the liquid
    /// water skin, and the surface scalar values for the atmosphere.
    ///
    /// `rain_rate` is the surface precipitation rate in m s⁻¹, positive
    /// downwards; `rho_air` the air density at the surface half level;
    /// `sub_dt` the sub-step over which the reservoir tendency is limited.
    pub fn exec_surface(
        &mut self,
        radiation: &RadiationInput,
        skin: &SkinInput,
        scalars: &ScalarInput,
        rain_rate: &[f64],
        rho_air: f64,
        sub_dt: f64,
    ) -> Result<(), ModelError> {
        self.check_plane("sw_down", radiation.sw_down)?;
        self.check_plane("sw_up", radiation.sw_up)?;
        self.check_plane("lw_down", radiation.lw_down)?;
        self.check_plane("lw_up", radiation.lw_up)?;
        self.check_plane("t_bot", skin.t_bot)?;
        self.check_plane("rain_rate", rain_rate)?;

        surface_layer::calc_ra(&mut self.ra, &self.ustar, &self.obuk, &self.z0h, &self.grid);

        land_surface::calc_root_weighted_mean_theta(
            &mut self.theta_mean_n,
            &self.theta_soil,
            &self.soil_index,
            &self.root_fraction,
            &self.table,
            &self.grid,
            &self.soil_grid,
        );

        land_surface::calc_resistance_functions(
            &mut self.f1,
            &mut self.f2,
            &mut self.f2b,
            &mut self.f3,
            radiation.sw_down,
            &self.theta_soil,
            &self.theta_mean_n,
            skin.vpd,
            &self.gd_coeff,
            &self.c_veg,
            &self.soil_index,
            &self.table,
            &self.grid,
            &self.soil_grid,
        );

        land_surface::calc_canopy_resistance(
            &mut self.tiles.veg.rs,
            &self.rs_veg_min,
            &self.lai,
            &self.f1,
            &self.f2,
            &self.f3,
            &self.grid,
        );
        land_surface::calc_soil_resistance(
            &mut self.tiles.soil.rs,
            &self.rs_soil_min,
            &self.f2b,
            &self.grid,
        );

        land_surface::choose_skin_conductivity(
            &mut self.lambda,
            &self.lambda_stable,
            &self.lambda_unstable,
            &self.obuk,
            &self.grid,
        );

        // Per-tile energy balance.
        let Tiles { veg, soil, wet } = &mut self.tiles;
        for tile in [veg, soil, wet] {
            land_surface::calc_fluxes(
                &mut tile.h,
                &mut tile.le,
                &mut tile.g,
                &mut tile.t_bot,
                skin.t_a,
                scalars.qt,
                &self.t_soil,
                skin.t_bot,
                skin.qsat_bot,
                skin.dqsat_dt,
                &self.ra,
                &tile.rs,
                &self.lambda,
                radiation.sw_down,
                radiation.sw_up,
                radiation.lw_down,
                radiation.lw_up,
                rho_air,
                &self.grid,
                &self.soil_grid,
            );
        }

        land_surface::calc_tile_fractions(
            &mut self.tiles.veg.fraction,
            &mut self.tiles.soil.fraction,
            &mut self.tiles.wet.fraction,
            &self.wl,
            &self.c_veg,
            &self.lai,
            &self.grid,
        );

        if self.config.sw_water {
            land_surface::calc_fluxes_water(
                &mut self.tiles.wet.h,
                &mut self.tiles.wet.le,
                &mut self.tiles.wet.g,
                &mut self.tiles.wet.t_bot,
                &self.water_mask,
                skin.t_a,
                scalars.qt,
                skin.t_bot,
                skin.qsat_bot,
                skin.dqsat_dt,
                &self.ra,
                self.config.tskin_water,
                rho_air,
                &self.grid,
            );

            // Water columns are all wet skin.
            for j in self.grid.jstart..self.grid.jend {
                for i in self.grid.istart..self.grid.iend {
                    let ij = self.grid.ij(i, j);
                    if self.water_mask[ij] == 1 {
                        self.tiles.wet.fraction[ij] = 1.0;
                        self.tiles.veg.fraction[ij] = 0.0;
                        self.tiles.soil.fraction[ij] = 0.0;
                    }
                }
            }
        }

        self.wl_tend.fill(0.0);
        land_surface::calc_liquid_water_reservoir(
            &mut self.wl_tend,
            &mut self.interception,
            &mut self.throughfall,
            &self.wl,
            &self.tiles.veg.le,
            &self.tiles.soil.le,
            &self.tiles.wet.le,
            &self.tiles.veg.fraction,
            &self.tiles.soil.fraction,
            &self.tiles.wet.fraction,
            rain_rate,
            &self.c_veg,
            &self.lai,
            sub_dt,
            &self.grid,
        );

        if self.config.sw_water {
            // No reservoir on open water.
            for j in self.grid.jstart..self.grid.jend {
                for i in self.grid.istart..self.grid.iend {
                    let ij = self.grid.ij(i, j);
                    if self.water_mask[ij] == 1 {
                        self.wl_tend[ij] = 0.0;
                        self.interception[ij] = 0.0;
                        self.throughfall[ij] = 0.0;
                    }
                }
            }
        }

        land_surface::diagnose_infiltration(&mut self.infiltration, &self.throughfall, &self.grid);

        for (_, tile) in self.tiles.iter_mut() {
            land_surface::calc_tile_bcs(tile, scalars.thl, scalars.qt, &self.ra, rho_air, &self.grid);
        }

        land_surface::calc_bcs(
            &mut self.thl_bot,
            &mut self.qt_bot,
            scalars.thl,
            scalars.qt,
            &self.tiles.veg,
            &self.tiles.soil,
            &self.tiles.wet,
            &self.ra,
            rho_air,
            &self.grid,
        );

        Ok(())
    }

    /// Soil property fields and the explicit diffusion tendencies.
    pub fn exec_soil(&mut self) -> Result<(), ModelError> {
        self.check_soil("t_soil", &self.t_soil)?;
        self.check_soil("theta_soil", &self.theta_soil)?;

        self.t_soil_tend.fill(0.0);
        self.theta_soil_tend.fill(0.0);

        // Temperature: thermal properties, mean interpolation, tiled G at
        // the top, closed bottom.
        soil::calc_thermal_properties(
            &mut self.diffusivity,
            &mut self.conductivity,
            &self.soil_index,
            &self.theta_soil,
            &self.table,
            &self.grid,
            &self.soil_grid,
        );
        soil::interp_to_half_levels(
            &mut self.diffusivity_h,
            &self.diffusivity,
            SoilInterpolation::Mean,
            &self.grid,
            &self.soil_grid,
        );

        land_surface::calc_tiled_mean(
            &mut self.tmp2d,
            &self.tiles.veg.g,
            &self.tiles.soil.g,
            &self.tiles.wet.g,
            &self.tiles.veg.fraction,
            &self.tiles.soil.fraction,
            &self.tiles.wet.fraction,
            &self.grid,
        );
        soil::set_bcs_temperature(
            &mut self.flux_top,
            &mut self.flux_bot,
            &self.tmp2d,
            &self.soil_index,
            &self.table,
            &self.grid,
            &self.soil_grid,
        );
        soil::diff_explicit(
            &mut self.t_soil_tend,
            &self.t_soil,
            &self.diffusivity_h,
            &self.conductivity_h,
            &self.source,
            &self.flux_top,
            &self.flux_bot,
            false,
            false,
            &self.grid,
            &self.soil_grid,
        );

        // Moisture: hydraulic properties, max interpolation, evaporation
        // plus throughfall at the top, free or closed drainage below.
        soil::calc_hydraulic_properties(
            &mut self.diffusivity,
            &mut self.conductivity,
            &self.soil_index,
            &self.theta_soil,
            &self.table,
            &self.grid,
            &self.soil_grid,
        );
        soil::interp_to_half_levels(
            &mut self.diffusivity_h,
            &self.diffusivity,
            SoilInterpolation::Max,
            &self.grid,
            &self.soil_grid,
        );
        soil::interp_to_half_levels(
            &mut self.conductivity_h,
            &self.conductivity,
            SoilInterpolation::Max,
            &self.grid,
            &self.soil_grid,
        );

        soil::set_bcs_moisture(
            &mut self.flux_top,
            &mut self.flux_bot,
            &mut self.conductivity_h,
            &self.tiles.soil.le,
            &self.tiles.soil.fraction,
            &self.throughfall,
            self.config.sw_free_drainage,
            &self.grid,
            &self.soil_grid,
        );

        land_surface::scale_tile_with_fraction(
            &mut self.tmp2d,
            &self.tiles.veg.le,
            &self.tiles.veg.fraction,
            &self.grid,
        );
        soil::calc_root_water_extraction(
            &mut self.source,
            &mut self.tmp2d_b,
            &self.theta_soil,
            &self.root_fraction,
            &self.tmp2d,
            &self.grid,
            &self.soil_grid,
        );

        soil::diff_explicit(
            &mut self.theta_soil_tend,
            &self.theta_soil,
            &self.diffusivity_h,
            &self.conductivity_h,
            &self.source,
            &self.flux_top,
            &self.flux_bot,
            true,
            true,
            &self.grid,
            &self.soil_grid,
        );

        Ok(())
    }

    /// Explicit-Euler update of the prognostic state over `dt` seconds.
    ///
    /// Clamps the soil moisture into `(θ_res, θ_sat]` (counting and
    /// warning on dry-side clamps, diagnosing saturation excess as
    /// runoff) and the reservoir into `[0, w_l,max]`.
    pub fn advance(&mut self, dt: f64) -> Result<(), ModelError> {
        let grid = &self.grid;
        let sgrid = &self.soil_grid;

        // Liquid water reservoir.
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                let ij = grid.ij(i, j);
                let wlm = land_surface::wl_max(self.c_veg[ij], self.lai[ij]);
                self.wl[ij] = (self.wl[ij] + dt * self.wl_tend[ij]).clamp(0.0, wlm);
                self.wl_tend[ij] = 0.0;
            }
        }

        // Soil temperature.
        for k in sgrid.kstart..sgrid.kend {
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    let ijk = grid.ijk(i, j, k);
                    self.t_soil[ijk] += dt * self.t_soil_tend[ijk];
                    self.t_soil_tend[ijk] = 0.0;
                }
            }
        }

        // Soil moisture, with the residual clamp and the saturation
        // excess collected as runoff.
        let mut clamped = 0;
        for j in grid.jstart..grid.jend {
            for i in grid.istart..grid.iend {
                self.runoff[grid.ij(i, j)] = 0.0;
            }
        }
        for k in sgrid.kstart..sgrid.kend {
            let dz = sgrid.dz[k - sgrid.kstart];
            for j in grid.jstart..grid.jend {
                for i in grid.istart..grid.iend {
                    let ij = grid.ij(i, j);
                    let ijk = grid.ijk(i, j, k);
                    let si = self.soil_index[ijk];

                    let mut theta = self.theta_soil[ijk] + dt * self.theta_soil_tend[ijk];
                    if theta < self.table.theta_res[si] {
                        theta = self.table.theta_res[si];
                        clamped += 1;
                    } else if theta > self.table.theta_sat[si] {
                        self.runoff[ij] += (theta - self.table.theta_sat[si]) * dz / dt;
                        theta = self.table.theta_sat[si];
                    }
                    self.theta_soil[ijk] = theta;
                    self.theta_soil_tend[ijk] = 0.0;
                }
            }
        }

        self.stats.theta_clamped = clamped;
        self.stats.theta_clamped_total += clamped;
        if clamped > 0 {
            eprintln!(
                "Warning: soil moisture clamped at residual content in {} cells",
                clamped
            );
        }

        self.check_soil("t_soil", &self.t_soil)?;
        self.check_soil("theta_soil", &self.theta_soil)?;
        Ok(())
    }

    /// Fraction-weighted mean sensible heat flux.
    pub fn tiled_mean_h(&self, out: &mut [f64]) {
        land_surface::calc_tiled_mean(
            out,
            &self.tiles.veg.h,
            &self.tiles.soil.h,
            &self.tiles.wet.h,
            &self.tiles.veg.fraction,
            &self.tiles.soil.fraction,
            &self.tiles.wet.fraction,
            &self.grid,
        );
    }

    /// Fraction-weighted mean latent heat flux.
    pub fn tiled_mean_le(&self, out: &mut [f64]) {
        land_surface::calc_tiled_mean(
            out,
            &self.tiles.veg.le,
            &self.tiles.soil.le,
            &self.tiles.wet.le,
            &self.tiles.veg.fraction,
            &self.tiles.soil.fraction,
            &self.tiles.wet.fraction,
            &self.grid,
        );
    }

    /// Fraction-weighted mean ground heat flux.
    pub fn tiled_mean_g(&self, out: &mut [f64]) {
        land_surface::calc_tiled_mean(
            out,
            &self.tiles.veg.g,
            &self.tiles.soil.g,
            &self.tiles.wet.g,
            &self.tiles.veg.fraction,
            &self.tiles.soil.fraction,
            &self.tiles.wet.fraction,
            &self.grid,
        );
    }

    /// Save the checkpoint slab set for time index `itime`.
    pub fn save(&self, dir: &Path, itime: u64) -> Result<(), SlabError> {
        let save_2d = |field: &[f64], name: &str| {
            io::save_2d_slice(field, &io::slab_path(dir, name, itime), &self.grid)
        };

        save_2d(&self.dudz_mo, "dudz_mo")?;
        save_2d(&self.dvdz_mo, "dvdz_mo")?;
        save_2d(&self.dbdz_mo, "dbdz_mo")?;

        if !self.config.sw_constant_z0 {
            save_2d(&self.obuk, "obuk")?;
        }

        save_2d(&self.wl, "wl_skin")?;
        save_2d(&self.thl_bot, "thl_bot")?;
        save_2d(&self.qt_bot, "qt_bot")?;

        save_2d(&self.tiles.veg.thl_bot, "thl_bot_veg")?;
        save_2d(&self.tiles.soil.thl_bot, "thl_bot_soil")?;
        save_2d(&self.tiles.wet.thl_bot, "thl_bot_wet")?;
        save_2d(&self.tiles.veg.qt_bot, "qt_bot_veg")?;
        save_2d(&self.tiles.soil.qt_bot, "qt_bot_soil")?;
        save_2d(&self.tiles.wet.qt_bot, "qt_bot_wet")?;

        io::save_3d_field(
            &self.t_soil,
            &io::slab_path(dir, "t_soil", itime),
            &self.grid,
            &self.soil_grid,
        )?;
        io::save_3d_field(
            &self.theta_soil,
            &io::slab_path(dir, "theta_soil", itime),
            &self.grid,
            &self.soil_grid,
        )?;

        Ok(())
    }

    /// Load the checkpoint slab set for time index `itime`.
    pub fn load(
        &mut self,
        dir: &Path,
        itime: u64,
        cyclic: &dyn BoundaryCyclic,
    ) -> Result<(), SlabError> {
        let grid = self.grid.clone();
        let load_2d = |field: &mut [f64], name: &str, time: u64| -> Result<(), SlabError> {
            io::load_2d_slice(field, &io::slab_path(dir, name, time), &grid)?;
            cyclic.exec_2d(field);
            Ok(())
        };

        load_2d(&mut self.dudz_mo, "dudz_mo", itime)?;
        load_2d(&mut self.dvdz_mo, "dvdz_mo", itime)?;
        load_2d(&mut self.dbdz_mo, "dbdz_mo", itime)?;

        if !self.config.sw_constant_z0 {
            load_2d(&mut self.obuk, "obuk", itime)?;
            load_2d(&mut self.z0m, "z0m", 0)?;
            load_2d(&mut self.z0h, "z0h", 0)?;
        }

        load_2d(&mut self.wl, "wl_skin", itime)?;
        load_2d(&mut self.thl_bot, "thl_bot", itime)?;
        load_2d(&mut self.qt_bot, "qt_bot", itime)?;

        load_2d(&mut self.tiles.veg.thl_bot, "thl_bot_veg", itime)?;
        load_2d(&mut self.tiles.soil.thl_bot, "thl_bot_soil", itime)?;
        load_2d(&mut self.tiles.wet.thl_bot, "thl_bot_wet", itime)?;
        load_2d(&mut self.tiles.veg.qt_bot, "qt_bot_veg", itime)?;
        load_2d(&mut self.tiles.soil.qt_bot, "qt_bot_soil", itime)?;
        load_2d(&mut self.tiles.wet.qt_bot, "qt_bot_wet", itime)?;

        io::load_3d_field(
            &mut self.t_soil,
            &io::slab_path(dir, "t_soil", itime),
            &self.grid,
            &self.soil_grid,
        )?;
        io::load_3d_field(
            &mut self.theta_soil,
            &io::slab_path(dir, "theta_soil", itime),
            &self.grid,
            &self.soil_grid,
        )?;

        Ok(())
    }

    /// Load the static heterogeneous surface description (time index 0).
    pub fn load_heterogeneous(
        &mut self,
        dir: &Path,
        cyclic: &dyn BoundaryCyclic,
    ) -> Result<(), SlabError> {
        let grid = self.grid.clone();
        let load_2d = |field: &mut [f64], name: &str| -> Result<(), SlabError> {
            io::load_2d_slice(field, &io::slab_path(dir, name, 0), &grid)?;
            cyclic.exec_2d(field);
            Ok(())
        };

        load_2d(&mut self.gd_coeff, "gD")?;
        load_2d(&mut self.c_veg, "c_veg")?;
        load_2d(&mut self.lai, "lai")?;
        load_2d(&mut self.rs_veg_min, "rs_veg_min")?;
        load_2d(&mut self.rs_soil_min, "rs_soil_min")?;
        load_2d(&mut self.lambda_stable, "lambda_stable")?;
        load_2d(&mut self.lambda_unstable, "lambda_unstable")?;
        load_2d(&mut self.cs_veg, "cs_veg")?;

        // Soil index and water mask are stored as floats on disk.
        let mut tmp3d = vec![0.0; self.soil_grid.ncells(self.grid.ijcells)];
        io::load_3d_field(
            &mut tmp3d,
            &io::slab_path(dir, "index_soil", 0),
            &self.grid,
            &self.soil_grid,
        )?;
        for (index, value) in self.soil_index.iter_mut().zip(tmp3d.iter()) {
            *index = value.round() as usize;
        }

        io::load_3d_field(
            &mut self.root_fraction,
            &io::slab_path(dir, "root_frac", 0),
            &self.grid,
            &self.soil_grid,
        )?;

        if self.config.sw_water {
            let mut tmp2d = vec![0.0; self.grid.ijcells];
            io::load_2d_slice(&mut tmp2d, &io::slab_path(dir, "water_mask", 0), &self.grid)?;
            cyclic.exec_2d(&mut tmp2d);
            for (mask, value) in self.water_mask.iter_mut().zip(tmp2d.iter()) {
                *mask = if *value > 0.5 { 1 } else { 0 };
            }
        }

        Ok(())
    }

    fn check_plane(&self, field: &'static str, data: &[f64]) -> Result<(), ModelError> {
        for j in self.grid.jstart..self.grid.jend {
            for i in self.grid.istart..self.grid.iend {
                if !data[self.grid.ij(i, j)].is_finite() {
                    return Err(ModelError::DomainViolation { field, i, j });
                }
            }
        }
        Ok(())
    }

    fn check_level(&self, field: &'static str, data: &[f64]) -> Result<(), ModelError> {
        let kstart = self.grid.kstart;
        for j in self.grid.jstart..self.grid.jend {
            for i in self.grid.istart..self.grid.iend {
                if !data[self.grid.ijk(i, j, kstart)].is_finite() {
                    return Err(ModelError::DomainViolation { field, i, j });
                }
            }
        }
        Ok(())
    }

    fn check_soil(&self, field: &'static str, data: &[f64]) -> Result<(), ModelError> {
        for k in self.soil_grid.kstart..self.soil_grid.kend {
            for j in self.grid.jstart..self.grid.jend {
                for i in self.grid.istart..self.grid.iend {
                    if !data[self.grid.ijk(i, j, k)].is_finite() {
                        return Err(ModelError::DomainViolation { field, i, j });
                    }
                }
            }
        }
        Ok(())
    }
}
