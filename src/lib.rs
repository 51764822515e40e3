//! # lsm-rs
//!
//! Surface boundary layer and land-surface coupling for atmospheric
//! large-eddy simulation.
//!
//! This crate computes, at every time step, the lowest boundary condition
//! of an LES over land: friction velocity and Obukhov length from
//! Monin-Obukhov similarity, the momentum and scalar surface closures, a
//! three-tile surface energy balance (vegetation, bare soil, wet skin),
//! an interception reservoir, and the 1D diffusive soil column beneath
//! every grid cell:
//!
//! - Monin-Obukhov stability functions and profile factors
//! - Obukhov length solvers (Newton iteration and hinted lookup table)
//! - Momentum/scalar surface closure per boundary-condition type
//! - Van Genuchten soil hydraulics with clamped diffusivity/conductivity
//! - Explicit 1D soil diffusion with root extraction and free drainage
//! - Tiled surface energy balance with linearised longwave emission
//! - Liquid water skin reservoir (interception, throughfall, dew)
//! - Tile aggregation closing the atmospheric θ_l/q_t bottom boundary
//!
//! The dynamical core, thermodynamics, radiation, and microphysics stay
//! outside; they talk to [`LandSurfaceModel`] through borrowed slices and
//! the [`boundary::BoundaryCyclic`] halo-exchange capability.

pub mod boundary;
pub mod constants;
pub mod grid;
pub mod io;
pub mod land_surface;
pub mod model;
pub mod soil;
pub mod surface_layer;
pub mod types;

// Re-export the main types for convenience.
pub use boundary::{BoundaryCyclic, PeriodicCyclic};
pub use grid::{AtmosphereGrid, SoilGrid};
pub use model::{
    BuoyancyInput, Config, ConfigError, LandSurfaceModel, ModelError, MomentumInput,
    RadiationInput, ScalarInput, SkinInput, SolverStats,
};
pub use types::{MomentumBc, ScalarBc, ThermoBc};

pub use io::{read_van_genuchten_table, SlabError, TableError};
pub use land_surface::{SurfaceTile, TileKind, Tiles};
pub use soil::VanGenuchtenTable;
pub use surface_layer::{ObukhovLookup, ObukhovSolver};
