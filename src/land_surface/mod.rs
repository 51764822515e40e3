//! Land surface: tiled energy balance, resistances, the liquid water
//! skin, and the closure of the atmospheric bottom boundary.

mod exchange;
mod reservoir;
mod resistance;
mod seb;
mod tile;

pub use exchange::{calc_bcs, calc_tile_bcs};
pub use reservoir::{calc_liquid_water_reservoir, diagnose_infiltration};
pub use resistance::{
    calc_canopy_resistance, calc_resistance_functions, calc_root_weighted_mean_theta,
    calc_soil_resistance,
};
pub use seb::{calc_fluxes, calc_fluxes_water, choose_skin_conductivity};
pub use tile::{
    calc_tile_fractions, calc_tiled_mean, scale_tile_with_fraction, wl_max, SurfaceTile, TileKind,
    Tiles,
};
