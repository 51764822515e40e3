//! Soil column: van Genuchten hydraulics, property fields, and the
//! explicit 1D diffusion solver.

pub mod column;
mod properties;
pub mod van_genuchten;

pub use column::{
    calc_root_column, calc_root_fraction, calc_root_water_extraction, diff_explicit,
    init_soil_homogeneous, set_bcs_moisture, set_bcs_temperature,
};
pub use properties::{
    calc_hydraulic_properties, calc_thermal_properties, interp_to_half_levels, SoilInterpolation,
};
pub use van_genuchten::VanGenuchtenTable;
