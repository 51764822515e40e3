//! Grid definitions for the atmosphere surface plane and the soil column.

mod atmosphere;
mod soil;

pub use atmosphere::AtmosphereGrid;
pub use soil::SoilGrid;
