//! Monin-Obukhov surface layer: stability functions, Obukhov solvers, and
//! the momentum/scalar surface closures.

pub mod most;
mod momentum;
mod obukhov;
mod scalar;
mod stability;

pub use momentum::{calc_duvdz, surfm};
pub use obukhov::{
    calc_obuk_noslip_dirichlet_iterative, calc_obuk_noslip_flux_iterative, ObukhovLookup,
    ObukhovResult, NZL_LUT,
};
pub use scalar::{calc_dbdz, calc_ra, surfs};
pub use stability::{calc_dutot, stability, stability_neutral, ObukhovSolver};

#[cfg(feature = "parallel")]
pub use stability::stability_parallel;
