//! Lateral boundary handling for 2D surface planes.

mod cyclic;

pub use cyclic::{BoundaryCyclic, PeriodicCyclic};
