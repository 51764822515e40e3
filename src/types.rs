//! Boundary-condition type enumerations.
//!
//! The surface scheme dispatches on small enums rather than trait objects:
//! the combinations are known at compile time and the dispatch sits inside
//! hot per-cell loops.

/// Bottom boundary condition for momentum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MomentumBc {
    /// Surface velocity prescribed (no-slip); the friction velocity follows
    /// from Monin-Obukhov similarity.
    Dirichlet,
    /// Friction velocity prescribed directly; the momentum flux is
    /// partitioned over the two components.
    Ustar,
}

/// Bottom boundary condition for the buoyancy used by the stability solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThermoBc {
    /// Surface buoyancy value prescribed.
    Dirichlet,
    /// Surface buoyancy flux prescribed.
    Flux,
}

/// Bottom boundary condition for a transported scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarBc {
    /// Surface value prescribed; the flux follows from similarity.
    Dirichlet,
    /// Surface flux prescribed; the surface value follows from similarity.
    Flux,
}
