//! Physical and numerical constants.
//!
//! Values follow the usual atmospheric boundary-layer conventions
//! (IFS documentation Cy47r1, chapter 8, for the soil constants).

/// Von Kármán constant (-).
pub const KAPPA: f64 = 0.4;

/// Gravitational acceleration (m s⁻²).
pub const GRAV: f64 = 9.81;

/// Specific heat of dry air at constant pressure (J kg⁻¹ K⁻¹).
pub const CP: f64 = 1005.0;

/// Latent heat of vaporisation (J kg⁻¹).
pub const LV: f64 = 2.501e6;

/// Density of liquid water (kg m⁻³).
pub const RHO_W: f64 = 1.0e3;

/// Stefan-Boltzmann constant (W m⁻² K⁻⁴).
pub const SIGMA_B: f64 = 5.67e-8;

/// Volumetric heat capacity of the soil matrix (J m⁻³ K⁻¹).
pub const RHO_C_MATRIX: f64 = 2.19e6;

/// Volumetric heat capacity of water (J m⁻³ K⁻¹).
pub const RHO_C_WATER: f64 = 4.18e6;

/// Thermal conductivity of the soil matrix (W m⁻¹ K⁻¹).
pub const GAMMA_T_MATRIX: f64 = 3.44;

/// Thermal conductivity of water (W m⁻¹ K⁻¹).
pub const GAMMA_T_WATER: f64 = 0.57;

/// Density of dry solid soil (kg m⁻³).
pub const RHO_SOLID_SOIL: f64 = 2700.0;

/// Maximum liquid water storage per unit of skin area (m).
pub const WL_SAT: f64 = 2.0e-4;

/// Fraction of rainfall intercepted by a fully vegetated surface (-).
pub const INTERCEPT_EFF: f64 = 0.5;

/// Generic small number used to initialise fields away from zero.
pub const D_SMALL: f64 = 1.0e-9;

/// Magnitude of the Obukhov length used to represent neutral conditions (m).
pub const L_BIG: f64 = 1.0e12;

/// Lower bound on the friction velocity (m s⁻¹).
pub const USTAR_MIN: f64 = 1.0e-4;

/// Buoyancy forcing below which the surface layer is treated as neutral.
pub const B_NEUTRAL_EPS: f64 = 1.0e-12;

/// Floor on the total wind difference with the surface (m s⁻¹).
pub const DUTOT_MIN: f64 = 0.1;
