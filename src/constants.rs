//! Physical and numeric constants
//!
//! Barometric reference values, filter initialisation and the hard limits the
//! tone controller clamps its output to.

/// Standard sea-level pressure in pascal.
pub const SEA_LEVEL_PRESSURE_PA: f64 = 101_325.0;

/// Standard sea-level pressure in hectopascal.
pub const SEA_LEVEL_PRESSURE_HPA: f64 = 1013.25;

/// Pascal per hectopascal.
pub const PA_PER_HPA: f64 = 100.0;

/// Scale height of the simplified barometric formula, in meters.
pub const BAROMETRIC_SCALE_M: f64 = 44_330.0;

/// Exponent of the simplified barometric formula.
pub const BAROMETRIC_EXPONENT: f64 = 0.19;

/// Diagonal of the estimator covariance after a reset.
/// Wide enough that the first few measurements dominate the prior.
pub const INITIAL_VARIANCE: f64 = 100.0;

/// Shortest audible pulse the tone controller will request, in milliseconds.
/// Must leave room for the attack and release ramps.
pub const MIN_PULSE_MS: u32 = 20;

/// Shortest beep cycle (pulse + silence), in milliseconds.
pub const MIN_CYCLE_MS: u32 = 40;

/// Longest beep cycle (pulse + silence), in milliseconds.
pub const MAX_CYCLE_MS: u32 = 2_000;

/// Duty cycle bounds for pulsed tones.
pub const MIN_DUTY_CYCLE: f64 = 0.05;
pub const MAX_DUTY_CYCLE: f64 = 0.95;

/// Fraction of Nyquist a tone may reach before it is clamped.
pub const NYQUIST_MARGIN: f64 = 0.45;
