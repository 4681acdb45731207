//! Climb rate to sound: curves, hysteresis and beep timing.

pub mod controller;
pub mod curve;
pub mod interpolator;
pub mod scheduler;

pub use controller::{ToneController, ToneSpec, ToneState};
pub use curve::{Curve, ToneMapping, ToneParameters};
pub use interpolator::{ControlPoint, PiecewiseLinear};
pub use scheduler::PulseScheduler;
