pub mod barometric;
pub mod kalman;

pub use barometric::{altitude_to_pressure, pressure_to_altitude};
pub use kalman::Estimator;
