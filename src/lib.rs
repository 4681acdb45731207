pub mod audio;
pub mod config;
pub mod constants;
pub mod error;
pub mod estimation;
pub mod output;
pub mod processing;
pub mod sensor;
pub mod tone;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::VarioConfig;
pub use error::{Result, VarioError};
pub use processing::{VarioProcessor, VarioReading};
