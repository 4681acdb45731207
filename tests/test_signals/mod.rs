pub mod generate;

pub use generate::{climb_samples, constant_samples, samples_from_altitude_fn};
