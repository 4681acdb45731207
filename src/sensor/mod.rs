pub mod source;

pub use source::{CsvReplaySource, PressureSource, VecSource};

/// One barometer reading as delivered by the sensor collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroSample {
    /// Static pressure in pascal
    pub pressure_pa: f64,
    /// Sensor temperature in °C
    pub temperature_c: f64,
    /// Sensor timestamp in microseconds (monotonic, arbitrary epoch)
    pub timestamp_us: u64,
}

impl BaroSample {
    pub fn new(pressure_pa: f64, temperature_c: f64, timestamp_us: u64) -> Self {
        Self {
            pressure_pa,
            temperature_c,
            timestamp_us,
        }
    }
}
