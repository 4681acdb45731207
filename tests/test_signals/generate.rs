#![allow(dead_code)]

use variotone::constants::{PA_PER_HPA, SEA_LEVEL_PRESSURE_HPA};
use variotone::estimation::altitude_to_pressure;
use variotone::sensor::BaroSample;

/// Noise-free barometer samples for an altitude trajectory
/// The altitude_fn takes time in seconds and returns altitude in meters
pub fn samples_from_altitude_fn<F>(interval_secs: f64, count: usize, altitude_fn: F) -> Vec<BaroSample>
where
    F: Fn(f64) -> f64,
{
    (0..count)
        .map(|i| {
            let t = i as f64 * interval_secs;
            let pressure_pa = altitude_to_pressure(altitude_fn(t), SEA_LEVEL_PRESSURE_HPA) * PA_PER_HPA;
            BaroSample::new(pressure_pa, 15.0, (t * 1e6).round() as u64)
        })
        .collect()
}

/// Fixed pressure at a fixed interval
pub fn constant_samples(pressure_pa: f64, interval_secs: f64, count: usize) -> Vec<BaroSample> {
    (0..count)
        .map(|i| {
            let t = i as f64 * interval_secs;
            BaroSample::new(pressure_pa, 15.0, (t * 1e6).round() as u64)
        })
        .collect()
}

/// Steady climb (or sink for negative rates) from `start_altitude_m`
pub fn climb_samples(
    start_altitude_m: f64,
    climb_mps: f64,
    interval_secs: f64,
    count: usize,
) -> Vec<BaroSample> {
    samples_from_altitude_fn(interval_secs, count, |t| start_altitude_m + climb_mps * t)
}
