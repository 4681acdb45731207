use crate::config::FilterConfig;
use crate::constants::PA_PER_HPA;
use crate::error::{Result, VarioError};
use crate::estimation::{Estimator, pressure_to_altitude};
use crate::sensor::BaroSample;

/// Filtered state after one accepted sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarioReading {
    pub timestamp_us: u64,
    /// Seconds since the previous accepted sample (0 for the seeding sample)
    pub dt_secs: f64,
    /// Filtered pressure in hPa
    pub pressure_hpa: f64,
    pub temperature_c: f64,
    /// Filtered barometric altitude in meters
    pub altitude_m: f64,
    /// Vertical speed in m/s, positive when climbing
    pub vario_mps: f64,
}

/// Barometric pipeline: raw samples in, altitude and vario out
///
/// Runs two independent estimators: one smoothing raw pressure (Pa), one on
/// the barometric altitude derived from that pressure, whose velocity is the
/// vario. `dt` comes from consecutive sensor timestamps.
pub struct VarioProcessor {
    pressure_filter: Estimator,
    altitude_filter: Estimator,
    config: FilterConfig,
    last_timestamp_us: Option<u64>,
    last_reading: Option<VarioReading>,
    dropped: u64,
}

impl VarioProcessor {
    pub fn new(config: &FilterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            pressure_filter: Estimator::new(config.accel_variance)?,
            altitude_filter: Estimator::new(config.accel_variance)?,
            config: config.clone(),
            last_timestamp_us: None,
            last_reading: None,
            dropped: 0,
        })
    }

    /// Feed one sensor sample
    ///
    /// Rejected samples leave the filters untouched and are counted in
    /// [`dropped_samples`](Self::dropped_samples); the caller keeps showing
    /// the last good reading.
    pub fn ingest(&mut self, sample: &BaroSample) -> Result<VarioReading> {
        let result = self.ingest_inner(sample);
        if let Err(ref e) = result {
            self.dropped += 1;
            log::debug!("Dropped sample at {}us: {}", sample.timestamp_us, e);
        }
        result
    }

    fn ingest_inner(&mut self, sample: &BaroSample) -> Result<VarioReading> {
        if !sample.pressure_pa.is_finite() {
            return Err(VarioError::NonFiniteInput("pressure"));
        }
        if sample.pressure_pa <= 0.0 {
            return Err(VarioError::InvalidPressure(sample.pressure_pa));
        }

        let Some(last_timestamp) = self.last_timestamp_us else {
            return Ok(self.seed(sample));
        };

        let dt = (sample.timestamp_us as f64 - last_timestamp as f64) / 1_000_000.0;
        if dt <= 0.0 {
            return Err(VarioError::InvalidTimeDelta(dt));
        }
        if dt > self.config.max_gap_secs {
            log::warn!("{:.1}s gap in barometer samples, reseeding filters", dt);
            return Ok(self.seed(sample));
        }

        // Both filters advance on copies and are committed together
        let mut pressure_filter = self.pressure_filter.clone();
        pressure_filter.update(
            sample.pressure_pa,
            self.config.pressure_measurement_variance,
            dt,
        )?;
        let filtered_pa = pressure_filter.position();
        if !(filtered_pa.is_finite() && filtered_pa > 0.0) {
            return Err(VarioError::InvalidPressure(filtered_pa));
        }
        let pressure_hpa = filtered_pa / PA_PER_HPA;

        let baro_altitude = pressure_to_altitude(pressure_hpa, self.config.sea_level_hpa);
        if !baro_altitude.is_finite() {
            return Err(VarioError::NonFiniteInput("altitude"));
        }
        let mut altitude_filter = self.altitude_filter.clone();
        altitude_filter.update(baro_altitude, self.config.measurement_variance, dt)?;

        let reading = VarioReading {
            timestamp_us: sample.timestamp_us,
            dt_secs: dt,
            pressure_hpa,
            temperature_c: sample.temperature_c,
            altitude_m: altitude_filter.position(),
            vario_mps: altitude_filter.velocity(),
        };

        self.pressure_filter = pressure_filter;
        self.altitude_filter = altitude_filter;
        self.last_timestamp_us = Some(sample.timestamp_us);
        self.last_reading = Some(reading);
        Ok(reading)
    }

    fn seed(&mut self, sample: &BaroSample) -> VarioReading {
        let pressure_hpa = sample.pressure_pa / PA_PER_HPA;
        let altitude = pressure_to_altitude(pressure_hpa, self.config.sea_level_hpa);

        self.pressure_filter.reset(sample.pressure_pa);
        self.altitude_filter.reset(altitude);

        let reading = VarioReading {
            timestamp_us: sample.timestamp_us,
            dt_secs: 0.0,
            pressure_hpa,
            temperature_c: sample.temperature_c,
            altitude_m: altitude,
            vario_mps: 0.0,
        };

        log::debug!(
            "Filters seeded at {:.2} hPa / {:.1} m",
            pressure_hpa,
            altitude
        );

        self.last_timestamp_us = Some(sample.timestamp_us);
        self.last_reading = Some(reading);
        reading
    }

    /// Apply new noise parameters by rebuilding both filters
    ///
    /// The replacements are seeded at the last estimates, so the displayed
    /// altitude does not jump; the vario restarts from zero.
    pub fn retune(&mut self, accel_variance: f64, measurement_variance: f64) -> Result<()> {
        let config = FilterConfig {
            accel_variance,
            measurement_variance,
            ..self.config.clone()
        };
        config.validate()?;

        let pressure_filter = self.pressure_filter.rebuild(accel_variance)?;
        let altitude_filter = self.altitude_filter.rebuild(accel_variance)?;

        self.pressure_filter = pressure_filter;
        self.altitude_filter = altitude_filter;
        self.config = config;

        log::info!(
            "Filters rebuilt: accel variance {:.4}, measurement variance {:.4}",
            accel_variance,
            measurement_variance
        );
        Ok(())
    }

    /// Forget all history; the next sample seeds fresh filters
    pub fn reset(&mut self) {
        self.last_timestamp_us = None;
        self.last_reading = None;
        self.pressure_filter.reset(0.0);
        self.altitude_filter.reset(0.0);
    }

    pub fn last_reading(&self) -> Option<&VarioReading> {
        self.last_reading.as_ref()
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEA_LEVEL_PRESSURE_PA;
    use crate::estimation::altitude_to_pressure;
    use approx::assert_abs_diff_eq;

    fn processor() -> VarioProcessor {
        VarioProcessor::new(&FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_first_sample_seeds() {
        let mut proc = processor();
        let reading = proc
            .ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA, 15.0, 1_000))
            .unwrap();

        assert_eq!(reading.dt_secs, 0.0);
        assert_eq!(reading.vario_mps, 0.0);
        assert_abs_diff_eq!(reading.altitude_m, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(reading.pressure_hpa, 1013.25, epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_timestamp_is_dropped() {
        let mut proc = processor();
        proc.ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA, 15.0, 1_000))
            .unwrap();
        let before = *proc.last_reading().unwrap();

        let err = proc
            .ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA - 50.0, 15.0, 1_000))
            .unwrap_err();
        assert!(matches!(err, VarioError::InvalidTimeDelta(_)));

        let err = proc
            .ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA - 50.0, 15.0, 500))
            .unwrap_err();
        assert!(matches!(err, VarioError::InvalidTimeDelta(_)));

        assert_eq!(*proc.last_reading().unwrap(), before);
        assert_eq!(proc.dropped_samples(), 2);
    }

    #[test]
    fn test_bad_pressure_is_dropped() {
        let mut proc = processor();
        assert!(matches!(
            proc.ingest(&BaroSample::new(f64::NAN, 15.0, 0)),
            Err(VarioError::NonFiniteInput(_))
        ));
        assert!(matches!(
            proc.ingest(&BaroSample::new(0.0, 15.0, 0)),
            Err(VarioError::InvalidPressure(_))
        ));
        assert!(proc.last_reading().is_none());
    }

    fn filter_state(filter: &Estimator) -> (f64, f64, [[f64; 2]; 2]) {
        (filter.position(), filter.velocity(), filter.covariance())
    }

    #[test]
    fn test_rejected_filter_output_leaves_state_untouched() {
        let mut proc = processor();
        let pressures = [101_325.0, 80_000.0, 60_000.0, 40_000.0, 20_000.0, 1.0, 1.0, 1.0];

        let mut rejected = 0;
        for (i, &pressure) in pressures.iter().enumerate() {
            let pressure_before = filter_state(&proc.pressure_filter);
            let altitude_before = filter_state(&proc.altitude_filter);
            let reading_before = proc.last_reading().copied();

            let sample = BaroSample::new(pressure, 15.0, i as u64 * 250_000);
            match proc.ingest(&sample) {
                Ok(reading) => assert!(reading.vario_mps.is_finite()),
                Err(_) => {
                    rejected += 1;
                    assert_eq!(filter_state(&proc.pressure_filter), pressure_before);
                    assert_eq!(filter_state(&proc.altitude_filter), altitude_before);
                    assert_eq!(proc.last_reading().copied(), reading_before);
                }
            }
        }

        assert!(rejected > 0);
        assert_eq!(proc.dropped_samples(), rejected);
    }

    #[test]
    fn test_climb_produces_positive_vario() {
        let mut proc = processor();
        let mut last = None;
        for i in 0..240 {
            let t = i as f64 * 0.25;
            let pressure = altitude_to_pressure(500.0 + 2.0 * t, 1013.25) * PA_PER_HPA;
            last = Some(
                proc.ingest(&BaroSample::new(pressure, 15.0, (t * 1e6) as u64))
                    .unwrap(),
            );
        }

        let reading = last.unwrap();
        assert_abs_diff_eq!(reading.vario_mps, 2.0, epsilon = 0.1);
        assert_abs_diff_eq!(reading.altitude_m, 500.0 + 2.0 * 59.75, epsilon = 1.0);
    }

    #[test]
    fn test_gap_reseeds() {
        let mut proc = processor();
        proc.ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA, 15.0, 0))
            .unwrap();
        let reading = proc
            .ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA - 120.0, 15.0, 60_000_000))
            .unwrap();

        assert_eq!(reading.dt_secs, 0.0);
        assert_eq!(reading.vario_mps, 0.0);
        assert!(reading.altitude_m > 9.0);
    }

    #[test]
    fn test_retune_keeps_altitude() {
        let mut proc = processor();
        for i in 0..20u64 {
            proc.ingest(&BaroSample::new(95_000.0, 15.0, i * 250_000))
                .unwrap();
        }
        let altitude = proc.last_reading().unwrap().altitude_m;

        proc.retune(0.5, 0.2).unwrap();
        assert_eq!(proc.config().accel_variance, 0.5);

        let reading = proc
            .ingest(&BaroSample::new(95_000.0, 15.0, 20 * 250_000))
            .unwrap();
        assert_abs_diff_eq!(reading.altitude_m, altitude, epsilon = 0.5);

        assert!(matches!(
            proc.retune(-1.0, 0.2),
            Err(VarioError::InvalidNoiseParameter(_))
        ));
        assert_eq!(proc.config().accel_variance, 0.5);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut proc = processor();
        proc.ingest(&BaroSample::new(95_000.0, 15.0, 5_000_000))
            .unwrap();
        proc.reset();
        assert!(proc.last_reading().is_none());

        // An earlier timestamp is fine after a reset: it seeds again
        let reading = proc
            .ingest(&BaroSample::new(SEA_LEVEL_PRESSURE_PA, 15.0, 1_000))
            .unwrap();
        assert_eq!(reading.dt_secs, 0.0);
        assert_abs_diff_eq!(reading.altitude_m, 0.0, epsilon = 1e-9);
    }
}
