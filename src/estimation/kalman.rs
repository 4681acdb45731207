use crate::constants::INITIAL_VARIANCE;
use crate::error::{Result, VarioError};

/// Two-state (position, velocity) Kalman filter
///
/// Fuses irregularly timed scalar measurements into smoothed position and
/// velocity estimates under a constant-velocity model. Process noise is
/// modelled as white acceleration with variance `process_noise`, so the
/// covariance widens with both `dt` and `process_noise` before each
/// correction:
///
/// ```text
/// Q = q * | dt^4/4  dt^3/2 |
///         | dt^3/2  dt^2   |
/// ```
///
/// Two independent instances are used by the barometric pipeline, one on raw
/// pressure and one on barometric altitude. The filter holds no locks and
/// must be driven from a single context.
///
/// # Example
/// ```
/// use variotone::estimation::Estimator;
///
/// let mut filter = Estimator::new(0.1).unwrap();
/// filter.reset(100.0);
/// filter.update(100.5, 0.05, 0.25).unwrap();
/// assert!(filter.position() > 100.0);
/// ```
#[derive(Debug, Clone)]
pub struct Estimator {
    position: f64,
    velocity: f64,
    covariance: [[f64; 2]; 2],
    process_noise: f64,
}

impl Estimator {
    /// Create a filter at position 0 with the given process noise
    ///
    /// Returns `InvalidNoiseParameter` unless `process_noise` is positive and
    /// finite.
    pub fn new(process_noise: f64) -> Result<Self> {
        if !(process_noise.is_finite() && process_noise > 0.0) {
            return Err(VarioError::InvalidNoiseParameter(process_noise));
        }

        let mut filter = Self {
            position: 0.0,
            velocity: 0.0,
            covariance: [[0.0; 2]; 2],
            process_noise,
        };
        filter.reset(0.0);
        Ok(filter)
    }

    /// Reinitialize at `value` with zero velocity and a wide covariance
    pub fn reset(&mut self, value: f64) {
        self.position = value;
        self.velocity = 0.0;
        self.covariance = [[INITIAL_VARIANCE, 0.0], [0.0, INITIAL_VARIANCE]];
    }

    /// Fresh filter with a new process noise, seeded at the current position
    ///
    /// Retuning replaces the filter instead of editing `process_noise` in
    /// place, so the covariance always matches the noise it was grown with.
    pub fn rebuild(&self, process_noise: f64) -> Result<Self> {
        let mut filter = Self::new(process_noise)?;
        filter.reset(self.position);
        Ok(filter)
    }

    /// Fold one measurement taken `dt` seconds after the previous one
    ///
    /// Rejected calls leave the filter untouched.
    pub fn update(&mut self, measurement: f64, measurement_noise: f64, dt: f64) -> Result<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(VarioError::InvalidTimeDelta(dt));
        }
        if !(measurement_noise.is_finite() && measurement_noise > 0.0) {
            return Err(VarioError::InvalidNoiseParameter(measurement_noise));
        }
        if !measurement.is_finite() {
            return Err(VarioError::NonFiniteInput("estimator measurement"));
        }

        // Predict: F = [[1, dt], [0, 1]], P = F P F' + Q
        let dt2 = dt * dt;
        let q = self.process_noise;
        let [[p00, p01], [_, p11]] = self.covariance;

        let position = self.position + self.velocity * dt;
        let velocity = self.velocity;

        let pp00 = p00 + 2.0 * dt * p01 + dt2 * p11 + 0.25 * dt2 * dt2 * q;
        let pp01 = p01 + dt * p11 + 0.5 * dt2 * dt * q;
        let pp11 = p11 + dt2 * q;

        // Gain: H = [1, 0]
        let innovation = measurement - position;
        let s = pp00 + measurement_noise;
        let k0 = pp00 / s;
        let k1 = pp01 / s;

        // Joseph form: P = (I - KH) P (I - KH)' + K R K'
        let a00 = 1.0 - k0;
        let n00 = a00 * a00 * pp00 + k0 * k0 * measurement_noise;
        let n01 = a00 * (pp01 - k1 * pp00) + k0 * k1 * measurement_noise;
        let n11 = pp11 - 2.0 * k1 * pp01 + k1 * k1 * pp00 + k1 * k1 * measurement_noise;

        self.position = position + k0 * innovation;
        self.velocity = velocity + k1 * innovation;
        self.covariance = [[n00.max(0.0), n01], [n01, n11.max(0.0)]];

        Ok(())
    }

    /// Filtered position
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Filtered velocity (rate of change of position per second)
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn covariance(&self) -> [[f64; 2]; 2] {
        self.covariance
    }

    pub fn process_noise(&self) -> f64 {
        self.process_noise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn is_psd(p: [[f64; 2]; 2]) -> bool {
        let det = p[0][0] * p[1][1] - p[0][1] * p[1][0];
        p[0][0] >= 0.0 && p[1][1] >= 0.0 && det >= -1e-9 && (p[0][1] - p[1][0]).abs() < 1e-12
    }

    #[test]
    fn test_reset_after_construction() {
        let mut filter = Estimator::new(0.1).unwrap();
        filter.reset(42.5);
        assert_eq!(filter.position(), 42.5);
        assert_eq!(filter.velocity(), 0.0);
        assert_eq!(
            filter.covariance(),
            [[INITIAL_VARIANCE, 0.0], [0.0, INITIAL_VARIANCE]]
        );
    }

    #[test]
    fn test_rejects_bad_process_noise() {
        assert!(matches!(
            Estimator::new(0.0),
            Err(VarioError::InvalidNoiseParameter(_))
        ));
        assert!(Estimator::new(-1.0).is_err());
        assert!(Estimator::new(f64::NAN).is_err());
    }

    #[test]
    fn test_rejected_updates_do_not_mutate() {
        let mut filter = Estimator::new(0.1).unwrap();
        filter.reset(10.0);
        filter.update(10.2, 0.05, 0.25).unwrap();
        let before = filter.clone();

        assert!(matches!(
            filter.update(11.0, 0.05, 0.0),
            Err(VarioError::InvalidTimeDelta(_))
        ));
        assert!(filter.update(11.0, 0.05, -0.25).is_err());
        assert!(matches!(
            filter.update(11.0, 0.0, 0.25),
            Err(VarioError::InvalidNoiseParameter(_))
        ));
        assert!(matches!(
            filter.update(f64::NAN, 0.05, 0.25),
            Err(VarioError::NonFiniteInput(_))
        ));

        assert_eq!(filter.position(), before.position());
        assert_eq!(filter.velocity(), before.velocity());
        assert_eq!(filter.covariance(), before.covariance());
    }

    #[test]
    fn test_constant_measurement_converges() {
        let mut filter = Estimator::new(0.1).unwrap();
        filter.reset(0.0);

        let target = 250.0;
        let mut errors = Vec::new();
        for _ in 0..200 {
            filter.update(target, 0.05, 0.25).unwrap();
            errors.push((filter.position() - target).abs());
        }

        assert!(errors[199] < 1e-3, "final error {}", errors[199]);
        assert!(filter.velocity().abs() < 1e-3);

        // The error rings while it decays; its envelope must not grow
        let envelope: Vec<f64> = errors[40..]
            .chunks(20)
            .map(|w| w.iter().cloned().fold(0.0, f64::max))
            .collect();
        for pair in envelope.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9, "envelope grew: {:?}", envelope);
        }
    }

    #[test]
    fn test_tracks_constant_velocity() {
        let mut filter = Estimator::new(0.1).unwrap();
        filter.reset(0.0);

        let dt = 0.25;
        for i in 1..=400 {
            let t = i as f64 * dt;
            filter.update(2.0 * t, 0.05, dt).unwrap();
        }

        assert_abs_diff_eq!(filter.velocity(), 2.0, epsilon = 0.01);
        assert_abs_diff_eq!(filter.position(), 200.0, epsilon = 0.05);
    }

    #[test]
    fn test_covariance_stays_psd_with_irregular_dt() {
        let mut filter = Estimator::new(0.75).unwrap();
        filter.reset(0.0);

        let dts = [0.25, 0.5, 0.31, 0.001, 2.0, 0.27, 10.0, 0.25];
        for (i, &dt) in dts.iter().cycle().take(400).enumerate() {
            let measurement = (i as f64 * 0.37).sin() * 3.0;
            filter.update(measurement, 0.5, dt).unwrap();
            assert!(is_psd(filter.covariance()), "step {i}: {:?}", filter.covariance());
        }
    }

    #[test]
    fn test_higher_process_noise_reacts_faster() {
        let mut slow = Estimator::new(0.01).unwrap();
        let mut fast = Estimator::new(0.75).unwrap();
        slow.reset(0.0);
        fast.reset(0.0);

        for _ in 0..100 {
            slow.update(0.0, 0.5, 0.25).unwrap();
            fast.update(0.0, 0.5, 0.25).unwrap();
        }
        // Step the input and compare the first response
        slow.update(10.0, 0.5, 0.25).unwrap();
        fast.update(10.0, 0.5, 0.25).unwrap();

        assert!(fast.position() > slow.position());
    }

    #[test]
    fn test_rebuild_seeds_at_current_position() {
        let mut filter = Estimator::new(0.1).unwrap();
        filter.reset(0.0);
        for i in 1..=40 {
            filter.update(i as f64, 0.05, 0.25).unwrap();
        }

        let rebuilt = filter.rebuild(0.5).unwrap();
        assert_eq!(rebuilt.position(), filter.position());
        assert_eq!(rebuilt.velocity(), 0.0);
        assert_eq!(rebuilt.process_noise(), 0.5);
        assert!(filter.rebuild(0.0).is_err());
    }
}
