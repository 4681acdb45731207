use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::{PA_PER_HPA, SEA_LEVEL_PRESSURE_HPA};
use crate::error::{Result, VarioError};
use crate::estimation::altitude_to_pressure;
use crate::sensor::{BaroSample, PressureSource};

/// Constant climb rate for a stretch of time
#[derive(Clone, Debug, serde::Deserialize)]
pub struct FlightSegment {
    pub duration_secs: f64,
    /// m/s, negative for sink
    pub climb_mps: f64,
}

/// Synthetic flight driving a fake barometer
///
/// Loadable from TOML:
///
/// ```toml
/// seed = 7
/// pressure_noise_pa = 1.5
///
/// [[segments]]
/// duration_secs = 20.0
/// climb_mps = 2.5
/// ```
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct FlightProfile {
    pub seed: Option<u64>,
    pub start_altitude_m: f64,
    pub sample_interval_ms: f64,
    /// Uniform timestamp jitter, +/- this many ms
    pub interval_jitter_ms: f64,
    /// Standard deviation of the Gaussian pressure noise
    pub pressure_noise_pa: f64,
    pub temperature_c: f64,
    pub sea_level_hpa: f64,
    pub segments: Vec<FlightSegment>,
}

impl Default for FlightProfile {
    fn default() -> Self {
        Self {
            seed: None,
            start_altitude_m: 500.0,
            sample_interval_ms: 100.0,
            interval_jitter_ms: 5.0,
            pressure_noise_pa: 2.0,
            temperature_c: 15.0,
            sea_level_hpa: SEA_LEVEL_PRESSURE_HPA,
            segments: vec![
                FlightSegment {
                    duration_secs: 10.0,
                    climb_mps: 0.0,
                },
                FlightSegment {
                    duration_secs: 20.0,
                    climb_mps: 2.0,
                },
                FlightSegment {
                    duration_secs: 10.0,
                    climb_mps: 0.5,
                },
                FlightSegment {
                    duration_secs: 15.0,
                    climb_mps: -3.0,
                },
            ],
        }
    }
}

impl FlightProfile {
    pub fn from_toml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| VarioError::Config(format!("{}: {}", path.display(), e)))?;
        let profile: Self =
            toml::from_str(&content).map_err(|e| VarioError::Config(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Profile with no segments, for building up by hand
    pub fn empty() -> Self {
        Self {
            segments: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_noise(mut self, pressure_noise_pa: f64) -> Self {
        self.pressure_noise_pa = pressure_noise_pa;
        self
    }

    pub fn with_interval(mut self, sample_interval_ms: f64, jitter_ms: f64) -> Self {
        self.sample_interval_ms = sample_interval_ms;
        self.interval_jitter_ms = jitter_ms;
        self
    }

    pub fn segment(mut self, duration_secs: f64, climb_mps: f64) -> Self {
        self.segments.push(FlightSegment {
            duration_secs,
            climb_mps,
        });
        self
    }

    pub fn duration_secs(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_secs).sum()
    }

    /// True altitude at `t` seconds
    pub fn altitude_at(&self, t: f64) -> f64 {
        let mut altitude = self.start_altitude_m;
        let mut remaining = t.max(0.0);
        for segment in &self.segments {
            let dt = remaining.min(segment.duration_secs);
            altitude += segment.climb_mps * dt;
            remaining -= dt;
            if remaining <= 0.0 {
                break;
            }
        }
        altitude
    }

    /// True climb rate at `t` seconds (0 after the last segment)
    pub fn climb_at(&self, t: f64) -> f64 {
        let mut start = 0.0;
        for segment in &self.segments {
            if t < start + segment.duration_secs {
                return segment.climb_mps;
            }
            start += segment.duration_secs;
        }
        0.0
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_interval_ms > 0.0) {
            return Err(VarioError::Config("sample_interval_ms must be positive".into()));
        }
        if !(self.interval_jitter_ms >= 0.0 && self.interval_jitter_ms < self.sample_interval_ms) {
            return Err(VarioError::Config(
                "interval_jitter_ms must be below sample_interval_ms".into(),
            ));
        }
        if self
            .segments
            .iter()
            .any(|s| !(s.duration_secs >= 0.0 && s.climb_mps.is_finite()))
        {
            return Err(VarioError::Config("invalid flight segment".into()));
        }
        Ok(())
    }
}

/// [`PressureSource`] replaying a [`FlightProfile`] with sensor noise
pub struct SimulatedFlight {
    profile: FlightProfile,
    rng: ChaCha8Rng,
    noise: Normal<f64>,
    next_us: u64,
}

impl SimulatedFlight {
    pub fn new(profile: FlightProfile) -> Result<Self> {
        profile.validate()?;
        let noise = Normal::new(0.0, profile.pressure_noise_pa)
            .map_err(|e| VarioError::Config(format!("pressure noise: {}", e)))?;
        let rng = match profile.seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => rand::make_rng(),
        };

        log::info!(
            "Simulating {:.0}s flight in {} segments",
            profile.duration_secs(),
            profile.segments.len()
        );

        Ok(Self {
            profile,
            rng,
            noise,
            next_us: 0,
        })
    }

    pub fn profile(&self) -> &FlightProfile {
        &self.profile
    }
}

impl PressureSource for SimulatedFlight {
    fn next_sample(&mut self) -> anyhow::Result<Option<BaroSample>> {
        let t = self.next_us as f64 / 1e6;
        if t > self.profile.duration_secs() {
            return Ok(None);
        }

        let altitude = self.profile.altitude_at(t);
        let pressure_pa = altitude_to_pressure(altitude, self.profile.sea_level_hpa) * PA_PER_HPA
            + self.noise.sample(&mut self.rng);
        let sample = BaroSample::new(pressure_pa, self.profile.temperature_c, self.next_us);

        let jitter = (self.rng.random::<f64>() * 2.0 - 1.0) * self.profile.interval_jitter_ms;
        let step_ms = (self.profile.sample_interval_ms + jitter).max(1.0);
        self.next_us += (step_ms * 1000.0).round() as u64;

        Ok(Some(sample))
    }
}
