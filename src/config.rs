//! Configuration for the variometer.
//!
//! Every section carries shipped defaults through `Default` and can be
//! overridden from a TOML file; missing keys fall back to the defaults:
//!
//! ```toml
//! [filter]
//! accel_variance = 0.2
//!
//! [tone]
//! curve = "polynomial"
//! volume = 0.6
//!
//! [tone.thresholds]
//! climb_on = 0.3
//! climb_off = 0.2
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::{MAX_CYCLE_MS, MIN_CYCLE_MS, MIN_PULSE_MS, SEA_LEVEL_PRESSURE_HPA};
use crate::error::{Result, VarioError};

/// System-wide variometer configuration
///
/// # Example
/// ```
/// use variotone::config::VarioConfig;
///
/// let mut config = VarioConfig::default();
/// config.tone.volume = 0.5;
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VarioConfig {
    /// Audio output configuration
    pub audio: AudioConfig,
    /// Estimator tuning
    pub filter: FilterConfig,
    /// Tone mapping and hysteresis
    pub tone: ToneConfig,
}

/// PCM sample encoding handed to the audio sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit float in [-1, 1]
    F32,
    /// 16-bit signed integer
    I16,
}

/// Audio output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output sample rate in Hz (44100 or 48000)
    pub sample_rate: u32,
    /// Number of output channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frames per submitted block. Fixed for the lifetime of a stream:
    /// 1024 frames is ~21 ms at 48 kHz, short enough that a new tone is heard
    /// within one beep and long enough to ride out scheduler jitter.
    pub buffer_frames: usize,
    /// Sample encoding
    pub sample_format: SampleFormat,
    /// Queue headroom between the tone player and the device, in blocks on
    /// top of one longest beep cycle
    pub queue_depth: usize,
}

/// Estimator tuning
///
/// Changing either variance at run time rebuilds the filters rather than
/// mutating them (see `VarioProcessor::retune`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Process noise ("acceleration variance"); higher reacts faster but noisier
    pub accel_variance: f64,
    /// Measurement noise of the barometric altitude channel (m²)
    pub measurement_variance: f64,
    /// Measurement noise of the raw pressure channel (Pa²)
    pub pressure_measurement_variance: f64,
    /// Reference pressure for the barometric formula in hPa
    pub sea_level_hpa: f64,
    /// Gap between samples, in seconds, after which the filters are reseeded
    pub max_gap_secs: f64,
}

/// Which family of tone curves maps climb rate to sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Piecewise-linear control-point tables
    Table,
    /// Low-order polynomial fits
    Polynomial,
    /// Constant pitch and tempo for any climb
    Fixed,
}

/// Hysteresis thresholds in m/s
///
/// `climb_off <= climb_on` and `sink_off >= sink_on` keep the tone from
/// chattering when the vario hovers near a boundary.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub climb_on: f64,
    pub climb_off: f64,
    pub sink_on: f64,
    pub sink_off: f64,
}

/// Curve description as it appears in a config file
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CurveSpec {
    /// `[[x, y], ...]` control points
    Table { points: Vec<[f64; 2]> },
    /// Coefficients, lowest order first
    Polynomial { coefficients: Vec<f64> },
    Fixed { value: f64 },
}

/// Explicit curves overriding the `curve` preset
#[derive(Debug, Clone, Deserialize)]
pub struct MappingConfig {
    /// Climb rate (m/s) to tone frequency (Hz)
    pub frequency: CurveSpec,
    /// Climb rate (m/s) to beep cycle length (ms)
    pub cycle_ms: CurveSpec,
    /// Climb rate (m/s) to duty cycle (0-1)
    pub duty: CurveSpec,
}

/// Tone controller configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    /// Preset curve family
    pub curve: CurveKind,
    /// Explicit curves; replaces the preset when present
    pub mapping: Option<MappingConfig>,
    pub thresholds: Thresholds,
    /// Output amplitude for audible tones (0-1)
    pub volume: f64,
    /// Climb rate at which the climb curves saturate (m/s)
    pub max_vario: f64,
    /// Continuous sink tone frequency in Hz
    pub sink_frequency_hz: f64,
    /// Re-evaluation interval of the continuous sink tone in ms
    pub sink_interval_ms: u32,
    /// Re-evaluation interval while silent in ms
    pub idle_interval_ms: u32,
    /// Attack/release ramp length in ms, at most half the shortest pulse
    pub envelope_ms: f64,
    /// Lowest frequency the controller will request
    pub min_frequency_hz: f64,
    /// Highest frequency the controller will request
    pub max_frequency_hz: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 1,
            buffer_frames: 1024,
            sample_format: SampleFormat::F32,
            queue_depth: 32,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            accel_variance: 0.1,
            measurement_variance: 0.05,
            pressure_measurement_variance: 0.05,
            sea_level_hpa: SEA_LEVEL_PRESSURE_HPA,
            max_gap_secs: 5.0,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            climb_on: 0.2,
            climb_off: 0.15,
            sink_on: -2.0,
            sink_off: -1.8,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            curve: CurveKind::Table,
            mapping: None,
            thresholds: Thresholds::default(),
            volume: 0.8,
            max_vario: 10.0,
            sink_frequency_hz: 150.0,
            sink_interval_ms: 500,
            idle_interval_ms: 400,
            envelope_ms: 5.0,
            min_frequency_hz: 100.0,
            max_frequency_hz: 4000.0,
        }
    }
}

impl VarioConfig {
    /// Load a TOML file and validate it
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| VarioError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| VarioError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.filter.validate()?;
        self.tone.validate(self.audio.sample_rate)
    }
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VarioError::Config("sample_rate must be positive".into()));
        }
        if !matches!(self.channels, 1 | 2) {
            return Err(VarioError::Config(format!(
                "channels must be 1 or 2, got {}",
                self.channels
            )));
        }
        if self.buffer_frames == 0 || self.queue_depth == 0 {
            return Err(VarioError::Config(
                "buffer_frames and queue_depth must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Duration of one block in milliseconds
    pub fn block_ms(&self) -> f64 {
        self.buffer_frames as f64 * 1000.0 / self.sample_rate as f64
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<()> {
        for variance in [
            self.accel_variance,
            self.measurement_variance,
            self.pressure_measurement_variance,
        ] {
            if !(variance.is_finite() && variance > 0.0) {
                return Err(VarioError::InvalidNoiseParameter(variance));
            }
        }
        if !(self.sea_level_hpa.is_finite() && self.sea_level_hpa > 0.0) {
            return Err(VarioError::Config(format!(
                "sea_level_hpa must be positive, got {}",
                self.sea_level_hpa
            )));
        }
        if !(self.max_gap_secs > 0.0) {
            return Err(VarioError::Config("max_gap_secs must be positive".into()));
        }
        Ok(())
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        let all = [self.climb_on, self.climb_off, self.sink_on, self.sink_off];
        if all.iter().any(|t| !t.is_finite()) {
            return Err(VarioError::Config("thresholds must be finite".into()));
        }
        if self.climb_off > self.climb_on {
            return Err(VarioError::Config(format!(
                "climb_off ({}) must not exceed climb_on ({})",
                self.climb_off, self.climb_on
            )));
        }
        if self.sink_off < self.sink_on {
            return Err(VarioError::Config(format!(
                "sink_off ({}) must not be below sink_on ({})",
                self.sink_off, self.sink_on
            )));
        }
        if self.sink_off >= self.climb_off {
            return Err(VarioError::Config(
                "sink band must lie below the climb band".into(),
            ));
        }
        Ok(())
    }
}

impl ToneConfig {
    pub fn validate(&self, sample_rate: u32) -> Result<()> {
        self.thresholds.validate()?;
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(VarioError::Config(format!(
                "volume must be within [0, 1], got {}",
                self.volume
            )));
        }
        if !(self.min_frequency_hz > 0.0 && self.min_frequency_hz < self.max_frequency_hz) {
            return Err(VarioError::Config(format!(
                "frequency range {}-{} Hz is empty",
                self.min_frequency_hz, self.max_frequency_hz
            )));
        }
        if self.min_frequency_hz >= sample_rate as f64 / 2.0 {
            return Err(VarioError::Config(format!(
                "min_frequency_hz {} is above Nyquist for {} Hz",
                self.min_frequency_hz, sample_rate
            )));
        }
        if !(self.max_vario > 0.0) {
            return Err(VarioError::Config("max_vario must be positive".into()));
        }
        // Attack plus release must fit in the shortest pulse
        let max_envelope_ms = MIN_PULSE_MS as f64 / 2.0;
        if !(self.envelope_ms > 0.0 && self.envelope_ms <= max_envelope_ms) {
            return Err(VarioError::Config(format!(
                "envelope_ms must be within (0, {}], got {}",
                max_envelope_ms, self.envelope_ms
            )));
        }
        for interval in [self.sink_interval_ms, self.idle_interval_ms] {
            if !(MIN_CYCLE_MS..=MAX_CYCLE_MS).contains(&interval) {
                return Err(VarioError::Config(format!(
                    "sink/idle intervals must be within {}-{} ms, got {}",
                    MIN_CYCLE_MS, MAX_CYCLE_MS, interval
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(VarioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = VarioConfig::from_toml_str(
            r#"
            [filter]
            accel_variance = 0.25

            [tone]
            curve = "polynomial"
            volume = 0.5

            [tone.thresholds]
            climb_on = 0.3
            climb_off = 0.2
            "#,
        )
        .unwrap();

        assert!((config.filter.accel_variance - 0.25).abs() < 1e-12);
        assert!((config.filter.measurement_variance - 0.05).abs() < 1e-12);
        assert_eq!(config.tone.curve, CurveKind::Polynomial);
        assert!((config.tone.thresholds.climb_on - 0.3).abs() < 1e-12);
        assert!((config.tone.thresholds.sink_on + 2.0).abs() < 1e-12);
        assert_eq!(config.audio.sample_rate, 48000);
    }

    #[test]
    fn test_toml_explicit_mapping() {
        let config = VarioConfig::from_toml_str(
            r#"
            [tone.mapping.frequency]
            type = "table"
            points = [[0.0, 400.0], [5.0, 1200.0]]

            [tone.mapping.cycle_ms]
            type = "polynomial"
            coefficients = [400.0, -30.0]

            [tone.mapping.duty]
            type = "fixed"
            value = 0.5
            "#,
        )
        .unwrap();

        let mapping = config.tone.mapping.expect("mapping present");
        assert!(matches!(mapping.frequency, CurveSpec::Table { ref points } if points.len() == 2));
        assert!(matches!(mapping.duty, CurveSpec::Fixed { value } if value == 0.5));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = VarioConfig::default();
        config.tone.thresholds.climb_off = 0.5;
        assert!(config.validate().is_err());

        let mut config = VarioConfig::default();
        config.tone.thresholds.sink_off = -3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_variance_rejected() {
        let mut config = VarioConfig::default();
        config.filter.accel_variance = 0.0;
        assert!(matches!(
            config.validate(),
            Err(VarioError::InvalidNoiseParameter(_))
        ));
    }

    #[test]
    fn test_block_duration() {
        let audio = AudioConfig::default();
        assert!((audio.block_ms() - 21.333).abs() < 0.01);
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = VarioConfig::default();
        config.tone.idle_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = VarioConfig::default();
        config.tone.sink_interval_ms = MAX_CYCLE_MS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_envelope_fits_shortest_pulse() {
        let mut config = VarioConfig::default();
        config.tone.envelope_ms = MIN_PULSE_MS as f64 / 2.0;
        assert!(config.validate().is_ok());

        for envelope_ms in [0.0, 30.0, 50.0, f64::NAN] {
            config.tone.envelope_ms = envelope_ms;
            assert!(config.validate().is_err(), "envelope {envelope_ms}");
        }
    }
}
