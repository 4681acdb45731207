use std::time::Duration;

use crate::config::{Thresholds, ToneConfig};
use crate::constants::{
    MAX_CYCLE_MS, MAX_DUTY_CYCLE, MIN_CYCLE_MS, MIN_DUTY_CYCLE, MIN_PULSE_MS, NYQUIST_MARGIN,
};
use crate::error::{Result, VarioError};
use crate::tone::{ToneMapping, ToneParameters};

/// Audible state of the variometer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneState {
    Silent,
    Climbing,
    Sinking,
}

/// Waveform request for one beep cycle
///
/// A fresh value is produced on every vario update and handed to the
/// synthesizer as-is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub frequency_hz: f64,
    /// Peak amplitude, 0-1
    pub amplitude: f64,
    pub pulse_length_ms: u32,
    pub silence_length_ms: u32,
}

impl ToneSpec {
    /// Total cycle length (pulse + silence) in milliseconds
    pub fn cycle_ms(&self) -> u32 {
        self.pulse_length_ms + self.silence_length_ms
    }

    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms() as u64)
    }

    pub fn is_audible(&self) -> bool {
        self.amplitude > 0.0 && self.pulse_length_ms > 0
    }

    /// No gap between cycles
    pub fn is_continuous(&self) -> bool {
        self.silence_length_ms == 0
    }

    pub fn duty_cycle(&self) -> f64 {
        match self.cycle_ms() {
            0 => 0.0,
            cycle => self.pulse_length_ms as f64 / cycle as f64,
        }
    }
}

/// Maps vertical speed to a [`ToneSpec`]
///
/// A three-state machine with hysteresis decides between silence, the
/// pulsed climb tone and the continuous sink tone:
///
/// - `Silent -> Climbing` when `vario >= climb_on`, back when `vario < climb_off`
/// - `Silent -> Sinking` when `vario <= sink_on`, back when `vario > sink_off`
///
/// While climbing, frequency, cycle length and duty cycle come from the
/// configured [`ToneMapping`]; every derived value is clamped to a safe
/// audio range before it leaves the controller.
pub struct ToneController {
    mapping: ToneMapping,
    thresholds: Thresholds,
    volume: f64,
    max_vario: f64,
    sink_frequency_hz: f64,
    sink_interval_ms: u32,
    idle_interval_ms: u32,
    min_frequency_hz: f64,
    max_frequency_hz: f64,
    state: ToneState,
    current: ToneSpec,
}

impl ToneController {
    /// Create a controller for output at `sample_rate`
    ///
    /// The frequency ceiling is lowered below Nyquist if needed.
    pub fn new(config: &ToneConfig, sample_rate: u32) -> Result<Self> {
        config.validate(sample_rate)?;

        let mapping = match &config.mapping {
            Some(mapping) => ToneMapping::from_config(mapping)?,
            None => ToneMapping::preset(config.curve),
        };

        let max_frequency_hz = config
            .max_frequency_hz
            .min(sample_rate as f64 * NYQUIST_MARGIN);

        let mut controller = Self {
            mapping,
            thresholds: config.thresholds,
            volume: config.volume,
            max_vario: config.max_vario,
            sink_frequency_hz: config.sink_frequency_hz,
            sink_interval_ms: config.sink_interval_ms,
            idle_interval_ms: config.idle_interval_ms,
            min_frequency_hz: config.min_frequency_hz,
            max_frequency_hz,
            state: ToneState::Silent,
            current: ToneSpec {
                frequency_hz: config.min_frequency_hz,
                amplitude: 0.0,
                pulse_length_ms: 0,
                silence_length_ms: config.idle_interval_ms,
            },
        };
        controller.current = controller.silent_spec();
        Ok(controller)
    }

    /// Re-evaluate with the latest vertical speed
    ///
    /// Non-finite input is rejected with `NonFiniteInput`; state and the
    /// current spec are kept so synthesis continues undisturbed.
    pub fn update(&mut self, vario: f64) -> Result<ToneSpec> {
        if !vario.is_finite() {
            return Err(VarioError::NonFiniteInput("vario"));
        }

        let next = self.next_state(vario);
        if next != self.state {
            log::debug!("Tone state {:?} -> {:?} at {:+.2} m/s", self.state, next, vario);
            self.state = next;
        }

        self.current = match next {
            ToneState::Silent => self.silent_spec(),
            ToneState::Climbing => self.climb_spec(vario),
            ToneState::Sinking => self.sink_spec(),
        };
        Ok(self.current)
    }

    fn next_state(&self, vario: f64) -> ToneState {
        let t = &self.thresholds;
        match self.state {
            ToneState::Silent if vario >= t.climb_on => ToneState::Climbing,
            ToneState::Silent if vario <= t.sink_on => ToneState::Sinking,
            ToneState::Silent => ToneState::Silent,

            ToneState::Climbing if vario >= t.climb_off => ToneState::Climbing,
            ToneState::Climbing if vario <= t.sink_on => ToneState::Sinking,
            ToneState::Climbing => ToneState::Silent,

            ToneState::Sinking if vario <= t.sink_off => ToneState::Sinking,
            ToneState::Sinking if vario >= t.climb_on => ToneState::Climbing,
            ToneState::Sinking => ToneState::Silent,
        }
    }

    fn silent_spec(&self) -> ToneSpec {
        ToneSpec {
            frequency_hz: self.baseline_frequency(),
            amplitude: 0.0,
            pulse_length_ms: 0,
            silence_length_ms: self.idle_interval_ms,
        }
    }

    fn sink_spec(&self) -> ToneSpec {
        ToneSpec {
            frequency_hz: self.clamp_frequency(self.sink_frequency_hz),
            amplitude: self.volume,
            pulse_length_ms: self.sink_interval_ms.max(MIN_PULSE_MS),
            silence_length_ms: 0,
        }
    }

    fn climb_spec(&self, vario: f64) -> ToneSpec {
        let ToneParameters {
            frequency_hz,
            cycle_ms,
            duty,
        } = self.mapping.evaluate(vario.clamp(0.0, self.max_vario));

        let cycle_ms = finite_or(cycle_ms, MAX_CYCLE_MS as f64)
            .clamp(MIN_CYCLE_MS as f64, MAX_CYCLE_MS as f64)
            .round() as u32;
        let duty = finite_or(duty, MIN_DUTY_CYCLE).clamp(MIN_DUTY_CYCLE, MAX_DUTY_CYCLE);
        let pulse_ms = ((cycle_ms as f64 * duty).round() as u32)
            .max(MIN_PULSE_MS)
            .min(cycle_ms);

        ToneSpec {
            frequency_hz: self.clamp_frequency(frequency_hz),
            amplitude: self.volume,
            pulse_length_ms: pulse_ms,
            silence_length_ms: cycle_ms - pulse_ms,
        }
    }

    fn baseline_frequency(&self) -> f64 {
        self.clamp_frequency(self.mapping.frequency.value_at(0.0))
    }

    fn clamp_frequency(&self, frequency_hz: f64) -> f64 {
        finite_or(frequency_hz, self.min_frequency_hz)
            .clamp(self.min_frequency_hz, self.max_frequency_hz)
    }

    pub fn state(&self) -> ToneState {
        self.state
    }

    /// Spec produced by the most recent successful update
    pub fn current(&self) -> ToneSpec {
        self.current
    }

    /// Spec for zero vertical speed (silent, baseline frequency)
    pub fn baseline(&self) -> ToneSpec {
        self.silent_spec()
    }

    /// Set the output amplitude, 0-1; applies from the next update
    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !volume.is_finite() {
            return Err(VarioError::NonFiniteInput("volume"));
        }
        self.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn reset(&mut self) {
        self.state = ToneState::Silent;
        self.current = self.silent_spec();
    }
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}
