use std::f64::consts::TAU;

use crate::config::{AudioConfig, ToneConfig};
use crate::tone::ToneSpec;

/// Sine tone generator with a linear attack/release envelope
///
/// Phase and envelope level persist across calls, so consecutive cycles join
/// without a discontinuity even when the frequency changes between them.
/// Output is interleaved to the configured channel count (same sample on
/// every channel).
pub struct WaveformSynthesizer {
    sample_rate: u32,
    channels: u16,
    phase: f64,
    level: f64,
    ramp_step: f64,
    ramp_frames: usize,
    /// Thousandths of a frame owed by earlier cycles
    frame_remainder: u64,
}

impl WaveformSynthesizer {
    pub fn new(sample_rate: u32, channels: u16, envelope_ms: f64) -> Self {
        let ramp_frames = ((envelope_ms * sample_rate as f64 / 1000.0).round() as usize).max(1);
        Self {
            sample_rate,
            channels: channels.max(1),
            phase: 0.0,
            level: 0.0,
            ramp_step: 1.0 / ramp_frames as f64,
            ramp_frames,
            frame_remainder: 0,
        }
    }

    pub fn from_config(audio: &AudioConfig, tone: &ToneConfig) -> Self {
        Self::new(audio.sample_rate, audio.channels, tone.envelope_ms)
    }

    /// Render one full cycle (pulse followed by silence)
    pub fn render(&mut self, spec: &ToneSpec) -> Vec<f32> {
        let mut out = Vec::new();
        self.render_into(spec, &mut out);
        out
    }

    /// Like [`render`](Self::render), appending to `out`
    pub fn render_into(&mut self, spec: &ToneSpec, out: &mut Vec<f32>) {
        let cycle_frames = self.cycle_frames(spec.cycle_ms());
        let gate_frames = if !spec.is_audible() {
            0
        } else if spec.is_continuous() {
            cycle_frames
        } else {
            // Release has to finish before the pulse ends
            let pulse_frames = self.ms_to_frames(spec.pulse_length_ms);
            pulse_frames - self.ramp_frames.min(pulse_frames / 2)
        };

        out.reserve(cycle_frames * self.channels as usize);
        for frame in 0..cycle_frames {
            let target = if frame < gate_frames { spec.amplitude } else { 0.0 };
            self.push_frame(spec.frequency_hz, target, out);
        }
    }

    /// Render `frames` frames with the gate held open for audible specs
    pub fn render_frames(&mut self, spec: &ToneSpec, frames: usize) -> Vec<f32> {
        let target = if spec.is_audible() { spec.amplitude } else { 0.0 };
        let mut out = Vec::with_capacity(frames * self.channels as usize);
        for _ in 0..frames {
            self.push_frame(spec.frequency_hz, target, &mut out);
        }
        out
    }

    fn push_frame(&mut self, frequency_hz: f64, target: f64, out: &mut Vec<f32>) {
        if self.level < target {
            self.level = (self.level + self.ramp_step).min(target);
        } else if self.level > target {
            self.level = (self.level - self.ramp_step).max(target);
        }

        let sample = if self.level > 0.0 {
            (self.phase.sin() * self.level) as f32
        } else {
            0.0
        };
        for _ in 0..self.channels {
            out.push(sample);
        }

        self.phase = (self.phase + TAU * frequency_hz / self.sample_rate as f64).rem_euclid(TAU);
    }

    fn ms_to_frames(&self, ms: u32) -> usize {
        (ms as u64 * self.sample_rate as u64 / 1000) as usize
    }

    /// Frames for one cycle, carrying the fractional frame into the next
    /// so that consecutive cycles add up to their wall-clock length
    fn cycle_frames(&mut self, ms: u32) -> usize {
        let total = ms as u64 * self.sample_rate as u64 + self.frame_remainder;
        self.frame_remainder = total % 1000;
        (total / 1000) as usize
    }

    /// Hard stop: envelope and phase back to zero
    pub fn stop(&mut self) {
        self.level = 0.0;
        self.phase = 0.0;
        self.frame_remainder = 0;
    }

    /// Oscillator phase in radians, `[0, 2π)`
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Current envelope gain
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Convert float samples in [-1, 1] to 16-bit PCM
pub fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}
