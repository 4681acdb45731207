use super::sink::AudioSink;
use super::synth::WaveformSynthesizer;
use crate::config::VarioConfig;
use crate::error::{Result, VarioError};
use crate::tone::{ToneController, ToneSpec, ToneState};

/// One rendered beep cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineCycle {
    pub start_secs: f64,
    /// Vario the cycle was chosen for, `None` before the first value
    pub vario: Option<f64>,
    pub state: ToneState,
    pub spec: ToneSpec,
}

/// Offline counterpart of the tone player
///
/// Walks `timeline` (`(seconds, vario)` pairs, ascending time) on audio time
/// instead of wall time: at every cycle boundary the most recent value at or
/// before that instant drives the controller, exactly as the live player
/// reads its handoff. Output is deterministic for a given input.
pub fn render_timeline(
    config: &VarioConfig,
    timeline: &[(f64, f64)],
    duration_secs: f64,
    sink: &mut dyn AudioSink,
) -> Result<Vec<TimelineCycle>> {
    config.validate()?;
    if !(duration_secs.is_finite() && duration_secs >= 0.0) {
        return Err(VarioError::NonFiniteInput("timeline duration"));
    }

    let mut controller = ToneController::new(&config.tone, config.audio.sample_rate)?;
    let mut synth = WaveformSynthesizer::from_config(&config.audio, &config.tone);
    let block_len = config.audio.buffer_frames * config.audio.channels as usize;

    let mut cycles = Vec::new();
    let mut buffer = Vec::new();
    let mut next = 0;
    let mut latest = None;
    let mut now = 0.0;

    while now < duration_secs {
        while let Some(&(t, v)) = timeline.get(next) {
            if t > now {
                break;
            }
            if v.is_finite() {
                latest = Some(v);
            }
            next += 1;
        }

        let spec = match latest {
            Some(v) => controller.update(v)?,
            None => controller.current(),
        };

        buffer.clear();
        synth.render_into(&spec, &mut buffer);
        for block in buffer.chunks(block_len.max(1)) {
            sink.submit(block)?;
        }

        cycles.push(TimelineCycle {
            start_secs: now,
            vario: latest,
            state: controller.state(),
            spec,
        });
        now += spec.cycle_ms() as f64 / 1000.0;
    }

    sink.finish()?;
    log::debug!(
        "Rendered {} cycles covering {:.1}s",
        cycles.len(),
        now
    );
    Ok(cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VecSink;

    #[test]
    fn test_timeline_follows_vario() {
        let config = VarioConfig::default();
        let timeline = [(0.0, 0.0), (2.0, 2.0), (4.0, -3.0)];
        let mut sink = VecSink::new();

        let cycles = render_timeline(&config, &timeline, 6.0, &mut sink).unwrap();

        assert_eq!(cycles[0].state, ToneState::Silent);
        assert!(cycles.iter().any(|c| c.state == ToneState::Climbing));
        assert_eq!(cycles.last().unwrap().state, ToneState::Sinking);

        for c in &cycles {
            let expected = match c.vario {
                Some(v) if v >= 0.2 => ToneState::Climbing,
                Some(v) if v <= -2.0 => ToneState::Sinking,
                _ => ToneState::Silent,
            };
            assert_eq!(c.state, expected, "at {:.2}s", c.start_secs);
        }

        let total_ms: u32 = cycles.iter().map(|c| c.spec.cycle_ms()).sum();
        assert_eq!(sink.samples().len(), total_ms as usize * 48);
    }

    #[test]
    fn test_timeline_is_deterministic() {
        let config = VarioConfig::default();
        let timeline: Vec<(f64, f64)> = (0..40).map(|i| (i as f64 * 0.25, i as f64 * 0.1)).collect();

        let mut a = VecSink::new();
        let mut b = VecSink::new();
        render_timeline(&config, &timeline, 10.0, &mut a).unwrap();
        render_timeline(&config, &timeline, 10.0, &mut b).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_empty_timeline_is_silent() {
        let mut sink = VecSink::new();
        let cycles = render_timeline(&VarioConfig::default(), &[], 1.0, &mut sink).unwrap();
        assert!(cycles.iter().all(|c| c.state == ToneState::Silent && c.vario.is_none()));
        assert!(sink.samples().iter().all(|&s| s == 0.0));
    }
}
