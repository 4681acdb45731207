use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use super::handoff::VarioHandle;
use super::sink::AudioSink;
use super::synth::WaveformSynthesizer;
use crate::config::VarioConfig;
use crate::error::{Result, VarioError};
use crate::tone::{PulseScheduler, ToneController, ToneState};

enum Command {
    Stop(bool),
    Volume(f64),
    Shutdown,
}

/// Background tone generation
///
/// The player thread owns the tone controller, the synthesizer and the
/// sink. At every cycle boundary it reads the latest vario from the
/// [`VarioHandle`], renders one full cycle and submits it in
/// `buffer_frames`-sized blocks. Between boundaries it sleeps on its control
/// channel, so commands take effect without waiting for the cycle to end.
pub struct TonePlayer {
    control: Sender<Command>,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    cycles: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl TonePlayer {
    /// Start the player thread
    ///
    /// `stop` is shared with the audio device (if any) so that stopping
    /// silences the output immediately, not just from the next cycle.
    pub fn spawn(
        config: &VarioConfig,
        vario: VarioHandle,
        sink: Box<dyn AudioSink>,
        stop: Arc<AtomicBool>,
    ) -> Result<Self> {
        config.validate()?;
        let controller = ToneController::new(&config.tone, config.audio.sample_rate)?;
        let synth = WaveformSynthesizer::from_config(&config.audio, &config.tone);

        let (control, rx) = unbounded();
        let state = Arc::new(AtomicU8::new(encode_state(ToneState::Silent)));
        let cycles = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            controller,
            synth,
            scheduler: PulseScheduler::new(),
            sink,
            vario,
            rx,
            stop: Arc::clone(&stop),
            state: Arc::clone(&state),
            cycles: Arc::clone(&cycles),
            block_len: config.audio.buffer_frames * config.audio.channels as usize,
            rt_buffer_frames: config.audio.buffer_frames as u32,
            sample_rate: config.audio.sample_rate,
            sink_failed: false,
        };

        let thread = std::thread::Builder::new()
            .name("tone-player".into())
            .spawn(move || worker.run())
            .map_err(|e| VarioError::AudioStream(format!("Failed to spawn tone player: {}", e)))?;

        Ok(Self {
            control,
            stop,
            state,
            cycles,
            thread: Some(thread),
        })
    }

    /// Silence (true) or resume (false) the tone
    ///
    /// Calling it repeatedly with the same value has no further effect.
    pub fn set_stop(&self, stopped: bool) {
        if self.stop.swap(stopped, Ordering::Relaxed) != stopped {
            log::info!("Tone {}", if stopped { "stopped" } else { "resumed" });
            let _ = self.control.send(Command::Stop(stopped));
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: f64) {
        let _ = self.control.send(Command::Volume(volume));
    }

    /// Tone state as of the last rendered cycle
    pub fn state(&self) -> ToneState {
        decode_state(self.state.load(Ordering::Relaxed))
    }

    /// Cycles rendered so far
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Stop the thread and wait for it; the sink is finished on the way out
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.control.send(Command::Shutdown);
            if thread.join().is_err() {
                log::error!("Tone player thread panicked");
            }
        }
    }
}

impl Drop for TonePlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    controller: ToneController,
    synth: WaveformSynthesizer,
    scheduler: PulseScheduler,
    sink: Box<dyn AudioSink>,
    vario: VarioHandle,
    rx: Receiver<Command>,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    cycles: Arc<AtomicU64>,
    block_len: usize,
    rt_buffer_frames: u32,
    sample_rate: u32,
    sink_failed: bool,
}

impl Worker {
    fn run(mut self) {
        let _rt_handle = match audio_thread_priority::promote_current_thread_to_real_time(
            self.rt_buffer_frames,
            self.sample_rate,
        ) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("Could not set real-time priority: {}", e);
                None
            }
        };

        let mut stopped = self.stop.load(Ordering::Relaxed);
        if !stopped {
            self.scheduler.start(Instant::now());
        }

        let mut buffer = Vec::new();
        loop {
            let command = match (stopped, self.scheduler.deadline()) {
                (false, Some(deadline)) => self.rx.recv_deadline(deadline),
                _ => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match command {
                Ok(Command::Stop(true)) => {
                    if !stopped {
                        stopped = true;
                        self.scheduler.cancel();
                        self.synth.stop();
                        self.controller.reset();
                        self.state
                            .store(encode_state(ToneState::Silent), Ordering::Relaxed);
                    }
                }
                Ok(Command::Stop(false)) => {
                    if stopped {
                        stopped = false;
                        self.scheduler.start(Instant::now());
                    }
                }
                Ok(Command::Volume(volume)) => {
                    if let Err(e) = self.controller.set_volume(volume) {
                        log::warn!("Ignoring volume change: {}", e);
                    }
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => self.play_cycle(&mut buffer),
            }
        }

        if let Err(e) = self.sink.finish() {
            log::warn!("Audio sink did not close cleanly: {}", e);
        }
        log::debug!(
            "Tone player exiting after {} cycles",
            self.cycles.load(Ordering::Relaxed)
        );
    }

    fn play_cycle(&mut self, buffer: &mut Vec<f32>) {
        let now = Instant::now();

        let spec = match self.vario.latest() {
            Some(vario) => self.controller.update(vario).unwrap_or_else(|e| {
                log::debug!("Keeping previous tone: {}", e);
                self.controller.current()
            }),
            None => self.controller.current(),
        };
        self.state
            .store(encode_state(self.controller.state()), Ordering::Relaxed);

        buffer.clear();
        self.synth.render_into(&spec, buffer);

        for block in buffer.chunks(self.block_len.max(1)) {
            match self.sink.submit(block) {
                Ok(()) if self.sink_failed => {
                    log::info!("Audio sink recovered");
                    self.sink_failed = false;
                }
                Ok(()) => {}
                Err(e) => {
                    if !self.sink_failed {
                        log::warn!("Audio sink failed, continuing silently: {}", e);
                        self.sink_failed = true;
                    }
                    break;
                }
            }
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.scheduler.advance(spec.cycle(), now);
    }
}

fn encode_state(state: ToneState) -> u8 {
    match state {
        ToneState::Silent => 0,
        ToneState::Climbing => 1,
        ToneState::Sinking => 2,
    }
}

fn decode_state(value: u8) -> ToneState {
    match value {
        1 => ToneState::Climbing,
        2 => ToneState::Sinking,
        _ => ToneState::Silent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_encoding() {
        for state in [ToneState::Silent, ToneState::Climbing, ToneState::Sinking] {
            assert_eq!(decode_state(encode_state(state)), state);
        }
    }
}
