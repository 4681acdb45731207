use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, bounded};

use super::sink::ChannelSink;
use crate::config::{AudioConfig, SampleFormat};
use crate::constants::MAX_CYCLE_MS;
use crate::error::{Result, VarioError};

/// Pulls queued blocks into device-sized callback buffers
///
/// Whatever the queue cannot supply is zero-filled and counted as an
/// underrun. While the stop flag is set the queue is drained and only
/// silence goes out.
pub struct BlockFeeder {
    rx: Receiver<Vec<f32>>,
    stop: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
    pending: Vec<f32>,
    position: usize,
}

impl BlockFeeder {
    pub fn new(rx: Receiver<Vec<f32>>, stop: Arc<AtomicBool>) -> Self {
        Self {
            rx,
            stop,
            underruns: Arc::new(AtomicU64::new(0)),
            pending: Vec::new(),
            position: 0,
        }
    }

    pub fn underrun_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.underruns)
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        if self.stop.load(Ordering::Relaxed) {
            while self.rx.try_recv().is_ok() {}
            self.pending.clear();
            self.position = 0;
            out.fill(0.0);
            return;
        }

        let mut written = 0;
        while written < out.len() {
            if self.position >= self.pending.len() {
                match self.rx.try_recv() {
                    Ok(block) => {
                        self.pending = block;
                        self.position = 0;
                        continue;
                    }
                    Err(_) => {
                        out[written..].fill(0.0);
                        self.underruns.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }
            }

            let n = (out.len() - written).min(self.pending.len() - self.position);
            out[written..written + n]
                .copy_from_slice(&self.pending[self.position..self.position + n]);
            written += n;
            self.position += n;
        }
    }
}

/// Playback on the default output device
pub struct AudioOutput {
    stream: cpal::Stream,
    underruns: Arc<AtomicU64>,
}

impl AudioOutput {
    /// Open the device with its own block queue
    ///
    /// The returned sink feeds the device. The stream itself stays with the
    /// caller's thread, only the sink moves to the tone player.
    pub fn open(config: &AudioConfig, stop: Arc<AtomicBool>) -> Result<(Self, ChannelSink)> {
        let (tx, rx) = bounded(queue_capacity(config));
        let output = Self::new(config, rx, stop)?;
        Ok((output, ChannelSink::new(tx)))
    }

    pub fn new(config: &AudioConfig, rx: Receiver<Vec<f32>>, stop: Arc<AtomicBool>) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| VarioError::AudioDevice("No output device found".into()))?;

        match device.description() {
            Ok(desc) => log::info!("Output device: {:?}", desc),
            Err(_) => log::info!("Output device: Unknown"),
        }

        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.buffer_frames as u32),
        };

        let mut feeder = BlockFeeder::new(rx, stop);
        let underruns = feeder.underrun_counter();
        let err_fn = |err: cpal::StreamError| log::error!("Audio stream error: {}", err);

        let stream = match config.sample_format {
            SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| feeder.fill(data),
                err_fn,
                None,
            ),
            SampleFormat::I16 => {
                let mut scratch: Vec<f32> = Vec::new();
                device.build_output_stream(
                    &stream_config,
                    move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                        scratch.resize(data.len(), 0.0);
                        feeder.fill(&mut scratch);
                        for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                            *out = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        }
                    },
                    err_fn,
                    None,
                )
            }
        }
        .map_err(|e| VarioError::AudioStream(format!("{}", e)))?;

        stream
            .play()
            .map_err(|e| VarioError::AudioStream(format!("{}", e)))?;

        Ok(Self { stream, underruns })
    }

    /// Callbacks that could not be filled completely
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        let _ = self.stream.pause();
    }
}

/// Blocks needed for one longest beep cycle plus configured headroom
pub fn queue_capacity(config: &AudioConfig) -> usize {
    let cycle_frames = MAX_CYCLE_MS as usize * config.sample_rate as usize / 1000;
    cycle_frames.div_ceil(config.buffer_frames) + config.queue_depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::Sender;

    fn feeder() -> (Sender<Vec<f32>>, Arc<AtomicBool>, BlockFeeder) {
        let (tx, rx) = bounded(8);
        let stop = Arc::new(AtomicBool::new(false));
        let feeder = BlockFeeder::new(rx, Arc::clone(&stop));
        (tx, stop, feeder)
    }

    #[test]
    fn test_feeder_spans_blocks() {
        let (tx, _stop, mut feeder) = feeder();
        tx.send(vec![1.0; 3]).unwrap();
        tx.send(vec![2.0; 3]).unwrap();

        let mut out = [9.0f32; 4];
        feeder.fill(&mut out);
        assert_eq!(out, [1.0, 1.0, 1.0, 2.0]);

        feeder.fill(&mut out);
        assert_eq!(out, [2.0, 2.0, 0.0, 0.0]);
        assert_eq!(feeder.underrun_counter().load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_feeder_stop_drains_queue() {
        let (tx, stop, mut feeder) = feeder();
        tx.send(vec![1.0; 4]).unwrap();
        tx.send(vec![1.0; 4]).unwrap();

        stop.store(true, Ordering::Relaxed);
        let mut out = [9.0f32; 4];
        feeder.fill(&mut out);
        assert_eq!(out, [0.0; 4]);
        assert!(tx.is_empty());

        stop.store(false, Ordering::Relaxed);
        tx.send(vec![0.5; 4]).unwrap();
        feeder.fill(&mut out);
        assert_eq!(out, [0.5; 4]);
    }

    #[test]
    fn test_queue_capacity_covers_longest_cycle() {
        let config = AudioConfig::default();
        // 2 s at 48 kHz in 1024-frame blocks
        assert_eq!(queue_capacity(&config), 94 + config.queue_depth);
    }
}
