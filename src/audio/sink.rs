use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crossbeam_channel::{Sender, TrySendError};
use hound::{WavSpec, WavWriter};

use crate::config::SampleFormat;
use crate::error::{Result, VarioError};

use super::synth::to_i16;

/// Destination for rendered PCM blocks (interleaved `f32`)
pub trait AudioSink: Send {
    fn submit(&mut self, block: &[f32]) -> Result<()>;

    /// Flush and close; further submits may fail
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Hands blocks to another thread over a bounded channel
///
/// Never blocks: when the receiver falls behind the block is dropped and
/// counted as an overrun.
pub struct ChannelSink {
    tx: Sender<Vec<f32>>,
    overruns: u64,
}

impl ChannelSink {
    pub fn new(tx: Sender<Vec<f32>>) -> Self {
        Self { tx, overruns: 0 }
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}

impl AudioSink for ChannelSink {
    fn submit(&mut self, block: &[f32]) -> Result<()> {
        match self.tx.try_send(block.to_vec()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.overruns += 1;
                if self.overruns.is_power_of_two() {
                    log::warn!("Audio queue full, {} blocks dropped", self.overruns);
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                Err(VarioError::AudioStream("audio receiver dropped".into()))
            }
        }
    }
}

/// Writes blocks to a WAV file
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    format: SampleFormat,
    frames_written: u64,
    channels: u16,
}

impl WavSink {
    pub fn create<P: AsRef<Path>>(
        path: P,
        sample_rate: u32,
        channels: u16,
        format: SampleFormat,
    ) -> Result<Self> {
        let spec = match format {
            SampleFormat::F32 => WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
            SampleFormat::I16 => WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        };

        let writer = WavWriter::create(path.as_ref(), spec)?;
        log::info!(
            "Writing {} Hz {:?} audio to {}",
            sample_rate,
            format,
            path.as_ref().display()
        );

        Ok(Self {
            writer: Some(writer),
            format,
            frames_written: 0,
            channels,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl AudioSink for WavSink {
    fn submit(&mut self, block: &[f32]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| VarioError::AudioStream("WAV sink already finished".into()))?;

        match self.format {
            SampleFormat::F32 => {
                for &sample in block {
                    writer.write_sample(sample)?;
                }
            }
            SampleFormat::I16 => {
                for sample in to_i16(block) {
                    writer.write_sample(sample)?;
                }
            }
        }

        self.frames_written += (block.len() / self.channels.max(1) as usize) as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            log::info!("WAV file closed after {} frames", self.frames_written);
        }
        Ok(())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("Failed to finalize WAV file: {}", e);
        }
    }
}

/// Collects everything in memory
#[derive(Default)]
pub struct VecSink {
    samples: Vec<f32>,
    blocks: usize,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSink for VecSink {
    fn submit(&mut self, block: &[f32]) -> Result<()> {
        self.samples.extend_from_slice(block);
        self.blocks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_channel_sink_overrun_does_not_block() {
        let (tx, rx) = bounded(2);
        let mut sink = ChannelSink::new(tx);

        for _ in 0..5 {
            sink.submit(&[0.5; 16]).unwrap();
        }
        assert_eq!(sink.overruns(), 3);
        assert_eq!(rx.len(), 2);
    }

    #[test]
    fn test_channel_sink_disconnected() {
        let (tx, rx) = bounded(2);
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        assert!(matches!(
            sink.submit(&[0.0; 4]),
            Err(VarioError::AudioStream(_))
        ));
    }

    #[test]
    fn test_wav_sink_i16() {
        let path = std::env::temp_dir().join(format!("variotone_sink_{}.wav", std::process::id()));
        {
            let mut sink = WavSink::create(&path, 48000, 2, SampleFormat::I16).unwrap();
            sink.submit(&[0.0, 0.0, 1.0, 1.0, -1.0, -1.0]).unwrap();
            assert_eq!(sink.frames_written(), 3);
            sink.finish().unwrap();
            assert!(sink.submit(&[0.0, 0.0]).is_err());
        }

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 0, 32767, 32767, -32767, -32767]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_vec_sink() {
        let mut sink = VecSink::new();
        sink.submit(&[1.0, 2.0]).unwrap();
        sink.submit(&[3.0]).unwrap();
        assert_eq!(sink.blocks(), 2);
        assert_eq!(sink.into_samples(), vec![1.0, 2.0, 3.0]);
    }
}
