//! Tone synthesis and playback.

pub mod handoff;
pub mod output;
pub mod player;
pub mod sink;
pub mod synth;
pub mod timeline;

pub use handoff::VarioHandle;
pub use output::AudioOutput;
pub use player::TonePlayer;
pub use sink::{AudioSink, ChannelSink, VecSink, WavSink};
pub use synth::{WaveformSynthesizer, to_i16};
pub use timeline::{TimelineCycle, render_timeline};
