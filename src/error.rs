use thiserror::Error;

#[derive(Error, Debug)]
pub enum VarioError {
    #[error("Invalid time delta: {0:.6}s (must be positive)")]
    InvalidTimeDelta(f64),

    #[error("Invalid noise parameter: {0} (must be positive and finite)")]
    InvalidNoiseParameter(f64),

    #[error("Non-finite input: {0}")]
    NonFiniteInput(&'static str),

    #[error("Invalid pressure: {0} Pa")]
    InvalidPressure(f64),

    #[error("Interpolation curve has no control points")]
    InterpolationDomainEmpty,

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio stream error: {0}")]
    AudioStream(String),

    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, VarioError>;
