mod csv;
mod json;
mod text;

use chrono::Utc;

use crate::processing::VarioReading;
use crate::tone::{ToneSpec, ToneState};

pub use self::csv::CsvFormatter;
pub use self::json::JsonFormatter;
pub use self::text::TextFormatter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// One line of variometer output
pub struct VarioOutput {
    pub reading: VarioReading,
    pub state: ToneState,
    /// Tone frequency while audible
    pub frequency_hz: Option<f64>,
}

impl VarioOutput {
    pub fn new(reading: VarioReading, state: ToneState, spec: &ToneSpec) -> Self {
        Self {
            reading,
            state,
            frequency_hz: spec.is_audible().then_some(spec.frequency_hz),
        }
    }
}

pub trait Formatter: Send {
    fn format(&self, output: &VarioOutput) -> String;

    fn header(&self) -> Option<&'static str> {
        None
    }
}

pub fn create_formatter(format: OutputFormat, verbose: bool) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter::new(verbose)),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

pub fn iso8601_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub(crate) fn state_name(state: ToneState) -> &'static str {
    match state {
        ToneState::Silent => "silent",
        ToneState::Climbing => "climbing",
        ToneState::Sinking => "sinking",
    }
}
