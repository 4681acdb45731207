use serde_json::json;

use super::{Formatter, VarioOutput, iso8601_timestamp, state_name};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, output: &VarioOutput) -> String {
        let r = &output.reading;
        json!({
            "ts": iso8601_timestamp(),
            "timestamp_us": r.timestamp_us,
            "pressure_hpa": r.pressure_hpa,
            "temperature_c": r.temperature_c,
            "altitude": r.altitude_m,
            "vario": r.vario_mps,
            "tone": state_name(output.state),
            "frequency_hz": output.frequency_hz,
        })
        .to_string()
    }
}
