use super::{Formatter, VarioOutput, iso8601_timestamp, state_name};

pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format(&self, output: &VarioOutput) -> String {
        let r = &output.reading;
        let frequency = output
            .frequency_hz
            .map_or(String::new(), |f| format!("{:.1}", f));
        format!(
            "{},{},{:.2},{:.1},{:.2},{:.3},{},{}",
            iso8601_timestamp(),
            r.timestamp_us,
            r.pressure_hpa,
            r.temperature_c,
            r.altitude_m,
            r.vario_mps,
            state_name(output.state),
            frequency
        )
    }

    fn header(&self) -> Option<&'static str> {
        Some("ts,timestamp_us,pressure_hpa,temperature_c,altitude_m,vario_mps,tone,frequency_hz")
    }
}
