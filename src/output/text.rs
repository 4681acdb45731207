use super::{Formatter, VarioOutput, state_name};

pub struct TextFormatter {
    verbose: bool,
}

impl TextFormatter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, output: &VarioOutput) -> String {
        let r = &output.reading;
        if self.verbose {
            let tone = output
                .frequency_hz
                .map_or("-".to_string(), |f| format!("{:.0} Hz", f));
            format!(
                "Vario: {:>+6.2} m/s  Altitude: {:>7.1} m [p: {:.2} hPa, T: {:.1}°C, dt: {:.3}s, tone: {} {}]",
                r.vario_mps,
                r.altitude_m,
                r.pressure_hpa,
                r.temperature_c,
                r.dt_secs,
                state_name(output.state),
                tone
            )
        } else {
            format!(
                "Vario: {:>+6.2} m/s  Altitude: {:>7.1} m",
                r.vario_mps, r.altitude_m
            )
        }
    }
}
