use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;

use super::BaroSample;

/// Source of barometer samples
///
/// Platform sensor polling lives outside this crate; anything that can hand
/// over `(pressure, temperature, timestamp)` tuples implements this.
pub trait PressureSource: Send {
    /// Next sample, or `None` when the source is exhausted
    fn next_sample(&mut self) -> anyhow::Result<Option<BaroSample>>;
}

/// Replays a recorded log
///
/// One sample per line: `pressure_pa,temperature_c,timestamp_us`. Blank
/// lines, `#` comments and a non-numeric header line are skipped.
pub struct CsvReplaySource {
    samples: Vec<BaroSample>,
    position: usize,
}

impl CsvReplaySource {
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let samples = Self::read_samples(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        log::info!("Loaded {} samples from {}", samples.len(), path.display());

        Ok(Self {
            samples,
            position: 0,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        Ok(Self {
            samples: Self::read_samples(reader)?,
            position: 0,
        })
    }

    fn read_samples<R: BufRead>(reader: R) -> anyhow::Result<Vec<BaroSample>> {
        let mut samples = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_line(line) {
                Ok(sample) => samples.push(sample),
                // Tolerate a header row
                Err(_) if samples.is_empty() && index == 0 => continue,
                Err(e) => return Err(e.context(format!("line {}", index + 1))),
            }
        }

        Ok(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn parse_line(line: &str) -> anyhow::Result<BaroSample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        anyhow::bail!("expected 3 fields, got {}", fields.len());
    }

    let pressure_pa: f64 = fields[0].parse().context("Invalid pressure")?;
    let temperature_c: f64 = fields[1].parse().context("Invalid temperature")?;
    let timestamp_us: u64 = fields[2].parse().context("Invalid timestamp")?;

    Ok(BaroSample::new(pressure_pa, temperature_c, timestamp_us))
}

impl PressureSource for CsvReplaySource {
    fn next_sample(&mut self) -> anyhow::Result<Option<BaroSample>> {
        let sample = self.samples.get(self.position).copied();
        if sample.is_some() {
            self.position += 1;
        }
        Ok(sample)
    }
}

/// In-memory source, mostly for tests and generated flights
pub struct VecSource {
    samples: std::vec::IntoIter<BaroSample>,
}

impl VecSource {
    pub fn new(samples: Vec<BaroSample>) -> Self {
        Self {
            samples: samples.into_iter(),
        }
    }
}

impl PressureSource for VecSource {
    fn next_sample(&mut self) -> anyhow::Result<Option<BaroSample>> {
        Ok(self.samples.next())
    }
}
