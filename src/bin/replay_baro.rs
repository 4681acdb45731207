use std::path::{Path, PathBuf};

use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;

use variotone::config::{FilterConfig, VarioConfig};
use variotone::sensor::{CsvReplaySource, PressureSource};
use variotone::tone::{ToneController, ToneState};
use variotone::VarioProcessor;

#[derive(Parser, Debug)]
#[command(name = "replay_baro")]
#[command(about = "Replay barometer logs through the estimator and summarize them", long_about = None)]
struct Args {
    /// CSV logs to replay (pressure_pa,temperature_c,timestamp_us)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Estimator process noise
    #[arg(long)]
    accel_variance: Option<f64>,

    /// Estimator altitude measurement noise
    #[arg(long)]
    measurement_variance: Option<f64>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
struct ToneTime {
    silent_secs: f64,
    climbing_secs: f64,
    sinking_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
struct FileSummary {
    file: String,
    samples: usize,
    dropped: u64,
    duration_secs: f64,
    altitude_gain_m: f64,
    vario: Option<StatsSummary>,
    sample_interval_ms: Option<StatsSummary>,
    tone: ToneTime,
}

fn replay(path: &Path, config: &VarioConfig) -> anyhow::Result<FileSummary> {
    let mut source = CsvReplaySource::new(path)?;
    let mut processor = VarioProcessor::new(&config.filter)?;
    let mut tone = ToneController::new(&config.tone, config.audio.sample_rate)?;

    let mut vario_stats: Stats<f64> = Stats::new();
    let mut interval_stats: Stats<f64> = Stats::new();
    let mut tone_time = ToneTime::default();
    let mut samples = 0;
    let mut first = None;
    let mut last = None;

    while let Some(sample) = source.next_sample()? {
        samples += 1;
        let Ok(reading) = processor.ingest(&sample) else {
            continue;
        };

        // dt is zero for samples that (re)seed the filters
        if reading.dt_secs > 0.0 {
            vario_stats.update(reading.vario_mps);
            interval_stats.update(reading.dt_secs * 1000.0);

            let slot = match tone.state() {
                ToneState::Silent => &mut tone_time.silent_secs,
                ToneState::Climbing => &mut tone_time.climbing_secs,
                ToneState::Sinking => &mut tone_time.sinking_secs,
            };
            *slot += reading.dt_secs;
        }
        tone.update(reading.vario_mps)?;

        first.get_or_insert(reading);
        last = Some(reading);
    }

    let (duration_secs, altitude_gain_m) = match (first, last) {
        (Some(a), Some(b)) => (
            (b.timestamp_us - a.timestamp_us) as f64 / 1e6,
            b.altitude_m - a.altitude_m,
        ),
        _ => (0.0, 0.0),
    };

    Ok(FileSummary {
        file: path.display().to_string(),
        samples,
        dropped: processor.dropped_samples(),
        duration_secs,
        altitude_gain_m,
        vario: StatsSummary::from_stats(&vario_stats),
        sample_interval_ms: StatsSummary::from_stats(&interval_stats),
        tone: tone_time,
    })
}

fn print_text(results: &[FileSummary], filter: &FilterConfig) {
    println!(
        "Estimator: accel variance {:.3}, measurement variance {:.3}",
        filter.accel_variance, filter.measurement_variance
    );
    for r in results {
        println!("\n{}", r.file);
        println!(
            "  samples: {} ({} dropped), {:.1}s, altitude gain {:+.1} m",
            r.samples, r.dropped, r.duration_secs, r.altitude_gain_m
        );
        if let Some(v) = &r.vario {
            println!(
                "  vario: mean {:+.2} m/s, std {:.2}, min {:+.2}, max {:+.2}",
                v.mean, v.std_dev, v.min, v.max
            );
        }
        if let Some(i) = &r.sample_interval_ms {
            println!(
                "  interval: mean {:.1} ms, std {:.1}, min {:.1}, max {:.1}",
                i.mean, i.std_dev, i.min, i.max
            );
        }
        println!(
            "  tone: silent {:.1}s, climbing {:.1}s, sinking {:.1}s",
            r.tone.silent_secs, r.tone.climbing_secs, r.tone.sinking_secs
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => VarioConfig::from_toml_file(path)?,
        None => VarioConfig::default(),
    };
    if let Some(q) = args.accel_variance {
        config.filter.accel_variance = q;
    }
    if let Some(r) = args.measurement_variance {
        config.filter.measurement_variance = r;
    }
    config.validate()?;

    let mut results = Vec::new();
    for path in &args.files {
        match replay(path, &config) {
            Ok(summary) => results.push(summary),
            Err(e) => log::error!("{}: {:#}", path.display(), e),
        }
    }

    match args.format {
        OutputFormat::Text => print_text(&results, &config.filter),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
    }

    Ok(())
}
