use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use variotone::audio::{WavSink, render_timeline};
use variotone::config::{CurveKind, SampleFormat, VarioConfig};
use variotone::tone::ToneState;

#[derive(Parser, Debug)]
#[command(name = "render_tones")]
#[command(about = "Render variometer tones for a vario sweep or fixed values to WAV")]
struct Args {
    /// Output WAV file
    #[arg(short, long, default_value = "tones.wav")]
    output: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tone curve preset
    #[arg(long, value_enum)]
    curve: Option<CurveKind>,

    /// Comma-separated vario values (m/s), each held for --hold seconds.
    /// Overrides the sweep.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    values: Vec<f64>,

    /// Sweep start (m/s)
    #[arg(long, default_value_t = -4.0, allow_hyphen_values = true)]
    from: f64,

    /// Sweep end (m/s)
    #[arg(long, default_value_t = 6.0, allow_hyphen_values = true)]
    to: f64,

    /// Sweep step (m/s)
    #[arg(long, default_value_t = 0.5)]
    step: f64,

    /// Seconds each value is held
    #[arg(long, default_value_t = 2.0)]
    hold: f64,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Sample encoding
    #[arg(long, value_enum)]
    sample_format: Option<SampleFormat>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn sweep_values(from: f64, to: f64, step: f64) -> anyhow::Result<Vec<f64>> {
    if !(step > 0.0) {
        anyhow::bail!("Sweep step must be positive");
    }
    let direction = if to >= from { 1.0 } else { -1.0 };
    let count = ((to - from).abs() / step).floor() as usize;
    Ok((0..=count)
        .map(|i| from + direction * step * i as f64)
        .collect())
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
        Some(path) => VarioConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VarioConfig::default(),
    };
    if let Some(curve) = args.curve {
        config.tone.curve = curve;
        config.tone.mapping = None;
    }
    if let Some(rate) = args.sample_rate {
        config.audio.sample_rate = rate;
    }
    if let Some(format) = args.sample_format {
        config.audio.sample_format = format;
    }
    config.validate().context("Invalid configuration")?;

    let values = if args.values.is_empty() {
        sweep_values(args.from, args.to, args.step)?
    } else {
        args.values.clone()
    };
    let timeline: Vec<(f64, f64)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64 * args.hold, v))
        .collect();
    let duration = values.len() as f64 * args.hold;

    let mut sink = WavSink::create(
        &args.output,
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.sample_format,
    )?;
    let cycles = render_timeline(&config, &timeline, duration, &mut sink)?;

    println!("{:>8}  {:>9}  {:>8}  {:>9}  {:>10}", "vario", "state", "freq", "cycle", "duty");
    for &(t, v) in &timeline {
        let Some(cycle) = cycles
            .iter()
            .filter(|c| c.start_secs >= t)
            .find(|c| c.vario == Some(v))
        else {
            continue;
        };
        let state = match cycle.state {
            ToneState::Silent => "silent",
            ToneState::Climbing => "climbing",
            ToneState::Sinking => "sinking",
        };
        println!(
            "{:>+8.2}  {:>9}  {:>5.0} Hz  {:>6} ms  {:>9.0}%",
            v,
            state,
            cycle.spec.frequency_hz,
            cycle.spec.cycle_ms(),
            cycle.spec.duty_cycle() * 100.0
        );
    }

    println!(
        "\nWrote {} cycles ({:.1}s) to {}",
        cycles.len(),
        duration,
        args.output.display()
    );
    Ok(())
}
