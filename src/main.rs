use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use variotone::audio::{AudioOutput, TonePlayer, VarioHandle, WavSink, render_timeline};
use variotone::config::{CurveKind, VarioConfig};
use variotone::output::{OutputFormat, VarioOutput, create_formatter};
use variotone::sensor::{CsvReplaySource, PressureSource};
use variotone::tone::ToneController;
use variotone::VarioProcessor;

#[derive(Parser, Debug)]
#[command(name = "variotone")]
#[command(about = "Barometric variometer with audio climb/sink tones", long_about = None)]
struct Args {
    /// Recorded log to replay (pressure_pa,temperature_c,timestamp_us)
    #[arg(short, long, conflicts_with = "simulate")]
    input: Option<PathBuf>,

    /// Fly a simulated profile instead of reading a log
    #[arg(long)]
    simulate: bool,

    /// TOML flight profile for --simulate
    #[arg(long, requires = "simulate")]
    profile: Option<PathBuf>,

    /// Seed for the simulated sensor noise
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tone curve preset
    #[arg(long, value_enum)]
    curve: Option<CurveKind>,

    /// Output format: text, json, csv
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Render the tone track to a WAV file instead of playing it
    #[arg(long, conflicts_with = "no_audio")]
    wav: Option<PathBuf>,

    /// Disable audio entirely
    #[arg(long)]
    no_audio: bool,

    /// Pace the replay by sensor timestamps (implied when playing audio)
    #[arg(long)]
    realtime: bool,

    /// Estimator process noise
    #[arg(long)]
    accel_variance: Option<f64>,

    /// Estimator altitude measurement noise
    #[arg(long)]
    measurement_variance: Option<f64>,

    /// Tone volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f64>,

    /// Only print every Nth reading
    #[arg(long, default_value_t = 1)]
    every: usize,
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

    let config = load_config(&args)?;
    let mut source = open_source(&args)?;

    // Keep the device on this thread; only its queue goes to the player
    let vario = VarioHandle::new();
    let mut device = None;
    let mut player = None;
    if args.wav.is_none() && !args.no_audio {
        let stop = Arc::new(AtomicBool::new(false));
        match AudioOutput::open(&config.audio, Arc::clone(&stop)) {
            Ok((output, sink)) => {
                player = Some(TonePlayer::spawn(
                    &config,
                    vario.clone(),
                    Box::new(sink),
                    stop,
                )?);
                device = Some(output);
            }
            Err(e) => log::warn!("Audio output unavailable, continuing silently: {}", e),
        }
    }
    let realtime = args.realtime || player.is_some();

    let mut processor = VarioProcessor::new(&config.filter)?;
    let mut display_tone = ToneController::new(&config.tone, config.audio.sample_rate)?;
    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    let mut timeline = Vec::new();
    let mut first_timestamp = None;
    let mut last_timestamp = None;
    let mut accepted = 0usize;

    while let Some(sample) = source.next_sample()? {
        if realtime {
            if let Some(prev) = last_timestamp {
                let delta = sample.timestamp_us.saturating_sub(prev);
                std::thread::sleep(Duration::from_micros(delta));
            }
        }
        last_timestamp = Some(sample.timestamp_us);

        let Ok(reading) = processor.ingest(&sample) else {
            continue;
        };
        let first = *first_timestamp.get_or_insert(reading.timestamp_us);

        vario.publish(reading.vario_mps);
        let spec = display_tone.update(reading.vario_mps)?;
        if args.wav.is_some() {
            let t = (reading.timestamp_us - first) as f64 / 1e6;
            timeline.push((t, reading.vario_mps));
        }

        if accepted % args.every.max(1) == 0 {
            let output = VarioOutput::new(reading, display_tone.state(), &spec);
            println!("{}", formatter.format(&output));
        }
        accepted += 1;
    }

    if let Some(path) = &args.wav {
        write_wav(path, &config, &timeline)?;
    }

    if let Some(mut player) = player {
        player.shutdown();
        log::info!("Tone player rendered {} cycles", player.cycles());
    }
    if let Some(output) = device {
        log::info!("Audio underruns: {}", output.underruns());
    }

    log::info!(
        "{} samples accepted, {} dropped",
        accepted,
        processor.dropped_samples()
    );
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<VarioConfig> {
    let mut config = match &args.config {
        Some(path) => VarioConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => VarioConfig::default(),
    };

    if let Some(curve) = args.curve {
        config.tone.curve = curve;
        config.tone.mapping = None;
    }
    if let Some(q) = args.accel_variance {
        config.filter.accel_variance = q;
    }
    if let Some(r) = args.measurement_variance {
        config.filter.measurement_variance = r;
    }
    if let Some(volume) = args.volume {
        config.tone.volume = volume;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn open_source(args: &Args) -> anyhow::Result<Box<dyn PressureSource>> {
    if let Some(path) = &args.input {
        return Ok(Box::new(CsvReplaySource::new(path)?));
    }
    if args.simulate {
        return simulated_source(args);
    }
    anyhow::bail!("Nothing to read: pass --input <log.csv> or --simulate")
}

#[cfg(feature = "simulation")]
fn simulated_source(args: &Args) -> anyhow::Result<Box<dyn PressureSource>> {
    use variotone::simulation::{FlightProfile, SimulatedFlight};

    let mut profile = match &args.profile {
        Some(path) => FlightProfile::from_toml_file(path)?,
        None => FlightProfile::default(),
    };
    if let Some(seed) = args.seed {
        profile.seed = Some(seed);
    }
    Ok(Box::new(SimulatedFlight::new(profile)?))
}

#[cfg(not(feature = "simulation"))]
fn simulated_source(_args: &Args) -> anyhow::Result<Box<dyn PressureSource>> {
    anyhow::bail!("Built without the `simulation` feature")
}

fn write_wav(path: &Path, config: &VarioConfig, timeline: &[(f64, f64)]) -> anyhow::Result<()> {
    let duration = timeline.last().map_or(0.0, |&(t, _)| t);
    let mut sink = WavSink::create(
        path,
        config.audio.sample_rate,
        config.audio.channels,
        config.audio.sample_format,
    )?;
    let cycles = render_timeline(config, timeline, duration, &mut sink)?;
    println!(
        "Wrote {} tone cycles ({:.1}s) to {}",
        cycles.len(),
        duration,
        path.display()
    );
    Ok(())
}
