use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;

use exg_filters::acquisition::AcquisitionSession;
use exg_filters::config::{load_config, save_config, Config};
use exg_filters::local::{
    encode_ble_capture, encode_serial_capture, read_recording_file, replay_files, window,
    CaptureFormat, CsvRecorder, RecordedColumn, SimulatedSource, SimulationParams,
};
use exg_filters::utils::log::init_logger;
use exg_filters::visualization::{SharedPlotter, SignalPlotter, VisualizationConfig};

#[derive(Parser, Debug)]
#[command(name = "exg-filters")]
#[command(version)]
#[command(about = "Streaming IIR filtering for ExG recordings", long_about = None)]
struct Cli {
    /// YAML session configuration (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter recorded captures (raw serial bytes, `.ble` packets or one-column CSV)
    Replay {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Where to write the filtered CSV recordings
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Generate a synthetic ExG stream and run it through the filter
    Simulate {
        #[arg(short, long, default_value_t = 10.0)]
        seconds: f64,

        /// Also save the raw stream as a capture (`.ble` for BLE packets, serial otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Pace samples in real time and draw the display trace
        #[arg(long)]
        live: bool,

        /// Set a marker every N seconds
        #[arg(long)]
        mark_every: Option<f64>,
    },
    /// Show a recording written by replay or simulate
    View {
        file: PathBuf,

        /// raw or filtered
        #[arg(long, default_value = "filtered")]
        column: RecordedColumn,

        /// Seconds to skip at the start
        #[arg(long, default_value_t = 0.0)]
        drop_start: f64,

        /// Seconds to skip at the end
        #[arg(long, default_value_t = 0.0)]
        drop_end: f64,

        /// Fixed y-limits are +-this many µV
        #[arg(long, default_value_t = 100.0)]
        y_limit: f64,

        /// Number of trace lines to print
        #[arg(long, default_value_t = 40)]
        lines: usize,
    },
    /// Print or write the effective configuration
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Command::Replay { files, output_dir } => replay(&files, &config, output_dir),
        Command::Simulate {
            seconds,
            output,
            seed,
            live,
            mark_every,
        } => simulate(&config, seconds, output.as_deref(), seed, live, mark_every),
        Command::View {
            file,
            column,
            drop_start,
            drop_end,
            y_limit,
            lines,
        } => view(
            &config,
            &file,
            column,
            (drop_start, drop_end),
            y_limit,
            lines,
        ),
        Command::Config { output } => match output {
            Some(path) => {
                save_config(&config, &path)?;
                println!("{} {}", "Wrote".green(), path.display());
                Ok(())
            }
            None => {
                print!("{}", serde_yaml::to_string(&config)?);
                Ok(())
            }
        },
    }
}

// -----------------------------------------------------------------------------
// REPLAY
// -----------------------------------------------------------------------------

fn replay(files: &[PathBuf], config: &Config, output_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let output_dir = output_dir.or_else(|| {
        config
            .session
            .write_to_file
            .then(|| config.session.recordings_dir.clone())
    });

    let plotter = SignalPlotter::shared(config.display.clone());
    let results = replay_files(files, config, output_dir.as_deref(), Some(&plotter));

    let mut failures = 0;
    for (path, result) in files.iter().zip(results) {
        match result {
            Ok(summary) => {
                let target = summary
                    .recording
                    .as_ref()
                    .map(|p| format!(" -> {}", p.display()))
                    .unwrap_or_default();
                println!(
                    "{} {} ({} samples, {} missing, {} dropped frames, {:?}){}",
                    "OK".green(),
                    path.display(),
                    summary.samples,
                    summary.missing,
                    summary.dropped_frames,
                    summary.elapsed,
                    target
                );
            }
            Err(e) => {
                failures += 1;
                eprintln!("{} {}: {}", "FAILED".red(), path.display(), e);
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} captures failed", failures, files.len());
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// SIMULATION
// -----------------------------------------------------------------------------

fn simulate(
    config: &Config,
    seconds: f64,
    output: Option<&Path>,
    seed: u64,
    live: bool,
    mark_every: Option<f64>,
) -> anyhow::Result<()> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--seconds must be positive, got {}", seconds);
    }

    let sampling_rate = config.filter.sampling_rate;
    let params = SimulationParams {
        inamp_gain: config.session.inamp_gain,
        ..SimulationParams::default()
    };
    let samples: Vec<f64> = SimulatedSource::new(params, sampling_rate, seed)
        .take((seconds * sampling_rate).round() as usize)
        .collect();

    if let Some(path) = output {
        let bytes = match CaptureFormat::from_path(path) {
            CaptureFormat::Ble => encode_ble_capture(
                samples.iter().copied(),
                sampling_rate,
                Local::now().naive_local(),
            ),
            CaptureFormat::Serial => encode_serial_capture(samples.iter().copied()),
            CaptureFormat::Csv => bail!("captures are written as serial bytes or .ble packets"),
        };
        fs::write(path, bytes)
            .with_context(|| format!("writing capture to {}", path.display()))?;
        println!("{} {} samples to {}", "Saved".green(), samples.len(), path.display());
    }

    let mut session = AcquisitionSession::from_config(config)?;
    let mut recorder = if config.session.write_to_file {
        Some(CsvRecorder::create(
            &config.session.recordings_dir,
            &config.session.file_prefix,
            Local::now().naive_local(),
        )?)
    } else {
        None
    };

    let plotter = SignalPlotter::shared(config.display.clone());
    let marker_interval = mark_every.map(|s| (s * sampling_rate).round().max(1.0) as usize);
    let period = Duration::from_secs_f64(1.0 / sampling_rate);

    let acquisition = {
        let plotter = SharedPlotter::clone(&plotter);
        thread::spawn(move || -> anyhow::Result<Option<PathBuf>> {
            for (n, raw) in samples.into_iter().enumerate() {
                if marker_interval.is_some_and(|every| n > 0 && n % every == 0) {
                    session.mark();
                }
                let record = session.push_sample(raw);
                if let Some((recorder, _)) = recorder.as_mut() {
                    recorder.record(Local::now().naive_local(), &record)?;
                }
                if let Ok(mut plotter) = plotter.lock() {
                    plotter.push(record.display_uv);
                }
                if live {
                    thread::sleep(period);
                }
            }
            info!(
                "Simulation finished: {} samples, {} missing",
                session.samples_seen(),
                session.missing_seen()
            );
            match recorder {
                Some((mut recorder, path)) => {
                    recorder.flush()?;
                    Ok(Some(path))
                }
                None => Ok(None),
            }
        })
    };

    if live {
        while !acquisition.is_finished() {
            thread::sleep(Duration::from_millis(50));
            if let Ok(plotter) = plotter.lock() {
                if let Some(value) = plotter.latest() {
                    println!("{}", render_trace(value, plotter.y_limits()));
                }
            }
        }
    }

    let recording = match acquisition.join() {
        Ok(result) => result?,
        Err(_) => bail!("acquisition thread panicked"),
    };

    if let Ok(plotter) = plotter.lock() {
        let (low, high) = plotter.y_limits();
        println!(
            "{} {} points on display, y-limits [{:.1}, {:.1}] µV",
            "Done".green(),
            plotter.len(),
            low,
            high
        );
    }
    if let Some(path) = recording {
        println!("{} {}", "Recorded".green(), path.display());
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// VIEW
// -----------------------------------------------------------------------------

fn view(
    config: &Config,
    file: &Path,
    column: RecordedColumn,
    (drop_start, drop_end): (f64, f64),
    y_limit: f64,
    lines: usize,
) -> anyhow::Result<()> {
    if !(y_limit.is_finite() && y_limit > 0.0) {
        bail!("--y-limit must be positive, got {}", y_limit);
    }

    let sampling_rate = config.filter.sampling_rate;
    let rows = read_recording_file(file)
        .with_context(|| format!("reading recording {}", file.display()))?;
    let kept = window(&rows, sampling_rate, drop_start, drop_end);
    if kept.is_empty() {
        bail!(
            "nothing left of {} rows after dropping {}s and {}s",
            rows.len(),
            drop_start,
            drop_end
        );
    }

    let mut plotter = SignalPlotter::new(VisualizationConfig {
        max_datapoints: kept.len(),
        min_buffer_uv: y_limit,
        autoscale: false,
    });
    plotter.extend(kept.iter().map(|row| row.value(column)));
    let limits = plotter.y_limits();

    // x axis starts at drop_start, one sample period per row
    let step = (kept.len() / lines.max(1)).max(1);
    for (i, row) in kept.iter().enumerate().step_by(step) {
        let value = row.value(column);
        if value.is_nan() {
            continue;
        }
        let seconds = drop_start.max(0.0) + i as f64 / sampling_rate;
        let marker = if row.marker { "*".yellow() } else { " ".normal() };
        println!("{:>8.3} s {}{}", seconds, marker, render_trace(value, limits));
    }

    let markers = kept.iter().filter(|row| row.marker).count();
    println!(
        "{} {} {:?} points from {} ({} plotted, {} markers), y-limits [{:.1}, {:.1}] µV",
        "Viewed".green(),
        kept.len(),
        column,
        file.display(),
        plotter.len(),
        markers,
        limits.0,
        limits.1
    );
    Ok(())
}

// One terminal line per frame: bar length follows the value within the y-limits.
fn render_trace(value: f64, (low, high): (f64, f64)) -> String {
    const WIDTH: f64 = 60.0;
    let span = (high - low).max(f64::EPSILON);
    let position = ((value - low) / span * WIDTH).clamp(0.0, WIDTH) as usize;
    let bar = "|".repeat(position);
    let label = format!("{:>10.1} µV ", value);
    if value < low || value > high {
        format!("{}{}", label.red(), bar.red())
    } else {
        format!("{}{}", label.white(), bar.cyan())
    }
}
