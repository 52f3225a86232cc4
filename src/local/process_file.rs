use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use rayon::prelude::*;

use super::recorder::CsvRecorder;
use crate::acquisition::frame::{BLE_RECORD_BYTES, BLE_SAMPLES_PER_PACKET};
use crate::acquisition::{decode_ble_record, AcquisitionSession, BleTimestamps, SerialFrameDecoder};
use crate::config::Config;
use crate::error::{RecordingError, ReplayError};
use crate::filters::NO_DATA;
use crate::visualization::SharedPlotter;

// -----------------------------------------------------------------------------
// CAPTURE INPUT
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// Raw bytes as read off the serial port.
    Serial,
    /// One raw value per row in the first column, header optional.
    Csv,
    /// Timestamped BLE notifications, five readings each.
    Ble,
}

impl CaptureFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => CaptureFormat::Csv,
            Some(ext) if ext.eq_ignore_ascii_case("ble") => CaptureFormat::Ble,
            _ => CaptureFormat::Serial,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub samples: Vec<f64>,
    /// Per-sample times when the capture carries them (BLE only).
    pub times: Option<Vec<NaiveDateTime>>,
    pub dropped_frames: usize,
}

pub fn read_capture(path: &Path, sampling_rate: f64) -> Result<Capture, RecordingError> {
    match CaptureFormat::from_path(path) {
        CaptureFormat::Serial => {
            let bytes = fs::read(path)?;
            let mut decoder = SerialFrameDecoder::new();
            let samples = decoder.decode(&bytes).into_iter().map(f64::from).collect();
            Ok(Capture {
                samples,
                times: None,
                dropped_frames: decoder.dropped_frames(),
            })
        }
        CaptureFormat::Csv => Ok(Capture {
            samples: read_csv_samples(fs::File::open(path)?)?,
            times: None,
            dropped_frames: 0,
        }),
        CaptureFormat::Ble => read_ble_capture(&fs::read(path)?, sampling_rate),
    }
}

/// Decode BLE capture records and spread each packet's arrival time over
/// its readings. A truncated last record counts as one dropped frame.
pub fn read_ble_capture(bytes: &[u8], sampling_rate: f64) -> Result<Capture, RecordingError> {
    let records = bytes.chunks_exact(BLE_RECORD_BYTES);
    let truncated = !records.remainder().is_empty();
    if truncated {
        debug!(
            "Ignoring {} trailing bytes of a partial BLE record",
            records.remainder().len()
        );
    }

    let mut stamps = BleTimestamps::new(sampling_rate);
    let mut samples = Vec::with_capacity(bytes.len() / BLE_RECORD_BYTES * BLE_SAMPLES_PER_PACKET);
    let mut times = Vec::with_capacity(samples.capacity());
    for record in records {
        let (arrival, readings) = decode_ble_record(record)?;
        samples.extend(readings.iter().map(|&r| f64::from(r)));
        times.extend(stamps.assign(arrival));
    }

    Ok(Capture {
        samples,
        times: Some(times),
        dropped_frames: usize::from(truncated),
    })
}

// Empty cells and "nan" are gaps; a first row that does not parse is a header.
pub fn read_csv_samples<R: std::io::Read>(reader: R) -> Result<Vec<f64>, RecordingError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let field = record.get(0).unwrap_or("");
        if field.is_empty() {
            samples.push(NO_DATA);
            continue;
        }
        match field.parse::<f64>() {
            Ok(value) => samples.push(value),
            Err(_) if row == 0 => continue,
            Err(_) => {
                return Err(RecordingError::InvalidValue {
                    line: record.position().map_or(row as u64 + 1, |p| p.line()),
                    value: field.to_string(),
                })
            }
        }
    }
    Ok(samples)
}

// -----------------------------------------------------------------------------
// REPLAY
// -----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub input: PathBuf,
    pub recording: Option<PathBuf>,
    pub samples: u64,
    pub missing: u64,
    pub dropped_frames: usize,
    pub elapsed: Duration,
}

/// Run one capture through a fresh session, optionally recording the result.
///
/// Sample times come from the capture when it has them (BLE). Otherwise
/// they are synthetic: `started + n / fs`.
pub fn replay_file(
    path: &Path,
    config: &Config,
    output_dir: Option<&Path>,
    plotter: Option<&SharedPlotter>,
) -> Result<ReplaySummary, ReplayError> {
    let start = Instant::now();
    let capture = read_capture(path, config.filter.sampling_rate)?;
    if capture.dropped_frames > 0 {
        warn!(
            "{}: dropped {} malformed frames",
            path.display(),
            capture.dropped_frames
        );
    }

    let mut session = AcquisitionSession::from_config(config)?;
    let started = Local::now().naive_local();

    let mut recorder = match output_dir {
        Some(dir) => {
            let prefix = recording_prefix(&config.session.file_prefix, path);
            Some(CsvRecorder::create(dir, &prefix, started)?)
        }
        None => None,
    };

    let period_ns = 1e9 / config.filter.sampling_rate;
    let mut display = Vec::with_capacity(capture.samples.len());
    for (n, &raw) in capture.samples.iter().enumerate() {
        let record = session.push_sample(raw);
        display.push(record.display_uv);

        if let Some((recorder, _)) = recorder.as_mut() {
            let time = capture
                .times
                .as_deref()
                .and_then(|times| times.get(n).copied())
                .unwrap_or_else(|| sample_time(started, n, period_ns));
            recorder.record(time, &record)?;
        }
    }

    if let Some(plotter) = plotter {
        if let Ok(mut plotter) = plotter.lock() {
            plotter.extend(display);
        }
    }

    let recording = match recorder {
        Some((mut recorder, path)) => {
            recorder.flush()?;
            Some(path)
        }
        None => None,
    };

    let summary = ReplaySummary {
        input: path.to_path_buf(),
        recording,
        samples: session.samples_seen(),
        missing: session.missing_seen(),
        dropped_frames: capture.dropped_frames,
        elapsed: start.elapsed(),
    };
    info!(
        "Replayed {} samples from {} in {:?}",
        summary.samples,
        path.display(),
        summary.elapsed
    );
    Ok(summary)
}

/// Replay every file in parallel, each with its own session.
pub fn replay_files(
    paths: &[PathBuf],
    config: &Config,
    output_dir: Option<&Path>,
    plotter: Option<&SharedPlotter>,
) -> Vec<Result<ReplaySummary, ReplayError>> {
    paths
        .par_iter()
        .map(|path| replay_file(path, config, output_dir, plotter))
        .collect()
}

fn sample_time(started: NaiveDateTime, n: usize, period_ns: f64) -> NaiveDateTime {
    started + chrono::Duration::nanoseconds((n as f64 * period_ns) as i64)
}

fn recording_prefix(prefix: &str, input: &Path) -> String {
    match input.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => format!("{}_{}", prefix, stem),
        None => prefix.to_string(),
    }
}
