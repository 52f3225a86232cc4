use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use log::{debug, info};
use serde::Deserialize;

use crate::acquisition::SampleRecord;
use crate::error::RecordingError;

pub const RECORDING_HEADER: [&str; 4] = ["time", "raw_data", "filtered_data", "marker"];
const TIME_FORMAT: &str = "%H:%M:%S%.6f";
const MAX_NAME_SUFFIX: u32 = 9999;

/// Writes `time,raw_data,filtered_data,marker` rows, values in µV.
pub struct CsvRecorder<W: Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl CsvRecorder<File> {
    /// Create `<dir>/<prefix>_<YYYYmmdd_HHMMSS>.csv`, creating `dir` if needed.
    ///
    /// An existing recording is never reused: if the name is taken, `_1`,
    /// `_2`, ... is appended until a free one is found.
    pub fn create(
        dir: &Path,
        prefix: &str,
        started: NaiveDateTime,
    ) -> Result<(Self, PathBuf), RecordingError> {
        fs::create_dir_all(dir)?;
        let stem = format!("{}_{}", prefix, started.format("%Y%m%d_%H%M%S"));
        let (file, path) = create_new_file(dir, &stem)?;
        let recorder = Self::from_writer(file)?;
        info!("Recording to {}", path.display());
        Ok((recorder, path))
    }
}

// create_new is atomic, so parallel replays racing for a name each get their own
fn create_new_file(dir: &Path, stem: &str) -> io::Result<(File, PathBuf)> {
    let mut suffix = 0;
    loop {
        let name = match suffix {
            0 => format!("{}.csv", stem),
            n => format!("{}_{}.csv", stem, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_NAME_SUFFIX => {
                debug!("{} exists, trying the next suffix", path.display());
                suffix += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

impl<W: Write> CsvRecorder<W> {
    pub fn from_writer(inner: W) -> Result<Self, RecordingError> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(RECORDING_HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn record(&mut self, time: NaiveDateTime, sample: &SampleRecord) -> Result<(), RecordingError> {
        self.writer.write_record([
            time.format(TIME_FORMAT).to_string(),
            sample.raw_uv.to_string(),
            sample.filtered_uv.to_string(),
            if sample.marker { "1" } else { "" }.to_string(),
        ])?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), RecordingError> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, RecordingError> {
        self.writer
            .into_inner()
            .map_err(|e| RecordingError::Io(e.into_error()))
    }
}

// -----------------------------------------------------------------------------
// READING RECORDINGS BACK
// -----------------------------------------------------------------------------

/// Which recorded value to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordedColumn {
    Raw,
    #[default]
    Filtered,
}

impl FromStr for RecordedColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "raw_data" => Ok(RecordedColumn::Raw),
            "filtered" | "filtered_data" => Ok(RecordedColumn::Filtered),
            other => Err(format!("unknown column {:?}, expected raw or filtered", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRow {
    pub time: NaiveTime,
    pub raw_uv: f64,
    pub filtered_uv: f64,
    pub marker: bool,
}

impl RecordedRow {
    pub fn value(&self, column: RecordedColumn) -> f64 {
        match column {
            RecordedColumn::Raw => self.raw_uv,
            RecordedColumn::Filtered => self.filtered_uv,
        }
    }
}

// Field names double as the required header.
#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    raw_data: f64,
    filtered_data: f64,
    marker: String,
}

/// Parse a recording written by [`CsvRecorder`].
pub fn read_recording<R: Read>(reader: R) -> Result<Vec<RecordedRow>, RecordingError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.deserialize::<CsvRow>() {
        let row = result?;
        let time = NaiveTime::parse_from_str(&row.time, TIME_FORMAT).map_err(|_| {
            RecordingError::InvalidValue {
                // header is line 1
                line: rows.len() as u64 + 2,
                value: row.time.clone(),
            }
        })?;
        rows.push(RecordedRow {
            time,
            raw_uv: row.raw_data,
            filtered_uv: row.filtered_data,
            marker: !row.marker.is_empty() && row.marker != "0",
        });
    }
    Ok(rows)
}

pub fn read_recording_file(path: &Path) -> Result<Vec<RecordedRow>, RecordingError> {
    read_recording(File::open(path)?)
}

/// Rows left after dropping the first `drop_start_s` and the last
/// `drop_end_s` seconds. Both are rounded down to whole samples.
pub fn window(
    rows: &[RecordedRow],
    sampling_rate: f64,
    drop_start_s: f64,
    drop_end_s: f64,
) -> &[RecordedRow] {
    // negative or NaN seconds saturate to zero samples
    let start = ((drop_start_s * sampling_rate) as usize).min(rows.len());
    let end = rows
        .len()
        .saturating_sub((drop_end_s * sampling_rate) as usize)
        .max(start);
    &rows[start..end]
}
