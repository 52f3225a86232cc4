// src/local/mod.rs

pub mod process_file;
pub mod recorder;
pub mod simulate;

pub use process_file::{read_capture, replay_file, replay_files, CaptureFormat, ReplaySummary};
pub use recorder::{
    read_recording, read_recording_file, window, CsvRecorder, RecordedColumn, RecordedRow,
};
pub use simulate::{encode_ble_capture, encode_serial_capture, SimulatedSource, SimulationParams};
