use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a filter. Nothing here is ever produced by
/// `update`; a filter that exists is a filter that works.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Empty coefficient vector: {0}")]
    EmptyCoefficients(&'static str),

    #[error("Second-order section {row} has {len} coefficients, expected 6")]
    InvalidSectionShape { row: usize, len: usize },

    #[error("Leading denominator coefficient is zero")]
    ZeroLeadingDenominator,

    #[error("A filter chain needs at least one stage")]
    EmptyChain,

    #[error("Unsupported representation: {0}")]
    UnsupportedRepresentation(String),

    #[error("Unsupported filter kind: {0}")]
    UnsupportedKind(String),

    #[error("Invalid filter specification: {0}")]
    InvalidSpecification(String),

    #[error("Filter design failed: {0}")]
    Design(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid filter settings: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid session settings: {0}")]
    Session(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error("BLE packet has {0} bytes, expected {1}")]
    PacketLength(usize, usize),

    #[error("BLE arrival time {0} µs is out of range")]
    ArrivalTime(i64),
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid sample {value:?} on line {line}")]
    InvalidValue { line: u64, value: String },

    #[error("Malformed capture: {0}")]
    Frame(#[from] FrameError),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Recording(#[from] RecordingError),
}
