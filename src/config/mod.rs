// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::filters::FilterSpec;
use crate::visualization::VisualizationConfig;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterSpec,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub display: VisualizationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Instrumentation amplifier gain; raw volts / gain * 1e6 gives µV.
    pub inamp_gain: f64,
    pub enable_filters: bool,
    pub write_to_file: bool,
    pub recordings_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inamp_gain: 50.0,
            enable_filters: true,
            write_to_file: false,
            recordings_dir: PathBuf::from("recordings"),
            file_prefix: "exg".to_string(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.validate()?;

        if !(self.session.inamp_gain.is_finite() && self.session.inamp_gain > 0.0) {
            return Err(ConfigError::Session(format!(
                "inamp_gain must be positive, got {}",
                self.session.inamp_gain
            )));
        }
        if self.session.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::Session(format!(
                "file_prefix must not contain path separators: {:?}",
                self.session.file_prefix
            )));
        }
        if !(self.display.min_buffer_uv.is_finite() && self.display.min_buffer_uv >= 0.0) {
            return Err(ConfigError::Session(format!(
                "display.min_buffer_uv must be non-negative, got {}",
                self.display.min_buffer_uv
            )));
        }
        Ok(())
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_yaml::from_str(&config_str)?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let yaml = serde_yaml::to_string(config)?;

    fs::write(path, yaml).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
