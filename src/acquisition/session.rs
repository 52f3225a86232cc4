use log::{debug, info};

use crate::config::{Config, SessionConfig};
use crate::error::ConfigError;
use crate::filters::{is_missing, FilterFactory, LiveFilter, StreamFilter};

pub const MICROVOLTS_PER_VOLT: f64 = 1e6;

/// One acquired sample after filtering, scaled to microvolts at the electrode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    pub raw_uv: f64,
    pub filtered_uv: f64,
    /// What a display should show: filtered or raw, depending on the session.
    pub display_uv: f64,
    pub marker: bool,
}

// State of one recording run: the live filter, unit conversion and the
// pending marker. One session per device stream.
#[derive(Debug)]
pub struct AcquisitionSession {
    filter: StreamFilter,
    settings: SessionConfig,
    pending_marker: bool,
    samples_seen: u64,
    missing_seen: u64,
}

impl AcquisitionSession {
    pub fn new(filter: StreamFilter, settings: SessionConfig) -> Self {
        Self {
            filter,
            settings,
            pending_marker: false,
            samples_seen: 0,
            missing_seen: 0,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let filter = FilterFactory::default().build(&config.filter)?;
        info!(
            "Session filter: {} {:?} Hz at {} Hz ({})",
            config.filter.kind,
            config.filter.cutoff,
            config.filter.sampling_rate,
            filter.topology()
        );
        Ok(Self::new(filter, config.session.clone()))
    }

    pub fn push_sample(&mut self, raw: f64) -> SampleRecord {
        self.samples_seen += 1;
        if is_missing(raw) {
            self.missing_seen += 1;
        }

        let filtered = self.filter.update(raw);
        let raw_uv = self.to_microvolts(raw);
        let filtered_uv = self.to_microvolts(filtered);

        SampleRecord {
            raw_uv,
            filtered_uv,
            display_uv: if self.settings.enable_filters {
                filtered_uv
            } else {
                raw_uv
            },
            marker: std::mem::take(&mut self.pending_marker),
        }
    }

    /// Flag the next pushed sample.
    pub fn mark(&mut self) {
        debug!("Marker set at sample {}", self.samples_seen + 1);
        self.pending_marker = true;
    }

    pub fn set_filters_enabled(&mut self, enabled: bool) {
        self.settings.enable_filters = enabled;
    }

    pub fn filters_enabled(&self) -> bool {
        self.settings.enable_filters
    }

    pub fn reset_filter(&mut self) {
        self.filter.reset();
    }

    pub fn settings(&self) -> &SessionConfig {
        &self.settings
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn missing_seen(&self) -> u64 {
        self.missing_seen
    }

    fn to_microvolts(&self, volts: f64) -> f64 {
        volts / self.settings.inamp_gain * MICROVOLTS_PER_VOLT
    }
}
