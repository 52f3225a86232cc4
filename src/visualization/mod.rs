// src/visualization/mod.rs

pub mod plotter;

pub use plotter::{SharedPlotter, SignalPlotter};

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct VisualizationConfig {
    pub max_datapoints: usize,
    pub min_buffer_uv: f64,
    pub autoscale: bool,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            max_datapoints: 1500,
            min_buffer_uv: 10500.0,
            autoscale: false,
        }
    }
}
