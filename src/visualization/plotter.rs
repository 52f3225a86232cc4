// src/visualization/plotter.rs

use super::VisualizationConfig;
use crate::filters::is_missing;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// Rolling window of display values (µV) plus the y-axis policy for drawing
// them. Rendering itself is left to whoever holds the plotter.
pub struct SignalPlotter {
    config: VisualizationConfig,
    buffer: VecDeque<f64>,
}

pub type SharedPlotter = Arc<Mutex<SignalPlotter>>;

impl SignalPlotter {
    pub fn new(config: VisualizationConfig) -> Self {
        Self {
            buffer: VecDeque::with_capacity(config.max_datapoints),
            config,
        }
    }

    pub fn shared(config: VisualizationConfig) -> SharedPlotter {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn push(&mut self, value_uv: f64) {
        if is_missing(value_uv) || self.config.max_datapoints == 0 {
            return;
        }
        if self.buffer.len() == self.config.max_datapoints {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value_uv);
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.buffer.back().copied()
    }

    /// Points as `(sample number, µV)`, numbered from 1 like the x axis.
    pub fn points(&self) -> Vec<(usize, f64)> {
        self.buffer
            .iter()
            .enumerate()
            .map(|(i, &v)| (i + 1, v))
            .collect()
    }

    // Fixed +-min_buffer unless autoscaling; autoscale pads the data range by
    // 10%, or by min_buffer when the range is narrower than that.
    pub fn y_limits(&self) -> (f64, f64) {
        let min_buffer = self.config.min_buffer_uv;
        if !self.config.autoscale || self.buffer.is_empty() {
            return (-min_buffer, min_buffer);
        }

        let (min, max) = self
            .buffer
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let pad = if range > min_buffer { 0.1 * range } else { min_buffer };
        (min - pad, max + pad)
    }
}
