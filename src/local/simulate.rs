// src/local/simulate.rs
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::acquisition::frame::BLE_SAMPLES_PER_PACKET;
use crate::acquisition::{encode_ble_record, encode_serial_frame};
use crate::acquisition::session::MICROVOLTS_PER_VOLT;
use crate::filters::NO_DATA;

// -----------------------------------------------------------------------------
// SIMULATED EXG SOURCE
// -----------------------------------------------------------------------------

/// Amplitudes in µV at the electrode, before the amplifier gain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub alpha_hz: f64,
    pub alpha_uv: f64,
    pub mains_hz: f64,
    pub mains_uv: f64,
    pub drift_hz: f64,
    pub drift_uv: f64,
    pub noise_uv: f64,
    pub dropout_probability: f64,
    pub inamp_gain: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            alpha_hz: 10.0,
            alpha_uv: 40.0,
            mains_hz: 50.0,
            mains_uv: 120.0,
            drift_hz: 0.1,
            drift_uv: 400.0,
            noise_uv: 5.0,
            dropout_probability: 0.0,
            inamp_gain: 50.0,
        }
    }
}

/// Endless stream of raw amplifier output (volts), one value per sample.
pub struct SimulatedSource {
    params: SimulationParams,
    sampling_rate: f64,
    index: u64,
    rng: StdRng,
}

impl SimulatedSource {
    pub fn new(params: SimulationParams, sampling_rate: f64, seed: u64) -> Self {
        Self {
            params,
            sampling_rate,
            index: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    fn next_sample(&mut self) -> f64 {
        let p = &self.params;
        let t = self.index as f64 / self.sampling_rate;
        self.index += 1;

        if p.dropout_probability > 0.0 && self.rng.gen_bool(p.dropout_probability.min(1.0)) {
            return NO_DATA;
        }

        let tone = |hz: f64, uv: f64| uv * (2.0 * PI * hz * t).sin();
        let mut uv = tone(p.alpha_hz, p.alpha_uv)
            + tone(p.mains_hz, p.mains_uv)
            + tone(p.drift_hz, p.drift_uv);
        if p.noise_uv > 0.0 {
            uv += self.rng.gen_range(-p.noise_uv..p.noise_uv);
        }

        uv * p.inamp_gain / MICROVOLTS_PER_VOLT
    }
}

impl Iterator for SimulatedSource {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_sample())
    }
}

/// Serialise samples the way the serial firmware sends them.
pub fn encode_serial_capture<I: IntoIterator<Item = f64>>(samples: I) -> Vec<u8> {
    samples
        .into_iter()
        .flat_map(|s| encode_serial_frame(s as f32))
        .collect()
}

/// Serialise samples as a BLE capture. Each packet arrives with its last
/// reading, `started + n / fs`; readings that do not fill a packet are not
/// sent.
pub fn encode_ble_capture<I: IntoIterator<Item = f64>>(
    samples: I,
    sampling_rate: f64,
    started: NaiveDateTime,
) -> Vec<u8> {
    let readings: Vec<f32> = samples.into_iter().map(|s| s as f32).collect();
    let period_ns = 1e9 / sampling_rate;

    readings
        .chunks_exact(BLE_SAMPLES_PER_PACKET)
        .enumerate()
        .flat_map(|(k, chunk)| {
            let last = (k + 1) * BLE_SAMPLES_PER_PACKET - 1;
            let arrival = started + Duration::nanoseconds((last as f64 * period_ns) as i64);
            let mut packet = [0.0f32; BLE_SAMPLES_PER_PACKET];
            packet.copy_from_slice(chunk);
            encode_ble_record(arrival, &packet)
        })
        .collect()
}
