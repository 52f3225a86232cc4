//! Wire formats of the ExG front end.
//!
//! Serial: one little-endian `f32` followed by `'\n'`. Any frame whose
//! payload is not exactly four bytes is dropped.
//!
//! BLE: one notification carries five little-endian `f32` readings (20 bytes).
//! The radio only timestamps the packet, so per-reading times are spread
//! evenly between the previous packet and this one.
//!
//! BLE captures on disk store one record per notification: the arrival time
//! as a little-endian `i64` of microseconds since the Unix epoch, followed by
//! the 20-byte packet.

use chrono::{DateTime, Duration, NaiveDateTime};
use log::debug;

use crate::error::FrameError;

pub const SERIAL_DELIMITER: u8 = b'\n';
pub const SERIAL_SAMPLE_BYTES: usize = 4;
pub const BLE_SAMPLES_PER_PACKET: usize = 5;
pub const BLE_PACKET_BYTES: usize = BLE_SAMPLES_PER_PACKET * 4;
pub const BLE_RECORD_BYTES: usize = 8 + BLE_PACKET_BYTES;

// SERIAL ----------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SerialFrameDecoder {
    payload: [u8; SERIAL_SAMPLE_BYTES],
    // bytes seen since the last delimiter, may exceed the payload size
    len: usize,
    dropped: usize,
}

impl SerialFrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_byte(&mut self, byte: u8) -> Option<f32> {
        if byte != SERIAL_DELIMITER {
            if self.len < SERIAL_SAMPLE_BYTES {
                self.payload[self.len] = byte;
            }
            self.len = self.len.saturating_add(1);
            return None;
        }

        let len = std::mem::take(&mut self.len);
        if len == SERIAL_SAMPLE_BYTES {
            Some(f32::from_le_bytes(self.payload))
        } else {
            self.dropped += 1;
            debug!("Dropping serial frame of {} bytes", len);
            None
        }
    }

    pub fn decode(&mut self, bytes: &[u8]) -> Vec<f32> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    pub fn dropped_frames(&self) -> usize {
        self.dropped
    }
}

pub fn encode_serial_frame(sample: f32) -> [u8; SERIAL_SAMPLE_BYTES + 1] {
    let [b0, b1, b2, b3] = sample.to_le_bytes();
    [b0, b1, b2, b3, SERIAL_DELIMITER]
}

// BLE -------------------------------------------------------------------------

pub fn decode_ble_packet(packet: &[u8]) -> Result<[f32; BLE_SAMPLES_PER_PACKET], FrameError> {
    if packet.len() != BLE_PACKET_BYTES {
        return Err(FrameError::PacketLength(packet.len(), BLE_PACKET_BYTES));
    }

    let mut readings = [0.0f32; BLE_SAMPLES_PER_PACKET];
    for (reading, chunk) in readings.iter_mut().zip(packet.chunks_exact(4)) {
        *reading = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(readings)
}

pub fn encode_ble_packet(readings: &[f32; BLE_SAMPLES_PER_PACKET]) -> [u8; BLE_PACKET_BYTES] {
    let mut packet = [0u8; BLE_PACKET_BYTES];
    for (chunk, reading) in packet.chunks_exact_mut(4).zip(readings) {
        chunk.copy_from_slice(&reading.to_le_bytes());
    }
    packet
}

pub fn encode_ble_record(
    arrival: NaiveDateTime,
    readings: &[f32; BLE_SAMPLES_PER_PACKET],
) -> [u8; BLE_RECORD_BYTES] {
    let mut record = [0u8; BLE_RECORD_BYTES];
    record[..8].copy_from_slice(&arrival.and_utc().timestamp_micros().to_le_bytes());
    record[8..].copy_from_slice(&encode_ble_packet(readings));
    record
}

pub fn decode_ble_record(
    record: &[u8],
) -> Result<(NaiveDateTime, [f32; BLE_SAMPLES_PER_PACKET]), FrameError> {
    if record.len() != BLE_RECORD_BYTES {
        return Err(FrameError::PacketLength(record.len(), BLE_RECORD_BYTES));
    }

    let mut stamp = [0u8; 8];
    stamp.copy_from_slice(&record[..8]);
    let micros = i64::from_le_bytes(stamp);
    let arrival = DateTime::from_timestamp_micros(micros)
        .ok_or(FrameError::ArrivalTime(micros))?
        .naive_utc();
    Ok((arrival, decode_ble_packet(&record[8..])?))
}

/// Spreads packet arrival times over the readings each packet carries.
#[derive(Debug, Clone)]
pub struct BleTimestamps {
    sample_period: Duration,
    last: Option<NaiveDateTime>,
}

impl BleTimestamps {
    pub fn new(sampling_rate: f64) -> Self {
        Self {
            sample_period: Duration::nanoseconds((1e9 / sampling_rate) as i64),
            last: None,
        }
    }

    // The last reading lands on `arrival`, the rest step evenly back towards
    // the previous arrival. The first packet assumes one nominal period per
    // reading.
    pub fn assign(&mut self, arrival: NaiveDateTime) -> [NaiveDateTime; BLE_SAMPLES_PER_PACKET] {
        let n = BLE_SAMPLES_PER_PACKET as i32;
        let last = self.last.unwrap_or(arrival - self.sample_period * n);
        let step = arrival.signed_duration_since(last) / n;

        let mut times = [arrival; BLE_SAMPLES_PER_PACKET];
        for (i, time) in times.iter_mut().enumerate().take(BLE_SAMPLES_PER_PACKET - 1) {
            *time = last + step * (i as i32 + 1);
        }
        self.last = Some(arrival);
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn serial_decoder_emits_complete_frames() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&encode_serial_frame(1.5));
        bytes.extend_from_slice(&encode_serial_frame(-0.25));

        let mut decoder = SerialFrameDecoder::new();
        assert_eq!(decoder.decode(&bytes), vec![1.5, -0.25]);
        assert_eq!(decoder.dropped_frames(), 0);
    }

    #[test]
    fn serial_decoder_drops_short_and_long_frames() {
        let mut bytes = vec![1, 2, b'\n', 1, 2, 3, 4, 5, 6, b'\n'];
        bytes.extend_from_slice(&encode_serial_frame(3.0));

        let mut decoder = SerialFrameDecoder::new();
        assert_eq!(decoder.decode(&bytes), vec![3.0]);
        assert_eq!(decoder.dropped_frames(), 2);
    }

    #[test]
    fn serial_decoder_handles_split_reads() {
        let frame = encode_serial_frame(42.0);
        let mut decoder = SerialFrameDecoder::new();
        assert!(decoder.decode(&frame[..2]).is_empty());
        assert_eq!(decoder.decode(&frame[2..]), vec![42.0]);
    }

    #[test]
    fn ble_packet_decodes_five_readings() {
        let mut packet = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0, 5.0] {
            packet.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(decode_ble_packet(&packet), Ok([1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(
            decode_ble_packet(&packet[..19]),
            Err(FrameError::PacketLength(19, BLE_PACKET_BYTES))
        );
    }

    #[test]
    fn ble_record_keeps_arrival_and_readings() {
        let arrival = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_micro_opt(12, 0, 0, 123_456)
            .unwrap();
        let readings = [0.5f32, -1.0, f32::NAN, 2.0, 1e-3];
        let record = encode_ble_record(arrival, &readings);
        assert_eq!(&record[8..12], &0.5f32.to_le_bytes());

        let (time, decoded) = decode_ble_record(&record).unwrap();
        assert_eq!(time, arrival);
        assert_eq!(decoded[0], 0.5);
        assert!(decoded[2].is_nan());
        assert_eq!(decoded[4], 1e-3);

        assert_eq!(
            decode_ble_record(&record[..BLE_PACKET_BYTES]),
            Err(FrameError::PacketLength(BLE_PACKET_BYTES, BLE_RECORD_BYTES))
        );
        let mut bad = record;
        bad[..8].copy_from_slice(&i64::MAX.to_le_bytes());
        assert_eq!(
            decode_ble_record(&bad),
            Err(FrameError::ArrivalTime(i64::MAX))
        );
    }

    #[test]
    fn ble_timestamps_interpolate_between_packets() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut stamps = BleTimestamps::new(250.0);

        let first = stamps.assign(t0);
        assert_eq!(first[4], t0);
        assert_eq!(first[0], t0 - Duration::milliseconds(16));

        let t1 = t0 + Duration::milliseconds(50);
        let second = stamps.assign(t1);
        assert_eq!(second[0], t0 + Duration::milliseconds(10));
        assert_eq!(second[3], t0 + Duration::milliseconds(40));
        assert_eq!(second[4], t1);
    }
}
