// src/acquisition/mod.rs

pub mod frame;
pub mod session;

pub use frame::{
    decode_ble_packet, decode_ble_record, encode_ble_packet, encode_ble_record, encode_serial_frame,
    BleTimestamps, SerialFrameDecoder,
};
pub use session::{AcquisitionSession, SampleRecord};
