//! Frame decoding engine
//!
//! Extracts signal values from raw CAN frames based on the loaded schema.
//! Handles bit extraction for both byte-order conventions, two's-complement
//! sign handling and physical value conversion.
//!
//! The decoder is stateless: decoding the same `(schema, frame)` pair always
//! yields the same result, and concurrent readers of one schema are safe.

use crate::schema::{ByteOrder, Schema, SignalDef};
use crate::timeline::Timeline;
use crate::types::{DecodeFailure, DecodedFrame, RawFrame, SignalValue};
use std::collections::BTreeMap;

/// Decode one raw frame against a schema
///
/// An unrecognized CAN ID yields a [`DecodedFrame`] with an empty signal
/// map and `message: None` - unknown IDs are common in real logs and must
/// not halt playback. A payload shorter than the declared message length
/// still decodes signal-by-signal; only the signals whose bit range falls
/// outside the actual payload are marked failed.
pub fn decode(schema: &Schema, frame: &RawFrame) -> DecodedFrame {
    let Some(message) = schema.message(frame.id) else {
        log::trace!("unknown CAN ID 0x{:X}, no signals decoded", frame.id);
        return DecodedFrame {
            id: frame.id,
            timestamp: frame.timestamp,
            message: None,
            signals: BTreeMap::new(),
        };
    };

    if frame.data.len() != message.length {
        log::debug!(
            "payload of 0x{:X} is {} bytes, schema declares {}",
            frame.id,
            frame.data.len(),
            message.length
        );
    }

    let payload_bits = frame.data.len() * 8;
    let mut signals = BTreeMap::new();
    for signal in &message.signals {
        signals.insert(signal.name.clone(), decode_signal(&frame.data, signal, payload_bits));
    }

    DecodedFrame {
        id: frame.id,
        timestamp: frame.timestamp,
        message: Some(message.name.clone()),
        signals,
    }
}

/// Extract the physical time series of one signal across a timeline
///
/// Returns `(timestamp, physical_value)` pairs for every frame of the
/// given CAN ID where the signal decoded successfully; failed decodes are
/// skipped. Plotting the series is the rendering collaborator's business.
pub fn signal_trace(
    schema: &Schema,
    timeline: &Timeline,
    id: u32,
    signal: &str,
) -> Vec<(f64, f64)> {
    timeline
        .frames()
        .iter()
        .filter(|frame| frame.id == id)
        .filter_map(|frame| {
            let decoded = decode(schema, frame);
            match decoded.signals.get(signal) {
                Some(SignalValue::Physical(value)) => Some((frame.timestamp, *value)),
                _ => None,
            }
        })
        .collect()
}

fn decode_signal(data: &[u8], signal: &SignalDef, payload_bits: usize) -> SignalValue {
    if signal.required_bits() > payload_bits {
        return SignalValue::Failed(DecodeFailure::OutOfBounds {
            start_bit: signal.start_bit,
            length: signal.length,
            payload_bits,
        });
    }

    let start_bit = signal.start_bit as usize;
    let length = signal.length as usize;
    let raw = match signal.byte_order {
        ByteOrder::LittleEndian => extract_little_endian(data, start_bit, length),
        ByteOrder::BigEndian => extract_big_endian(data, start_bit, length),
    };
    let raw = if signal.signed {
        sign_extend(raw, length)
    } else {
        raw as i64
    };

    SignalValue::Physical(raw as f64 * signal.scale + signal.offset)
}

/// Extract a little-endian (Intel) signal
///
/// The start bit names the LSB; bit numbering grows from the LSB of byte 0
/// toward higher bytes.
fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;
    for i in 0..length {
        let bit_pos = start_bit + i;
        let bit = (data[bit_pos / 8] >> (bit_pos % 8)) & 0x01;
        result |= (bit as u64) << i;
    }
    result
}

/// Extract a big-endian (Motorola) signal
///
/// The start bit names the MSB of the signal in LSB-0 per-byte numbering.
/// Extraction walks downward within the byte and continues at bit 7 of the
/// next byte - the DBC sawtooth.
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
    let mut result: u64 = 0;
    let mut byte_idx = start_bit / 8;
    let mut bit_in_byte = start_bit % 8;
    let mut remaining = length;
    while remaining > 0 {
        let bit = (data[byte_idx] >> bit_in_byte) & 0x01;
        remaining -= 1;
        result |= (bit as u64) << remaining;
        if bit_in_byte == 0 {
            byte_idx += 1;
            bit_in_byte = 7;
        } else {
            bit_in_byte -= 1;
        }
    }
    result
}

/// Sign-extend an N-bit raw value to i64 (two's complement)
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }
    let sign_bit = 1u64 << (bit_length - 1);
    if value & sign_bit != 0 {
        (value | !0u64 << bit_length) as i64
    } else {
        value as i64
    }
}
