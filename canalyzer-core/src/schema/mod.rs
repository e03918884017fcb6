//! Bus schema: message and signal definitions parsed from DBC text
//!
//! The [`Schema`] is immutable once parsed and shared read-only by the
//! frame decoder; a new load replaces it wholesale.

pub mod dbc;

use crate::types::{ParseError, Warning};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Byte order (bit-addressing convention) of one signal
///
/// Recorded verbatim from the DBC source syntax, never inferred: the two
/// conventions address payload bits in incompatible ways and mixing them
/// up silently corrupts every decoded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Intel: the start bit names the LSB, numbering grows toward higher bytes
    LittleEndian,
    /// Motorola: the start bit names the MSB, extraction walks the
    /// zig-zag/sawtooth pattern through the payload
    BigEndian,
}

/// A CAN signal definition: one bit-packed, scaled field of a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalDef {
    /// Signal name (unique within its message)
    pub name: String,
    /// Start bit in the payload, in the convention given by `byte_order`
    pub start_bit: u16,
    /// Length in bits (1-64)
    pub length: u16,
    /// Bit-addressing convention for extraction
    pub byte_order: ByteOrder,
    /// Raw value is two's-complement signed
    pub signed: bool,
    /// Scale factor applied to the raw value
    pub scale: f64,
    /// Offset added after scaling
    pub offset: f64,
    /// Advisory minimum physical value (never enforced at decode time)
    pub min: Option<f64>,
    /// Advisory maximum physical value (never enforced at decode time)
    pub max: Option<f64>,
    /// Engineering unit, carried through but not interpreted
    pub unit: Option<String>,
}

impl SignalDef {
    /// Number of payload bits a buffer must have for this signal to decode.
    ///
    /// For little-endian signals the bit range is simply
    /// `start_bit..start_bit + length`. For big-endian signals the start
    /// bit is the MSB in LSB-0 per-byte numbering, so the span is measured
    /// from the MSB-0 position of the start bit.
    pub fn required_bits(&self) -> usize {
        let start = self.start_bit as usize;
        let length = self.length as usize;
        match self.byte_order {
            ByteOrder::LittleEndian => start + length,
            ByteOrder::BigEndian => (start / 8) * 8 + (7 - start % 8) + length,
        }
    }
}

/// A CAN message definition: expected payload length plus its signals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageDef {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Expected payload length in bytes
    pub length: usize,
    /// Signals of this message, in source order, names unique
    pub signals: Vec<SignalDef>,
}

impl MessageDef {
    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&SignalDef> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// Immutable bus schema: message definitions keyed by CAN ID
///
/// Produced by the DBC parser together with the warnings collected while
/// parsing; both are frozen after construction, so concurrent readers are
/// safe without synchronization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    messages: BTreeMap<u32, MessageDef>,
    warnings: Vec<Warning>,
}

impl Schema {
    /// Parse DBC source text into a schema
    ///
    /// Malformed message/signal lines are skipped with a collected warning;
    /// fails only when zero messages parse ([`ParseError::Empty`]).
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        dbc::parse(text)
    }

    /// Read and parse a DBC file
    ///
    /// Tries UTF-8 first, then falls back to Latin-1; input containing NUL
    /// bytes is rejected as binary ([`ParseError::Encoding`]).
    pub fn from_dbc_file(path: &Path) -> Result<Self, ParseError> {
        log::info!("Parsing DBC file: {:?}", path);
        let bytes = std::fs::read(path)?;
        let text = dbc::decode_text(&bytes)?;
        let schema = dbc::parse(&text)?;
        log::info!(
            "Parsed {} messages from {:?} ({} warnings)",
            schema.message_count(),
            path,
            schema.warnings().len()
        );
        Ok(schema)
    }

    pub(crate) fn new(messages: BTreeMap<u32, MessageDef>, warnings: Vec<Warning>) -> Self {
        Self { messages, warnings }
    }

    /// Look up a message definition by CAN ID
    pub fn message(&self, id: u32) -> Option<&MessageDef> {
        self.messages.get(&id)
    }

    /// Iterate all message definitions, ordered by CAN ID
    pub fn messages(&self) -> impl Iterator<Item = &MessageDef> {
        self.messages.values()
    }

    /// Number of message definitions
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Warnings collected while parsing (skipped lines)
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(start_bit: u16, length: u16, byte_order: ByteOrder) -> SignalDef {
        SignalDef {
            name: "Sig".to_string(),
            start_bit,
            length,
            byte_order,
            signed: false,
            scale: 1.0,
            offset: 0.0,
            min: None,
            max: None,
            unit: None,
        }
    }

    #[test]
    fn test_required_bits_little_endian() {
        assert_eq!(signal(0, 16, ByteOrder::LittleEndian).required_bits(), 16);
        assert_eq!(signal(12, 8, ByteOrder::LittleEndian).required_bits(), 20);
    }

    #[test]
    fn test_required_bits_big_endian() {
        // Start bit 7 is the MSB of byte 0; 16 bits span bytes 0-1.
        assert_eq!(signal(7, 16, ByteOrder::BigEndian).required_bits(), 16);
        // Start bit 0 is the LSB of byte 0; the walk continues into byte 1.
        assert_eq!(signal(0, 2, ByteOrder::BigEndian).required_bits(), 9);
    }

    #[test]
    fn test_message_signal_lookup() {
        let msg = MessageDef {
            id: 0x100,
            name: "EngineData".to_string(),
            length: 8,
            signals: vec![signal(0, 16, ByteOrder::LittleEndian)],
        };
        assert!(msg.signal("Sig").is_some());
        assert!(msg.signal("Missing").is_none());
    }
}
