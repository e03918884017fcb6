//! Core types for the CAN timeline decoder library
//!
//! This module defines the fundamental types shared across the parser,
//! decoder, timeline and playback components, plus the error taxonomy:
//! whole-input failures (`ParseError`, `LoadError`), recoverable per-line
//! problems (`Warning`) and per-signal decode failures (`DecodeFailure`).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Raw CAN frame as ingested from a log file or the mock generator
///
/// Immutable once created; owned by the [`Timeline`](crate::timeline::Timeline).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFrame {
    /// Timestamp in seconds (relative, source-defined origin)
    pub timestamp: f64,
    /// CAN message ID (11-bit or 29-bit)
    pub id: u32,
    /// Frame payload (0-8 bytes for classic CAN)
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Data length code - number of payload bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// One decoded frame: the signal map produced for the frame at the cursor
///
/// Ephemeral - recomputed on demand for the current cursor position and
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFrame {
    /// CAN message ID of the source frame
    pub id: u32,
    /// Timestamp of the source frame in seconds
    pub timestamp: f64,
    /// Message name from the schema; `None` marks an unknown message ID
    pub message: Option<String>,
    /// Signal name to decoded value, per signal of the matched message
    pub signals: BTreeMap<String, SignalValue>,
}

impl DecodedFrame {
    /// True if the frame's ID matched a message definition in the schema
    pub fn is_known(&self) -> bool {
        self.message.is_some()
    }
}

/// Decoded value of a single signal
///
/// A frame decodes signal-by-signal: some signals may fail (bit range
/// outside the actual payload) while the rest succeed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalValue {
    /// Physical value after scaling: `raw * scale + offset`
    Physical(f64),
    /// The signal could not be decoded from this payload
    Failed(DecodeFailure),
}

impl SignalValue {
    /// Physical value, if this signal decoded successfully
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SignalValue::Physical(v) => Some(*v),
            SignalValue::Failed(_) => None,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Physical(v) => write!(f, "{:.3}", v),
            SignalValue::Failed(reason) => write!(f, "<{}>", reason),
        }
    }
}

/// Why a single signal failed to decode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailure {
    /// The signal's bit range does not fit in the actual payload
    OutOfBounds {
        start_bit: u16,
        length: u16,
        payload_bits: usize,
    },
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeFailure::OutOfBounds {
                start_bit,
                length,
                payload_bits,
            } => write!(
                f,
                "signal bits {}|{} outside {}-bit payload",
                start_bit, length, payload_bits
            ),
        }
    }
}

/// A recoverable problem found in one line/row of an input file
///
/// Collected during parsing or loading and surfaced alongside the
/// successful result; never fatal on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    /// 1-based line (DBC) or row (CSV) number in the source text
    pub line: usize,
    /// Human-readable description of what was skipped and why
    pub reason: String,
}

impl Warning {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Errors that abort parsing a DBC schema
///
/// Malformed individual lines are recovered as [`Warning`]s instead;
/// only whole-input failures land here.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("no message definitions could be parsed from DBC input")]
    Empty,

    #[error("DBC input is not decodable text")]
    Encoding,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that abort loading a log source
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no valid frames found in log input")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
