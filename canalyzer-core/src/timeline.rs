//! Log timeline: time-ordered raw frames plus CSV/BusMaster ingestion
//!
//! A [`Timeline`] is built once per load and immutable afterwards; a new
//! load produces an entirely new timeline that replaces the old one
//! wholesale. Rows are validated independently on ingestion - a bad row is
//! dropped with a collected warning, matching the DBC parser's tolerant
//! recovery.

use crate::types::{LoadError, RawFrame, Warning};
use std::path::Path;

/// Time-ordered, indexed sequence of raw frames
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    frames: Vec<RawFrame>,
    warnings: Vec<Warning>,
}

impl Timeline {
    /// Build a timeline from frames in arbitrary order
    ///
    /// Frames are stable-sorted by timestamp ascending, so frames sharing
    /// a timestamp keep their arrival order.
    pub fn build(frames: Vec<RawFrame>) -> Self {
        Self::sorted(frames, Vec::new())
    }

    /// Load a timeline from CSV text
    ///
    /// One record per line: timestamp, CAN ID (hex or decimal), payload as
    /// either a single packed hex string or individual byte fields - both
    /// numeral formats and both payload encodings are accepted without
    /// configuration, detected by lexical shape. An optional header row is
    /// skipped. Fails only when zero valid rows remain.
    pub fn from_csv(text: &str) -> Result<Self, LoadError> {
        let mut frames = Vec::new();
        let mut warnings = Vec::new();

        for (idx, raw_line) in text.lines().enumerate() {
            let row = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_row(line) {
                Ok(frame) => frames.push(frame),
                Err(reason) => {
                    if row == 1 && looks_like_header(line) {
                        log::debug!("skipping CSV header row: {}", line);
                        continue;
                    }
                    warnings.push(Warning::new(row, reason));
                }
            }
        }

        if frames.is_empty() {
            return Err(LoadError::Empty);
        }
        log::info!(
            "loaded {} frames from CSV ({} rows dropped)",
            frames.len(),
            warnings.len()
        );
        Ok(Self::sorted(frames, warnings))
    }

    /// Load a timeline from a BusMaster `.log` trace
    ///
    /// One frame per line: `HH:MM:SS:dms Tx/Rx channel ID type DLC data...`
    /// with the sub-second field in 0.1 ms units. Wall-clock timestamps are
    /// rebased so the first frame starts the trace at 0 seconds; a trace
    /// crossing midnight rolls over instead of going negative. Header and
    /// comment lines (`***...`) are skipped; malformed lines are dropped
    /// with a collected warning.
    pub fn from_busmaster(text: &str) -> Result<Self, LoadError> {
        let mut frames = Vec::new();
        let mut warnings = Vec::new();
        let mut base_time: Option<f64> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let row = idx + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("***") {
                continue;
            }
            match parse_busmaster_row(line, &mut base_time) {
                Ok(frame) => frames.push(frame),
                Err(reason) => warnings.push(Warning::new(row, reason)),
            }
        }

        if frames.is_empty() {
            return Err(LoadError::Empty);
        }
        log::info!(
            "loaded {} frames from BusMaster log ({} lines dropped)",
            frames.len(),
            warnings.len()
        );
        Ok(Self::sorted(frames, warnings))
    }

    /// Read and load a log file, detecting its format
    ///
    /// A `***BUSMASTER` header marks a BusMaster trace; anything else is
    /// treated as CSV.
    pub fn from_log_file(path: &Path) -> Result<Self, LoadError> {
        log::info!("Loading log file: {:?}", path);
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        if text
            .lines()
            .next()
            .is_some_and(|first| first.starts_with("***BUSMASTER"))
        {
            Self::from_busmaster(&text)
        } else {
            Self::from_csv(&text)
        }
    }

    fn sorted(mut frames: Vec<RawFrame>, warnings: Vec<Warning>) -> Self {
        // Stable sort keeps arrival order on equal timestamps.
        frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Self { frames, warnings }
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at the given 0-based index
    pub fn frame_at(&self, index: usize) -> Option<&RawFrame> {
        self.frames.get(index)
    }

    /// All frames, timestamp-ascending
    pub fn frames(&self) -> &[RawFrame] {
        &self.frames
    }

    /// Warnings collected while ingesting (dropped rows)
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Parse one CSV row: `timestamp, id, payload...`
fn parse_row(line: &str) -> Result<RawFrame, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 3 {
        return Err("expected timestamp, ID and payload fields".to_string());
    }

    let timestamp: f64 = fields[0]
        .parse()
        .map_err(|_| format!("invalid timestamp '{}'", fields[0]))?;
    if !timestamp.is_finite() {
        return Err(format!("non-finite timestamp '{}'", fields[0]));
    }

    let id = parse_can_id(fields[1])?;
    if id > 0x1FFF_FFFF {
        return Err(format!("CAN ID 0x{:X} exceeds the 29-bit range", id));
    }

    let data = parse_payload(&fields[2..])?;
    Ok(RawFrame {
        timestamp,
        id,
        data,
    })
}

/// Accept both ID numeral formats by lexical shape: a `0x` prefix or any
/// hex letter means hexadecimal, otherwise decimal.
fn parse_can_id(field: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if field.chars().any(|c| matches!(c, 'a'..='f' | 'A'..='F')) {
        u32::from_str_radix(field, 16)
    } else {
        field.parse()
    };
    parsed.map_err(|_| format!("invalid CAN ID '{}'", field))
}

/// Accept both payload encodings by lexical shape: one field longer than
/// two characters is a packed hex string, otherwise individual byte fields.
fn parse_payload(fields: &[&str]) -> Result<Vec<u8>, String> {
    let bytes = if fields.len() == 1 && fields[0].len() > 2 {
        let packed = fields[0];
        // Reject non-hex up front so the pairwise slicing below stays on
        // ASCII and cannot split a multi-byte character.
        if !packed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("invalid hex payload '{}'", packed));
        }
        // Odd-length packed strings get a leading zero, as the original
        // logs sometimes strip it.
        let padded;
        let hex = if packed.len() % 2 != 0 {
            padded = format!("0{}", packed);
            &padded
        } else {
            packed
        };
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| format!("invalid hex payload '{}'", packed))?
    } else {
        fields
            .iter()
            .filter(|f| !f.is_empty())
            .map(|f| u8::from_str_radix(f, 16).map_err(|_| format!("invalid payload byte '{}'", f)))
            .collect::<Result<Vec<u8>, String>>()?
    };

    if bytes.len() > 8 {
        return Err(format!("payload of {} bytes exceeds 8", bytes.len()));
    }
    Ok(bytes)
}

/// Parse one BusMaster line: `HH:MM:SS:dms Tx/Rx channel ID type DLC data...`
fn parse_busmaster_row(line: &str, base_time: &mut Option<f64>) -> Result<RawFrame, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 6 {
        return Err("expected time, direction, channel, ID, type and DLC fields".to_string());
    }

    let seconds = parse_busmaster_time(parts[0])?;
    let base = *base_time.get_or_insert(seconds);
    let mut timestamp = seconds - base;
    // Midnight rollover within one trace.
    if timestamp < 0.0 {
        timestamp += 24.0 * 3600.0;
    }

    // BusMaster IDs are hexadecimal with or without the 0x prefix.
    let id_token = parts[3];
    let hex = id_token
        .strip_prefix("0x")
        .or_else(|| id_token.strip_prefix("0X"))
        .unwrap_or(id_token);
    let id = u32::from_str_radix(hex, 16).map_err(|_| format!("invalid CAN ID '{}'", id_token))?;
    if id > 0x1FFF_FFFF {
        return Err(format!("CAN ID 0x{:X} exceeds the 29-bit range", id));
    }

    let dlc: usize = parts[5]
        .parse()
        .map_err(|_| format!("invalid DLC '{}'", parts[5]))?;
    if dlc > 8 {
        return Err(format!("DLC {} exceeds 8", dlc));
    }
    if parts.len() < 6 + dlc {
        return Err(format!("fewer data bytes than the DLC {} declares", dlc));
    }
    let data = parts[6..6 + dlc]
        .iter()
        .map(|f| u8::from_str_radix(f, 16).map_err(|_| format!("invalid data byte '{}'", f)))
        .collect::<Result<Vec<u8>, String>>()?;

    Ok(RawFrame {
        timestamp,
        id,
        data,
    })
}

/// Wall-clock `HH:MM:SS:dms` with the last field in 0.1 ms units
fn parse_busmaster_time(field: &str) -> Result<f64, String> {
    let mut parts = field.split(':');
    let (Some(h), Some(m), Some(s), Some(tenth_ms), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(format!("invalid timestamp '{}'", field));
    };
    let h: u32 = h.parse().map_err(|_| format!("invalid hour '{}'", h))?;
    let m: u32 = m.parse().map_err(|_| format!("invalid minute '{}'", m))?;
    let s: u32 = s.parse().map_err(|_| format!("invalid second '{}'", s))?;
    let tenth_ms: u32 = tenth_ms
        .parse()
        .map_err(|_| format!("invalid sub-second field '{}'", tenth_ms))?;
    Ok((h * 3600 + m * 60 + s) as f64 + tenth_ms as f64 / 10_000.0)
}

fn looks_like_header(line: &str) -> bool {
    line.split(',')
        .next()
        .is_some_and(|first| first.trim().chars().any(|c| c.is_ascii_alphabetic()))
}
