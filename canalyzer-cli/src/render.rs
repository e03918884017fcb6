//! Text and JSON rendering of one cursor position
//!
//! This is the stand-in for the graphical rendering collaborator: it
//! consumes the `(raw_frame, decoded_or_none, warnings)` boundary of the
//! core and never reaches back into playback state.

use anyhow::Result;
use canalyzer_core::{CursorView, SignalValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Render one cursor position as human-readable text
pub fn render_text(index: usize, view: &CursorView) -> String {
    let frame = view.frame;
    let payload = frame
        .data
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ");
    let name = view
        .decoded
        .and_then(|d| d.message.as_deref())
        .unwrap_or("?");

    let mut out = format!(
        "#{:<6} t={:>10.4}s  id=0x{:03X}  dlc={}  [{}]  {}\n",
        index,
        frame.timestamp,
        frame.id,
        frame.dlc(),
        payload,
        name
    );
    if let Some(decoded) = view.decoded {
        for (signal, value) in &decoded.signals {
            let unit = view
                .message_def
                .and_then(|m| m.signal(signal))
                .and_then(|s| s.unit.as_deref());
            match unit {
                Some(unit) => out.push_str(&format!("        {} = {} {}\n", signal, value, unit)),
                None => out.push_str(&format!("        {} = {}\n", signal, value)),
            }
        }
    }
    out
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    index: usize,
    timestamp: f64,
    id: u32,
    data: &'a [u8],
    message: Option<&'a str>,
    signals: Option<&'a BTreeMap<String, SignalValue>>,
}

/// Render one cursor position as a single JSON object
pub fn render_json(index: usize, view: &CursorView) -> Result<String> {
    let record = FrameRecord {
        index,
        timestamp: view.frame.timestamp,
        id: view.frame.id,
        data: &view.frame.data,
        message: view.decoded.and_then(|d| d.message.as_deref()),
        signals: view.decoded.map(|d| &d.signals),
    };
    Ok(serde_json::to_string(&record)?)
}
