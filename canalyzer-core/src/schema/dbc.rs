//! DBC text parser
//!
//! Line-oriented parser for the DBC schema format: `BO_` message records
//! followed by their `SG_` signal records. Recovery is per line - a
//! malformed record is skipped with a collected warning so that one typo
//! in a large file does not block decoding of everything else. Lines
//! outside the recognized grammar are ignored.

use crate::schema::{ByteOrder, MessageDef, Schema, SignalDef};
use crate::types::{ParseError, Warning};
use std::collections::BTreeMap;

/// Parse DBC source text into a [`Schema`]
///
/// Fails only when zero messages parse successfully; everything
/// recoverable at the unit of one line becomes a [`Warning`] on the
/// returned schema.
pub fn parse(text: &str) -> Result<Schema, ParseError> {
    let mut messages: BTreeMap<u32, MessageDef> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut current: Option<MessageDef> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw_line.trim();

        if line.starts_with("BO_ ") {
            if let Some(message) = current.take() {
                insert_message(&mut messages, message);
            }
            match parse_message_line(line) {
                Ok(message) => current = Some(message),
                Err(reason) => warnings.push(Warning::new(lineno, reason)),
            }
        } else if line.starts_with("SG_ ") || line.starts_with("SG_\t") {
            let Some(message) = current.as_mut() else {
                warnings.push(Warning::new(lineno, "signal record outside of a message"));
                continue;
            };
            match parse_signal_line(line) {
                Ok(signal) => attach_signal(message, signal, lineno, &mut warnings),
                Err(reason) => warnings.push(Warning::new(lineno, reason)),
            }
        }
        // Anything else (VERSION, BU_, comments, attributes...) is ignored.
    }

    if let Some(message) = current.take() {
        insert_message(&mut messages, message);
    }

    if messages.is_empty() {
        return Err(ParseError::Empty);
    }

    log::debug!(
        "parsed {} messages, {} lines skipped",
        messages.len(),
        warnings.len()
    );
    Ok(Schema::new(messages, warnings))
}

/// Decode raw DBC bytes to text: UTF-8 first, Latin-1 fallback
///
/// NUL bytes mark binary input and are rejected rather than mangled.
pub fn decode_text(bytes: &[u8]) -> Result<String, ParseError> {
    if bytes.contains(&0) {
        return Err(ParseError::Encoding);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => {
            log::warn!("DBC input is not UTF-8, falling back to Latin-1");
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

/// Duplicate message IDs are last-wins: a later definition overwrites an
/// earlier one. Chosen for tolerance of generator quirks.
fn insert_message(messages: &mut BTreeMap<u32, MessageDef>, message: MessageDef) {
    if let Some(previous) = messages.insert(message.id, message) {
        log::debug!(
            "duplicate message ID 0x{:X}: '{}' overwritten by later definition",
            previous.id,
            previous.name
        );
    }
}

/// Duplicate signal names within a message are last-wins, but warned.
fn attach_signal(
    message: &mut MessageDef,
    signal: SignalDef,
    lineno: usize,
    warnings: &mut Vec<Warning>,
) {
    if signal.required_bits() > message.length * 8 {
        warnings.push(Warning::new(
            lineno,
            format!(
                "signal '{}' does not fit in the {}-byte payload of '{}'",
                signal.name, message.length, message.name
            ),
        ));
        return;
    }
    if let Some(existing) = message.signals.iter_mut().find(|s| s.name == signal.name) {
        warnings.push(Warning::new(
            lineno,
            format!(
                "duplicate signal '{}' in message '{}' replaces earlier definition",
                signal.name, message.name
            ),
        ));
        *existing = signal;
    } else {
        message.signals.push(signal);
    }
}

/// Parse `BO_ <id> <name>: <length> <sender>`
fn parse_message_line(line: &str) -> Result<MessageDef, String> {
    let body = line.trim_start_matches("BO_").trim();
    let (head, tail) = body
        .split_once(':')
        .ok_or("missing ':' in message record")?;

    let mut head_tokens = head.split_whitespace();
    let id_token = head_tokens.next().ok_or("missing message ID")?;
    let id: u32 = id_token
        .parse()
        .map_err(|_| format!("invalid message ID '{}'", id_token))?;
    let name = head_tokens
        .next()
        .ok_or("missing message name")?
        .to_string();

    let length_token = tail
        .split_whitespace()
        .next()
        .ok_or("missing payload length")?;
    let length: usize = length_token
        .parse()
        .map_err(|_| format!("invalid payload length '{}'", length_token))?;
    if length > 8 {
        return Err(format!("payload length {} exceeds 8 bytes", length));
    }

    Ok(MessageDef {
        id,
        name,
        length,
        signals: Vec::new(),
    })
}

/// Parse `SG_ <name> [mux] : <start>|<len>@<order><sign> (<scale>,<offset>) [<min>|<max>] "<unit>" <receivers>`
fn parse_signal_line(line: &str) -> Result<SignalDef, String> {
    let body = line.trim_start_matches("SG_").trim();
    let (head, tail) = body.split_once(':').ok_or("missing ':' in signal record")?;

    let mut head_tokens = head.split_whitespace();
    let name = head_tokens.next().ok_or("missing signal name")?.to_string();
    // A multiplex indicator (`M` or `m<N>`) is tolerated and skipped;
    // multiplexed decode is out of scope and overlap is last-wins.
    if let Some(token) = head_tokens.next() {
        let is_mux_token =
            token == "M" || (token.starts_with('m') && token[1..].chars().all(|c| c.is_ascii_digit()));
        if !is_mux_token {
            return Err(format!("unexpected token '{}' before ':'", token));
        }
    }

    let tail = tail.trim();
    let mut fields = tail.split_whitespace();

    // <start>|<len>@<order><sign>
    let layout = fields.next().ok_or("missing bit layout")?;
    let (start_token, rest) = layout.split_once('|').ok_or("missing '|' in bit layout")?;
    let (length_token, flags) = rest.split_once('@').ok_or("missing '@' in bit layout")?;
    let start_bit: u16 = start_token
        .parse()
        .map_err(|_| format!("invalid start bit '{}'", start_token))?;
    let length: u16 = length_token
        .parse()
        .map_err(|_| format!("invalid bit length '{}'", length_token))?;
    if !(1..=64).contains(&length) {
        return Err(format!("bit length {} outside 1-64", length));
    }
    let mut flag_chars = flags.chars();
    // The order flag is preserved verbatim; a wrong convention silently
    // corrupts every decoded value, so an unknown flag is a hard skip.
    let byte_order = match flag_chars.next() {
        Some('1') => ByteOrder::LittleEndian,
        Some('0') => ByteOrder::BigEndian,
        other => return Err(format!("invalid byte order flag {:?}", other)),
    };
    let signed = match flag_chars.next() {
        Some('+') => false,
        Some('-') => true,
        other => return Err(format!("invalid sign flag {:?}", other)),
    };

    // (<scale>,<offset>)
    let conversion = fields.next().ok_or("missing scale/offset")?;
    let inner = conversion
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| format!("malformed scale/offset '{}'", conversion))?;
    let (scale_token, offset_token) = inner
        .split_once(',')
        .ok_or_else(|| format!("malformed scale/offset '{}'", conversion))?;
    let scale: f64 = scale_token
        .parse()
        .map_err(|_| format!("invalid scale '{}'", scale_token))?;
    let offset: f64 = offset_token
        .parse()
        .map_err(|_| format!("invalid offset '{}'", offset_token))?;

    // Optional [<min>|<max>]; [0|0] means "no advisory range".
    let (mut min, mut max) = (None, None);
    if let Some(range) = fields.next().filter(|t| t.starts_with('[')) {
        let inner = range
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| format!("malformed range '{}'", range))?;
        let (min_token, max_token) = inner
            .split_once('|')
            .ok_or_else(|| format!("malformed range '{}'", range))?;
        let lo: f64 = min_token
            .parse()
            .map_err(|_| format!("invalid minimum '{}'", min_token))?;
        let hi: f64 = max_token
            .parse()
            .map_err(|_| format!("invalid maximum '{}'", max_token))?;
        if lo != 0.0 || hi != 0.0 {
            min = Some(lo);
            max = Some(hi);
        }
    }

    // Optional quoted unit; taken from the raw tail so units keep their
    // spaces. Receiver names after the closing quote are not carried.
    let unit = match tail.find('"') {
        Some(open) => {
            let after = &tail[open + 1..];
            let close = after.find('"').ok_or("unterminated unit string")?;
            let unit = &after[..close];
            (!unit.is_empty()).then(|| unit.to_string())
        }
        None => None,
    };

    Ok(SignalDef {
        name,
        start_bit,
        length,
        byte_order,
        signed,
        scale,
        offset,
        min,
        max,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_DBC: &str = r#"
VERSION ""

BU_: ECU1 ECU2

BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ EngineTemp : 16|8@1+ (1,-40) [-40|215] "C" ECU2

BO_ 512 BatteryStatus: 8 ECU1
 SG_ BatteryVoltage : 0|16@1+ (0.01,0) [0|16] "V" ECU2
"#;

    #[test]
    fn test_parse_simple_dbc() {
        let schema = parse(SAMPLE_DBC).unwrap();
        assert_eq!(schema.message_count(), 2);
        assert!(schema.warnings().is_empty());

        let msg = schema.message(291).unwrap();
        assert_eq!(msg.name, "EngineData");
        assert_eq!(msg.length, 8);
        assert_eq!(msg.signals.len(), 2);

        let sig = &msg.signals[0];
        assert_eq!(sig.name, "EngineSpeed");
        assert_eq!(sig.start_bit, 0);
        assert_eq!(sig.length, 16);
        assert_eq!(sig.byte_order, ByteOrder::LittleEndian);
        assert!(!sig.signed);
        assert_eq!(sig.scale, 1.0);
        assert_eq!(sig.offset, 0.0);
        assert_eq!(sig.min, Some(0.0));
        assert_eq!(sig.max, Some(8000.0));
        assert_eq!(sig.unit, Some("rpm".to_string()));

        let temp = msg.signal("EngineTemp").unwrap();
        assert_eq!(temp.offset, -40.0);
    }

    #[test]
    fn test_byte_order_and_sign_flags_preserved() {
        let text = r#"
BO_ 100 Mixed: 8 ECU
 SG_ Motorola : 7|16@0- (0.1,0) [0|0] "" ECU
 SG_ Intel : 16|16@1+ (1,0) [0|0] "" ECU
"#;
        let schema = parse(text).unwrap();
        let msg = schema.message(100).unwrap();
        let motorola = msg.signal("Motorola").unwrap();
        assert_eq!(motorola.byte_order, ByteOrder::BigEndian);
        assert!(motorola.signed);
        // [0|0] carries no advisory range
        assert_eq!(motorola.min, None);
        assert_eq!(motorola.max, None);
        let intel = msg.signal("Intel").unwrap();
        assert_eq!(intel.byte_order, ByteOrder::LittleEndian);
        assert!(!intel.signed);
    }

    #[test]
    fn test_malformed_line_is_skipped_with_warning() {
        let text = r#"
BO_ 291 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (1,0) [0|8000] "rpm" ECU2
 SG_ Broken : garbage
"#;
        let schema = parse(text).unwrap();
        let msg = schema.message(291).unwrap();
        assert_eq!(msg.signals.len(), 1);
        assert_eq!(schema.warnings().len(), 1);
        assert_eq!(schema.warnings()[0].line, 4);
    }

    #[test]
    fn test_signal_exceeding_payload_is_skipped() {
        let text = r#"
BO_ 291 Short: 2 ECU1
 SG_ Fits : 0|16@1+ (1,0) [0|0] "" ECU2
 SG_ TooWide : 8|16@1+ (1,0) [0|0] "" ECU2
"#;
        let schema = parse(text).unwrap();
        let msg = schema.message(291).unwrap();
        assert_eq!(msg.signals.len(), 1);
        assert_eq!(msg.signals[0].name, "Fits");
        assert_eq!(schema.warnings().len(), 1);
    }

    #[test]
    fn test_duplicate_message_id_last_wins() {
        let text = r#"
BO_ 291 First: 8 ECU1
 SG_ A : 0|8@1+ (1,0) [0|0] "" ECU2
BO_ 291 Second: 4 ECU1
 SG_ B : 0|8@1+ (1,0) [0|0] "" ECU2
"#;
        let schema = parse(text).unwrap();
        assert_eq!(schema.message_count(), 1);
        let msg = schema.message(291).unwrap();
        assert_eq!(msg.name, "Second");
        assert_eq!(msg.length, 4);
        assert!(msg.signal("B").is_some());
    }

    #[test]
    fn test_multiplex_tokens_tolerated() {
        let text = r#"
BO_ 512 MultiplexedMsg: 8 ECU1
 SG_ Mode M : 0|8@1+ (1,0) [0|3] "" ECU1
 SG_ SignalA m0 : 8|16@1+ (1,0) [0|100] "%" ECU1
"#;
        let schema = parse(text).unwrap();
        let msg = schema.message(512).unwrap();
        assert_eq!(msg.signals.len(), 2);
        assert!(msg.signal("Mode").is_some());
        assert!(msg.signal("SignalA").is_some());
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(parse(""), Err(ParseError::Empty)));
        assert!(matches!(
            parse("VERSION \"\"\nBU_: ECU1\n"),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn test_binary_input_rejected() {
        let bytes = [0x42u8, 0x4F, 0x00, 0x5F];
        assert!(matches!(decode_text(&bytes), Err(ParseError::Encoding)));
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xB0 is the degree sign in Latin-1 and invalid standalone UTF-8.
        let mut bytes = b"BO_ 1 M: 8 E\n SG_ T : 0|8@1+ (1,0) [0|0] \"".to_vec();
        bytes.push(0xB0);
        bytes.extend_from_slice(b"C\" E\n");
        let text = decode_text(&bytes).unwrap();
        let schema = parse(&text).unwrap();
        let unit = schema.message(1).unwrap().signals[0].unit.clone();
        assert_eq!(unit, Some("\u{B0}C".to_string()));
    }

    #[test]
    fn test_from_dbc_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_DBC.as_bytes()).unwrap();
        file.flush().unwrap();

        let schema = Schema::from_dbc_file(file.path()).unwrap();
        assert_eq!(schema.message_count(), 2);
        assert!(schema.message(512).is_some());
    }
}
