//! End-to-end pipeline test: DBC text -> schema, CSV text -> timeline,
//! player navigation -> decoded signal values at the cursor.

use canalyzer_core::{
    decoder, PlaybackStatus, Player, Schema, SignalValue, Timeline,
};

const DBC: &str = r#"
VERSION ""

BU_: ECU1 DASH

BO_ 256 EngineData: 8 ECU1
 SG_ EngineSpeed : 0|16@1+ (0.25,0) [0|8000] "rpm" DASH
 SG_ CoolantTemp : 16|8@1+ (1,-40) [-40|215] "C" DASH

BO_ 257 GearboxData: 2 ECU1
 SG_ GearPosition : 7|8@0- (1,0) [-1|6] "" DASH
"#;

// One malformed row (bad timestamp) among valid ones; rows out of order
// on purpose to exercise the timeline sort.
const CSV: &str = "\
0.030,0x101,05,00
0.010,0x100,E803000000000000
oops,0x100,0000000000000000
0.020,0x100,D0072800000000FF
0.040,0x7FF,11,22
";

#[test]
fn full_pipeline_decodes_at_cursor() {
    let schema = Schema::parse(DBC).expect("schema parses");
    assert!(schema.warnings().is_empty());

    let timeline = Timeline::from_csv(CSV).expect("timeline loads");
    assert_eq!(timeline.len(), 4);
    assert_eq!(timeline.warnings().len(), 1);

    let mut player = Player::new();
    player.load_schema(schema);
    player.load(timeline);

    // Cursor 0: earliest frame after sorting (t=0.010).
    let view = player.view().unwrap();
    assert_eq!(view.frame.id, 0x100);
    assert_eq!(view.load_warnings.len(), 1);
    let decoded = view.decoded.unwrap();
    assert_eq!(decoded.message.as_deref(), Some("EngineData"));
    // raw 0x03E8 = 1000 * 0.25 = 250 rpm
    assert_eq!(decoded.signals["EngineSpeed"].as_f64(), Some(250.0));
    // raw 0x00 - 40
    assert_eq!(decoded.signals["CoolantTemp"].as_f64(), Some(-40.0));

    // Play the rest of the run to the end.
    let token = player.play().unwrap();
    let mut visited = vec![player.cursor()];
    while player.status() == PlaybackStatus::Playing {
        if !player.tick(&token) {
            break;
        }
        visited.push(player.cursor());
    }
    assert_eq!(visited, vec![0, 1, 2, 3]);
    assert_eq!(player.status(), PlaybackStatus::Paused);

    // Cursor 1 (t=0.020): raw 0x07D0 = 2000 * 0.25 = 500 rpm.
    player.seek(1);
    let view = player.view().unwrap();
    let decoded = view.decoded.unwrap();
    assert_eq!(decoded.signals["EngineSpeed"].as_f64(), Some(500.0));
    assert_eq!(decoded.signals["CoolantTemp"].as_f64(), Some(0.0));

    // Cursor 2 (t=0.030): big-endian signed gear position, raw 0x05.
    player.step(1);
    let decoded = player.view().unwrap().decoded.unwrap().clone();
    assert_eq!(decoded.message.as_deref(), Some("GearboxData"));
    assert_eq!(decoded.signals["GearPosition"].as_f64(), Some(5.0));

    // Cursor 3 (t=0.040): ID 0x7FF is not in the schema.
    player.step(1);
    let decoded = player.view().unwrap().decoded.unwrap().clone();
    assert!(!decoded.is_known());
    assert!(decoded.signals.is_empty());
}

#[test]
fn signal_trace_follows_one_signal_through_the_log() {
    let schema = Schema::parse(DBC).unwrap();
    let timeline = Timeline::from_csv(CSV).unwrap();

    let trace = decoder::signal_trace(&schema, &timeline, 0x100, "EngineSpeed");
    assert_eq!(trace, vec![(0.010, 250.0), (0.020, 500.0)]);

    // Unknown signal name yields an empty series, not an error.
    assert!(decoder::signal_trace(&schema, &timeline, 0x100, "Nope").is_empty());
}

#[test]
fn decoding_is_deterministic_across_calls() {
    let schema = Schema::parse(DBC).unwrap();
    let timeline = Timeline::from_csv(CSV).unwrap();
    for frame in timeline.frames() {
        let a = decoder::decode(&schema, frame);
        let b = decoder::decode(&schema, frame);
        assert_eq!(a, b);
    }
}

#[test]
fn replay_after_end_of_run_wraps() {
    let timeline = Timeline::from_csv(CSV).unwrap();
    let mut player = Player::new();
    player.load(timeline);

    let token = player.play().unwrap();
    while player.tick(&token) {}
    assert_eq!(player.cursor(), 3);

    // play() from the end wraps to index 0 for a repeatable demo.
    player.play().unwrap();
    assert_eq!(player.cursor(), 0);
    assert_eq!(player.status(), PlaybackStatus::Playing);
}

#[test]
fn partial_decode_on_truncated_payload() {
    let schema = Schema::parse(DBC).unwrap();
    // EngineData declared as 8 bytes, only 3 present: EngineSpeed (bits
    // 0..16) decodes, CoolantTemp (bits 16..24) decodes, nothing fails.
    let timeline = Timeline::from_csv("0.0,0x100,E8,03,29\n").unwrap();
    let decoded = decoder::decode(&schema, timeline.frame_at(0).unwrap());
    assert_eq!(decoded.signals["EngineSpeed"].as_f64(), Some(250.0));
    assert_eq!(decoded.signals["CoolantTemp"].as_f64(), Some(1.0));

    // With 2 bytes, CoolantTemp's range falls outside the payload.
    let timeline = Timeline::from_csv("0.0,0x100,E8,03\n").unwrap();
    let decoded = decoder::decode(&schema, timeline.frame_at(0).unwrap());
    assert_eq!(decoded.signals["EngineSpeed"].as_f64(), Some(250.0));
    assert!(matches!(
        decoded.signals["CoolantTemp"],
        SignalValue::Failed(_)
    ));
}
