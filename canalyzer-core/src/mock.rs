//! Mock CAN traffic generator
//!
//! Test/demo collaborator that emits frames conforming to the same
//! ingestion contract as real logs: IDs drawn from the schema under test
//! (or an explicit ID list) and monotonically increasing timestamps. The
//! random-value policy beyond that is deliberately unspecified.

use crate::schema::Schema;
use crate::types::RawFrame;
use rand::Rng;

/// Generate `count` mock frames with IDs and payload lengths drawn from
/// the schema's message definitions
pub fn generate(schema: &Schema, count: usize, rng: &mut impl Rng) -> Vec<RawFrame> {
    let defs: Vec<(u32, usize)> = schema.messages().map(|m| (m.id, m.length)).collect();
    generate_from(&defs, count, rng)
}

/// Generate `count` mock frames with the given IDs and 8-byte payloads
pub fn generate_with_ids(ids: &[u32], count: usize, rng: &mut impl Rng) -> Vec<RawFrame> {
    let defs: Vec<(u32, usize)> = ids.iter().map(|&id| (id, 8)).collect();
    generate_from(&defs, count, rng)
}

fn generate_from(defs: &[(u32, usize)], count: usize, rng: &mut impl Rng) -> Vec<RawFrame> {
    if defs.is_empty() {
        log::warn!("mock generator invoked without any message IDs");
        return Vec::new();
    }

    let mut timestamp = 0.0;
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        // Inter-frame gaps of 1-50 ms keep timestamps strictly increasing.
        timestamp += rng.gen_range(0.001..0.05);
        let (id, length) = defs[rng.gen_range(0..defs.len())];
        let data = (0..length).map(|_| rng.gen()).collect();
        frames.push(RawFrame {
            timestamp,
            id,
            data,
        });
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mock_frames_honor_schema() {
        let schema = Schema::parse(
            "BO_ 256 A: 8 E\n SG_ S : 0|8@1+ (1,0) [0|0] \"\" E\nBO_ 512 B: 4 E\n SG_ T : 0|8@1+ (1,0) [0|0] \"\" E\n",
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let frames = generate(&schema, 200, &mut rng);
        assert_eq!(frames.len(), 200);

        for frame in &frames {
            match frame.id {
                256 => assert_eq!(frame.data.len(), 8),
                512 => assert_eq!(frame.data.len(), 4),
                other => panic!("unexpected mock ID {}", other),
            }
        }
        // Strictly increasing timestamps, ingestion contract.
        for pair in frames.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_mock_with_explicit_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let frames = generate_with_ids(&[0x100, 0x101, 0x200], 50, &mut rng);
        assert_eq!(frames.len(), 50);
        assert!(frames.iter().all(|f| f.data.len() == 8));
        assert!(frames
            .iter()
            .all(|f| [0x100, 0x101, 0x200].contains(&f.id)));
    }

    #[test]
    fn test_mock_without_ids_is_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(generate_with_ids(&[], 10, &mut rng).is_empty());
    }
}
