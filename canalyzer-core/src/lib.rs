//! OpenCANalyzer core library
//!
//! Decodes recorded CAN bus traffic into human-meaningful signal values
//! and lets a front end navigate the resulting timeline:
//! - Parses DBC schema text into an immutable [`Schema`]
//! - Decodes raw frames into bit-packed, scaled physical values with
//!   correct byte-order semantics
//! - Ingests CSV or BusMaster logs (or mock traffic) into a time-ordered
//!   [`Timeline`]
//! - Drives play/pause/step/seek navigation through a [`Player`]
//!
//! The library does NOT render anything: per cursor position it exposes
//! `(raw_frame, decoded_frame_or_none, schema_warnings, load_warnings)`
//! and the rendering collaborator (see canalyzer-cli) takes it from there.
//!
//! # Example Usage
//!
//! ```
//! use canalyzer_core::{Player, Schema, Timeline};
//!
//! let schema = Schema::parse(
//!     "BO_ 256 EngineData: 8 ECU1\n \
//!      SG_ EngineSpeed : 0|16@1+ (0.25,0) [0|8000] \"rpm\" ECU2\n",
//! )
//! .unwrap();
//! let timeline = Timeline::from_csv("0.001,0x100,E803000000000000\n").unwrap();
//!
//! let mut player = Player::new();
//! player.load_schema(schema);
//! player.load(timeline);
//!
//! let view = player.view().unwrap();
//! let decoded = view.decoded.unwrap();
//! assert_eq!(decoded.signals["EngineSpeed"].as_f64(), Some(250.0));
//! ```

pub mod decoder;
pub mod mock;
pub mod playback;
pub mod schema;
pub mod timeline;
pub mod types;

// Re-export main types for convenience
pub use decoder::{decode, signal_trace};
pub use playback::{CursorView, PlayToken, PlaybackStatus, Player};
pub use schema::{ByteOrder, MessageDef, Schema, SignalDef};
pub use timeline::Timeline;
pub use types::{
    DecodeFailure, DecodedFrame, LoadError, ParseError, RawFrame, SignalValue, Warning,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
