//! Playback controller: the state machine over the timeline
//!
//! A [`Player`] owns the installed timeline and schema and is mutated by
//! exactly one actor at a time (a timer tick for autoplay, or a direct
//! user action for seek/step/load). Navigation never errors: out-of-range
//! seeks and steps clamp silently.
//!
//! Autoplay is driven externally: `play()` hands out a [`PlayToken`] and
//! the navigation driver calls `tick()` with it at `tick_interval()`
//! cadence. Pausing invalidates outstanding tokens, so a pending tick that
//! arrives after cancellation is a no-op instead of resurrecting playback.

use crate::decoder;
use crate::schema::{MessageDef, Schema};
use crate::timeline::Timeline;
use crate::types::{DecodedFrame, RawFrame, Warning};
use std::time::Duration;

const DEFAULT_RATE_FPS: f64 = 20.0;

/// Playback state of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// No timeline loaded
    Empty,
    /// Timeline loaded, cursor parked
    Paused,
    /// Cursor advancing on each valid tick
    Playing,
}

/// Capability to advance playback, valid for one play run
///
/// Minted by [`Player::play`] and invalidated by `pause()`, a new `load()`
/// or the end of the run; a stale token makes `tick()` a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayToken(u64);

/// Everything the rendering collaborator gets for one cursor position
#[derive(Debug)]
pub struct CursorView<'a> {
    /// Raw frame at the cursor
    pub frame: &'a RawFrame,
    /// Decoded signal values, when a schema is installed
    pub decoded: Option<&'a DecodedFrame>,
    /// Matched message definition, for signal metadata such as units
    pub message_def: Option<&'a MessageDef>,
    /// Warnings collected while parsing the installed schema
    pub schema_warnings: &'a [Warning],
    /// Warnings collected while loading the installed timeline
    pub load_warnings: &'a [Warning],
}

/// State machine over the timeline exposing play/pause/step/seek
pub struct Player {
    timeline: Option<Timeline>,
    schema: Option<Schema>,
    cursor: usize,
    status: PlaybackStatus,
    rate_fps: f64,
    generation: u64,
    decoded: Option<DecodedFrame>,
}

impl Player {
    pub fn new() -> Self {
        Self {
            timeline: None,
            schema: None,
            cursor: 0,
            status: PlaybackStatus::Empty,
            rate_fps: DEFAULT_RATE_FPS,
            generation: 0,
            decoded: None,
        }
    }

    /// Install a fully built timeline, replacing any previous one
    ///
    /// From any prior state the player ends up Paused at cursor 0. The
    /// swap is whole-object: a reader never observes a partially built log.
    pub fn load(&mut self, timeline: Timeline) {
        log::info!("timeline loaded: {} frames", timeline.len());
        self.timeline = Some(timeline);
        self.status = if self.timeline.as_ref().is_some_and(|t| !t.is_empty()) {
            PlaybackStatus::Paused
        } else {
            PlaybackStatus::Empty
        };
        self.generation += 1;
        self.set_cursor(0);
    }

    /// Install a fully built schema, replacing any previous one
    ///
    /// The cursor and run state are preserved; the next cursor change
    /// re-decodes with the new schema.
    pub fn load_schema(&mut self, schema: Schema) {
        log::info!("schema loaded: {} messages", schema.message_count());
        self.schema = Some(schema);
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Current cursor index (0 when nothing is loaded)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// Playback rate in frames per second
    pub fn rate(&self) -> f64 {
        self.rate_fps
    }

    /// Set the playback rate; non-finite or non-positive rates are refused
    pub fn set_rate(&mut self, fps: f64) {
        if fps.is_finite() && fps > 0.0 {
            self.rate_fps = fps;
        } else {
            log::warn!("ignoring invalid playback rate {}", fps);
        }
    }

    /// Interval at which the navigation driver should call `tick()`
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_fps)
    }

    /// Start playing
    ///
    /// Paused at the final frame wraps to index 0 first, so a finished run
    /// can be replayed. Returns the token the driver must tick with, or
    /// `None` when no timeline is loaded. Already Playing returns the
    /// current token without other effect.
    pub fn play(&mut self) -> Option<PlayToken> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        if self.status == PlaybackStatus::Playing {
            return Some(PlayToken(self.generation));
        }
        if self.cursor + 1 >= len {
            self.set_cursor(0);
        }
        self.status = PlaybackStatus::Playing;
        self.generation += 1;
        Some(PlayToken(self.generation))
    }

    /// Stop advancing; outstanding tokens become no-ops
    pub fn pause(&mut self) {
        if self.status == PlaybackStatus::Playing {
            self.status = PlaybackStatus::Paused;
            self.generation += 1;
        }
    }

    /// Advance the cursor by one frame for a current token
    ///
    /// Reaching the final frame transitions to Paused (end of run, not end
    /// of machine). Returns false - with no state change - when the token
    /// is stale or the player is not Playing.
    pub fn tick(&mut self, token: &PlayToken) -> bool {
        if self.status != PlaybackStatus::Playing || token.0 != self.generation {
            log::trace!("stale tick ignored");
            return false;
        }
        let len = self.len();
        if self.cursor + 1 < len {
            self.set_cursor(self.cursor + 1);
        }
        if self.cursor + 1 >= len {
            self.status = PlaybackStatus::Paused;
            self.generation += 1;
        }
        true
    }

    /// Move the cursor, clamped to the valid range; run state unchanged
    pub fn seek(&mut self, index: usize) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.set_cursor(index.min(len - 1));
    }

    /// Move the cursor by `delta` frames, clamped; implicitly pauses
    pub fn step(&mut self, delta: i64) {
        let len = self.len();
        if len == 0 {
            return;
        }
        self.pause();
        let target = (self.cursor as i64)
            .saturating_add(delta)
            .clamp(0, len as i64 - 1);
        self.set_cursor(target as usize);
    }

    /// The rendering-collaborator boundary: raw frame, decoded values (if
    /// a schema is installed) and the collected warnings for the cursor
    pub fn view(&self) -> Option<CursorView<'_>> {
        let frame = self.timeline.as_ref()?.frame_at(self.cursor)?;
        Some(CursorView {
            frame,
            decoded: self.decoded.as_ref(),
            message_def: self.schema.as_ref().and_then(|s| s.message(frame.id)),
            schema_warnings: self.schema.as_ref().map_or(&[], |s| s.warnings()),
            load_warnings: self.timeline.as_ref().map_or(&[], |t| t.warnings()),
        })
    }

    fn len(&self) -> usize {
        self.timeline.as_ref().map_or(0, Timeline::len)
    }

    /// Sole decoder call site: every cursor change re-decodes exactly the
    /// frame at the cursor, never the whole log.
    fn set_cursor(&mut self, index: usize) {
        self.cursor = index;
        let decoded = match (&self.schema, &self.timeline) {
            (Some(schema), Some(timeline)) => timeline
                .frame_at(self.cursor)
                .map(|frame| decoder::decode(schema, frame)),
            _ => None,
        };
        self.decoded = decoded;
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}
