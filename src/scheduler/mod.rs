//! Gapless playback scheduling and barge-in handling
//!
//! Each decoded segment is placed back-to-back on the output clock: it
//! starts at `max(cursor, now)` and advances the cursor by its duration at
//! schedule time, so consecutive segments join without a gap as long as they
//! arrive ahead of their start. A segment that arrives late starts
//! immediately, which produces an audible gap; that is accepted behavior.
//!
//! The cursor and the active-handle set mutate together under one lock: a
//! segment being scheduled and an interruption clearing the set race
//! otherwise.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::audio::playback::{PlaybackHandle, PlaybackId, PlaybackSink};
use crate::codec::PcmDecoder;
use crate::error::{CodecError, PlaybackError};
use thiserror::Error;

/// Scheduling failure for one inbound segment
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error(transparent)]
    Decode(#[from] CodecError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

struct ScheduleState {
    /// Next gapless start time in output-clock seconds; advances at
    /// schedule time, not completion time
    cursor: f64,
    /// Handles of segments currently scheduled or playing
    active: HashMap<PlaybackId, PlaybackHandle>,
}

/// Decodes inbound payloads and schedules them gaplessly
pub struct PlaybackScheduler {
    sink: Arc<dyn PlaybackSink>,
    decoder: PcmDecoder,
    state: Mutex<ScheduleState>,
}

impl PlaybackScheduler {
    pub fn new(sink: Arc<dyn PlaybackSink>, decoder: PcmDecoder) -> Self {
        Self {
            sink,
            decoder,
            state: Mutex::new(ScheduleState {
                cursor: 0.0,
                active: HashMap::new(),
            }),
        }
    }

    /// Decode one received payload and schedule it after everything already
    /// queued. Returns the start time it was scheduled at.
    pub fn handle_segment(&self, payload: &[u8]) -> Result<f64, ScheduleError> {
        let segment = self.decoder.decode(payload)?;
        let duration = segment.duration();

        let mut state = self.state.lock();
        let start = state.cursor.max(self.sink.now());
        let handle = self.sink.schedule(segment, start)?;
        state.cursor = start + duration;
        state.active.insert(handle.id(), handle);

        tracing::debug!(start, duration, "segment scheduled");
        Ok(start)
    }

    /// Natural completion of one segment: drop its handle, nothing else
    pub fn finish(&self, id: PlaybackId) {
        self.state.lock().active.remove(&id);
    }

    /// Barge-in: hard-stop everything scheduled or playing and reset the
    /// cursor to zero. The `max(cursor, now)` clamp makes the next segment
    /// start at the current clock, so zero is not special-cased to "now".
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        let stopped = state.active.len();
        for (_, handle) in state.active.drain() {
            self.sink.stop(&handle);
        }
        state.cursor = 0.0;

        if stopped > 0 {
            tracing::info!(stopped, "playback interrupted");
        }
    }

    /// Current cursor position in output-clock seconds
    pub fn cursor(&self) -> f64 {
        self.state.lock().cursor
    }

    /// Number of segments currently scheduled or playing
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }
}
