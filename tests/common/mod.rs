//! Shared test doubles: a channel-backed transport and a hardware-free
//! audio backend with a manually driven output clock.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use live_voice_streamer::audio::frame::AudioFrame;
use live_voice_streamer::audio::{
    AudioBackend, CaptureSource, PlaybackHandle, PlaybackId, PlaybackSink,
};
use live_voice_streamer::codec::{EncodedChunk, InboundSegment};
use live_voice_streamer::config::{AudioConfig, SessionConfig};
use live_voice_streamer::error::{CaptureError, PlaybackError, TransportError};
use live_voice_streamer::transport::{Transport, TransportEvent, TransportHandle};

/// Test-side view of a mock connection
pub struct MockLink {
    events: Mutex<Option<UnboundedSender<TransportEvent>>>,
    pub sent: Mutex<Vec<EncodedChunk>>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub fail_open: AtomicBool,
}

impl MockLink {
    pub fn emit(&self, event: TransportEvent) {
        let guard = self.events.lock();
        let tx = guard.as_ref().expect("transport not open");
        let _ = tx.send(event);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

pub struct MockTransport {
    pub link: Arc<MockLink>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            link: Arc::new(MockLink {
                events: Mutex::new(None),
                sent: Mutex::new(Vec::new()),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                fail_open: AtomicBool::new(false),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        _config: SessionConfig,
    ) -> Result<(Box<dyn TransportHandle>, UnboundedReceiver<TransportEvent>), TransportError>
    {
        if self.link.fail_open.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        self.link.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded_channel();
        *self.link.events.lock() = Some(tx);

        let handle = MockHandle {
            link: self.link.clone(),
            closed: AtomicBool::new(false),
        };
        Ok((Box::new(handle), rx))
    }
}

struct MockHandle {
    link: Arc<MockLink>,
    closed: AtomicBool,
}

impl TransportHandle for MockHandle {
    fn send(&self, chunk: EncodedChunk) {
        self.link.sent.lock().push(chunk);
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.link.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Capture double the test can feed frames through
pub struct MockCaptureState {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub fail_open: AtomicBool,
    frames: Mutex<Option<UnboundedSender<AudioFrame>>>,
}

impl MockCaptureState {
    pub fn feed(&self, frame: AudioFrame) {
        let guard = self.frames.lock();
        let tx = guard.as_ref().expect("capture not started");
        let _ = tx.send(frame);
    }
}

struct MockCapture {
    state: Arc<MockCaptureState>,
}

impl CaptureSource for MockCapture {
    fn start(&self, frames: UnboundedSender<AudioFrame>) -> Result<(), CaptureError> {
        // Sender first: a `starts` observer must be able to feed immediately
        *self.state.frames.lock() = Some(frames);
        self.state.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        self.state.frames.lock().take();
    }
}

/// Output sink with a manually driven clock
pub struct MockSink {
    clock: Mutex<f64>,
    next_id: AtomicUsize,
    pub scheduled: Mutex<Vec<(PlaybackId, f64, f64)>>,
    pub stopped: Mutex<Vec<PlaybackId>>,
    done: Mutex<Option<UnboundedSender<PlaybackId>>>,
}

impl MockSink {
    pub fn advance_to(&self, t: f64) {
        *self.clock.lock() = t;
    }

    /// Report natural completion of a scheduled segment
    pub fn complete(&self, id: PlaybackId) {
        let guard = self.done.lock();
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(id);
        }
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.lock().len()
    }
}

impl PlaybackSink for MockSink {
    fn now(&self) -> f64 {
        *self.clock.lock()
    }

    fn schedule(
        &self,
        segment: InboundSegment,
        start_at: f64,
    ) -> Result<PlaybackHandle, PlaybackError> {
        let id = PlaybackId(self.next_id.fetch_add(1, Ordering::SeqCst) as u64);
        self.scheduled.lock().push((id, start_at, segment.duration()));
        Ok(PlaybackHandle::new(id))
    }

    fn stop(&self, handle: &PlaybackHandle) {
        self.stopped.lock().push(handle.id());
    }
}

pub struct MockBackend {
    pub capture: Arc<MockCaptureState>,
    pub sink: Arc<MockSink>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            capture: Arc::new(MockCaptureState {
                starts: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                fail_open: AtomicBool::new(false),
                frames: Mutex::new(None),
            }),
            sink: Arc::new(MockSink {
                clock: Mutex::new(0.0),
                next_id: AtomicUsize::new(0),
                scheduled: Mutex::new(Vec::new()),
                stopped: Mutex::new(Vec::new()),
                done: Mutex::new(None),
            }),
        }
    }
}

impl AudioBackend for MockBackend {
    fn open_capture(&self, _audio: &AudioConfig) -> Result<Box<dyn CaptureSource>, CaptureError> {
        if self.capture.fail_open.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceNotFound("no microphone".to_string()));
        }
        Ok(Box::new(MockCapture {
            state: self.capture.clone(),
        }))
    }

    fn open_playback(
        &self,
        _audio: &AudioConfig,
        done_tx: UnboundedSender<PlaybackId>,
    ) -> Result<Arc<dyn PlaybackSink>, PlaybackError> {
        *self.sink.done.lock() = Some(done_tx);
        Ok(self.sink.clone())
    }
}

/// Poll `condition` until it holds or the timeout elapses
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within timeout");
}
