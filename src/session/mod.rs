//! Session lifecycle
//!
//! A [`VoiceSession`] is an explicitly owned handle: the caller creates it,
//! starts it, and disposes of it. One inbound event loop task consumes
//! transport events, captured frames, and playback completions, so delivery
//! order per channel is preserved and no hidden global state exists.
//!
//! ```text
//! Standby ──start()──▶ Connecting ──Opened──▶ Connected ──stop()/Closed──▶ Closed
//!                          │                      │
//!                          └──open failure──▶ Failed ◀──transport Error──┘
//! ```
//!
//! No automatic reconnection: after `Closed` or `Failed`, a new `start` is
//! required. Each start bumps a run epoch; a loop from a previous run can
//! never act on the current one.

use parking_lot::Mutex;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::audio::frame::AudioFrame;
use crate::audio::playback::PlaybackId;
use crate::audio::{AudioBackend, CaptureSource};
use crate::codec::{PcmDecoder, PcmEncoder};
use crate::config::{AudioConfig, SessionConfig};
use crate::error::{Result, SessionError};
use crate::scheduler::PlaybackScheduler;
use crate::transport::{Transport, TransportEvent, TransportHandle};

/// Lifecycle state of a voice session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, never started
    Standby,
    /// Devices acquired, waiting for the endpoint to accept the setup
    Connecting,
    /// Duplex streaming in progress
    Connected,
    /// Ended by the caller or a graceful remote close; terminal
    Closed,
    /// Ended by a startup or transport failure; terminal
    Failed,
}

struct RunState {
    state: SessionState,
    /// Incremented on every `start`; stale loops compare against it
    epoch: u64,
    /// Inbound events are ignored once this drops; the guard is what makes
    /// `stop` idempotent
    active: bool,
}

struct SessionInner {
    id: Uuid,
    audio: AudioConfig,
    transport: Arc<dyn Transport>,
    backend: Arc<dyn AudioBackend>,
    run: Mutex<RunState>,
    closed: Notify,
    capture: Mutex<Option<Box<dyn CaptureSource>>>,
    handle: Mutex<Option<Box<dyn TransportHandle>>>,
    scheduler: Mutex<Option<Arc<PlaybackScheduler>>>,
}

impl SessionInner {
    /// Release everything exactly once and enter a terminal state.
    ///
    /// `epoch` restricts the teardown to one run; `None` means the current
    /// run (caller-initiated stop).
    fn teardown(&self, epoch: Option<u64>, terminal: SessionState) {
        {
            let mut run = self.run.lock();
            if !run.active {
                return;
            }
            if let Some(epoch) = epoch {
                if epoch != run.epoch {
                    return;
                }
            }
            run.active = false;
            run.state = terminal;
        }

        if let Some(capture) = self.capture.lock().take() {
            capture.stop();
        }
        if let Some(scheduler) = self.scheduler.lock().take() {
            scheduler.interrupt();
        }
        if let Some(handle) = self.handle.lock().take() {
            handle.close();
        }
        self.closed.notify_waiters();

        tracing::info!(session = %self.id, state = ?terminal, "session ended");
    }

    fn state(&self) -> SessionState {
        self.run.lock().state
    }

    /// Whether the given run is still the live, active one
    fn is_live(&self, epoch: u64) -> bool {
        let run = self.run.lock();
        run.active && run.epoch == epoch
    }
}

/// An owned duplex voice-streaming session
pub struct VoiceSession {
    inner: Arc<SessionInner>,
}

impl VoiceSession {
    /// Create a session in `Standby` with default audio parameters
    pub fn new(transport: Arc<dyn Transport>, backend: Arc<dyn AudioBackend>) -> Self {
        Self::with_audio_config(transport, backend, AudioConfig::default())
    }

    /// Create a session in `Standby` with explicit audio parameters
    pub fn with_audio_config(
        transport: Arc<dyn Transport>,
        backend: Arc<dyn AudioBackend>,
        audio: AudioConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                audio,
                transport,
                backend,
                run: Mutex::new(RunState {
                    state: SessionState::Standby,
                    epoch: 0,
                    active: false,
                }),
                closed: Notify::new(),
                capture: Mutex::new(None),
                handle: Mutex::new(None),
                scheduler: Mutex::new(None),
            }),
        }
    }

    /// Start streaming.
    ///
    /// Acquires the capture and playback devices first, so a missing or
    /// denied microphone aborts before any transport interaction, then
    /// opens the transport and spawns the event loop. The encode/send
    /// pipeline only attaches once the endpoint reports `Opened`.
    ///
    /// Fails with [`SessionError::AlreadyActive`] while a session is
    /// `Connecting` or `Connected`; after `Closed` or `Failed` a fresh
    /// `start` is accepted.
    pub async fn start(&self, config: SessionConfig) -> Result<()> {
        let inner = &self.inner;

        let epoch = {
            let mut run = inner.run.lock();
            match run.state {
                SessionState::Connecting | SessionState::Connected => {
                    return Err(SessionError::AlreadyActive.into());
                }
                _ => {
                    run.state = SessionState::Connecting;
                    run.epoch += 1;
                    run.epoch
                }
            }
        };
        tracing::info!(session = %inner.id, model = %config.model, "session connecting");

        let capture = match inner.backend.open_capture(&inner.audio) {
            Ok(capture) => capture,
            Err(e) => {
                inner.run.lock().state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let (done_tx, done_rx) = unbounded_channel();
        let sink = match inner.backend.open_playback(&inner.audio, done_tx) {
            Ok(sink) => sink,
            Err(e) => {
                inner.run.lock().state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let (handle, events) = match inner.transport.open(config).await {
            Ok(pair) => pair,
            Err(e) => {
                inner.run.lock().state = SessionState::Failed;
                return Err(e.into());
            }
        };

        let scheduler = Arc::new(PlaybackScheduler::new(
            sink,
            PcmDecoder::new(inner.audio.playback_sample_rate, inner.audio.channels),
        ));

        *inner.capture.lock() = Some(capture);
        *inner.handle.lock() = Some(handle);
        *inner.scheduler.lock() = Some(scheduler.clone());
        inner.run.lock().active = true;

        let (frames_tx, frames_rx) = unbounded_channel();
        tokio::spawn(run_loop(
            inner.clone(),
            epoch,
            events,
            frames_tx,
            frames_rx,
            done_rx,
            scheduler,
        ));

        Ok(())
    }

    /// End the session.
    ///
    /// Idempotent: the first call releases the capture device, stops all
    /// playback, and closes the transport; later calls and any inbound
    /// events that were still in flight are ignored.
    pub fn stop(&self) {
        self.inner.teardown(None, SessionState::Closed);
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    /// Session identifier, stable across its lifetime
    pub fn id(&self) -> Uuid {
        self.inner.id
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.inner.teardown(None, SessionState::Closed);
    }
}

async fn run_loop(
    inner: Arc<SessionInner>,
    epoch: u64,
    mut events: UnboundedReceiver<TransportEvent>,
    frames_tx: UnboundedSender<AudioFrame>,
    mut frames_rx: UnboundedReceiver<AudioFrame>,
    mut done_rx: UnboundedReceiver<PlaybackId>,
    scheduler: Arc<PlaybackScheduler>,
) {
    let encoder = PcmEncoder::new();

    loop {
        if !inner.is_live(epoch) {
            break;
        }

        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => {
                        if !inner.is_live(epoch) {
                            break;
                        }
                        if handle_event(&inner, epoch, &scheduler, &frames_tx, event).is_break() {
                            break;
                        }
                    }
                    None => {
                        // Reader dropped without a terminal event
                        inner.teardown(Some(epoch), SessionState::Failed);
                        break;
                    }
                }
            }
            Some(id) = done_rx.recv() => {
                scheduler.finish(id);
            }
            Some(frame) = frames_rx.recv() => {
                let connected = {
                    let run = inner.run.lock();
                    run.active && run.epoch == epoch && run.state == SessionState::Connected
                };
                if connected {
                    let chunk = encoder.encode(&frame);
                    if let Some(handle) = inner.handle.lock().as_ref() {
                        handle.send(chunk);
                    }
                }
            }
            _ = inner.closed.notified() => {
                break;
            }
        }
    }
}

fn handle_event(
    inner: &Arc<SessionInner>,
    epoch: u64,
    scheduler: &PlaybackScheduler,
    frames_tx: &UnboundedSender<AudioFrame>,
    event: TransportEvent,
) -> ControlFlow<()> {
    match event {
        TransportEvent::Opened => {
            let accepted = {
                let mut run = inner.run.lock();
                if run.epoch == epoch && run.state == SessionState::Connecting {
                    run.state = SessionState::Connected;
                    true
                } else {
                    false
                }
            };
            if !accepted {
                tracing::warn!(session = %inner.id, "duplicate Opened event ignored");
                return ControlFlow::Continue(());
            }
            tracing::info!(session = %inner.id, "session connected");

            // Attach the encode/send pipeline to capture
            let started = inner
                .capture
                .lock()
                .as_ref()
                .map(|capture| capture.start(frames_tx.clone()));
            match started {
                Some(Ok(())) => ControlFlow::Continue(()),
                Some(Err(e)) => {
                    tracing::error!(session = %inner.id, "capture failed to start: {}", e);
                    inner.teardown(Some(epoch), SessionState::Failed);
                    ControlFlow::Break(())
                }
                None => ControlFlow::Break(()),
            }
        }
        TransportEvent::AudioSegment(payload) => {
            if inner.state() != SessionState::Connected {
                tracing::warn!(session = %inner.id, "audio segment before open rejected");
                return ControlFlow::Continue(());
            }
            if let Err(e) = scheduler.handle_segment(&payload) {
                tracing::warn!(session = %inner.id, "inbound segment skipped: {}", e);
            }
            ControlFlow::Continue(())
        }
        TransportEvent::Interrupted => {
            if inner.state() != SessionState::Connected {
                tracing::warn!(session = %inner.id, "interruption before open rejected");
                return ControlFlow::Continue(());
            }
            scheduler.interrupt();
            ControlFlow::Continue(())
        }
        TransportEvent::Closed => {
            inner.teardown(Some(epoch), SessionState::Closed);
            ControlFlow::Break(())
        }
        TransportEvent::Error(e) => {
            tracing::error!(session = %inner.id, "transport error: {}", e);
            inner.teardown(Some(epoch), SessionState::Failed);
            ControlFlow::Break(())
        }
    }
}
