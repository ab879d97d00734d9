//! Reply audio output
//!
//! Scheduled segments are mixed sample-accurately in the device callback
//! against a frame-counter clock, so back-to-back segments join without a
//! gap. The scheduling policy itself (cursor, active set, barge-in) lives in
//! [`crate::scheduler`]; this module only renders what it is told to.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::device::{default_output_device, device_name};
use crate::codec::InboundSegment;
use crate::config::AudioConfig;
use crate::error::PlaybackError;

/// Identifier of one scheduled segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

/// Live reference to one scheduled or playing segment
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: PlaybackId,
}

impl PlaybackHandle {
    pub fn new(id: PlaybackId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> PlaybackId {
        self.id
    }
}

/// Output device seam: schedule a segment at a time on the output clock,
/// hard-stop it, and read the clock.
///
/// `now` is the monotonic output-clock position in seconds. Natural
/// completions are reported through the channel handed to the concrete sink
/// at construction, carrying the finished segment's [`PlaybackId`].
pub trait PlaybackSink: Send + Sync {
    /// Monotonic output clock in seconds
    fn now(&self) -> f64;

    /// Schedule `segment` to start at `start_at` seconds on the output
    /// clock. A start time already in the past plays immediately.
    fn schedule(&self, segment: InboundSegment, start_at: f64)
        -> Result<PlaybackHandle, PlaybackError>;

    /// Hard-stop a scheduled or playing segment, with no completion report
    fn stop(&self, handle: &PlaybackHandle);
}

struct ScheduledSegment {
    id: PlaybackId,
    start_frame: u64,
    samples: Vec<f32>,
}

struct PlaybackShared {
    sample_rate: u32,
    /// Output clock basis: frames handed to the device so far
    frames_rendered: AtomicU64,
    next_id: AtomicU64,
    queue: Mutex<Vec<ScheduledSegment>>,
    done_tx: UnboundedSender<PlaybackId>,
}

impl PlaybackShared {
    /// Mix every scheduled segment overlapping this callback window
    fn render(&self, out: &mut [f32]) {
        out.fill(0.0);

        let base = self.frames_rendered.load(Ordering::Relaxed);
        let window_end = base + out.len() as u64;

        let mut queue = self.queue.lock();
        queue.retain(|seg| {
            let seg_end = seg.start_frame + seg.samples.len() as u64;

            if seg_end <= base {
                let _ = self.done_tx.send(seg.id);
                return false;
            }
            if seg.start_frame >= window_end {
                return true;
            }

            let from = seg.start_frame.max(base);
            let to = seg_end.min(window_end);
            let out_off = (from - base) as usize;
            let seg_off = (from - seg.start_frame) as usize;
            let count = (to - from) as usize;

            for i in 0..count {
                out[out_off + i] += seg.samples[seg_off + i];
            }

            if seg_end <= window_end {
                let _ = self.done_tx.send(seg.id);
                false
            } else {
                true
            }
        });
        drop(queue);

        self.frames_rendered
            .fetch_add(out.len() as u64, Ordering::Relaxed);
    }
}

/// Default-output-device playback via cpal.
///
/// Same dedicated-thread arrangement as capture: the stream is not `Send`,
/// so a thread owns it until the running flag drops.
pub struct AudioPlayback {
    device_label: String,
    shared: Arc<PlaybackShared>,
    running: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayback {
    /// Acquire the default output device and start the silent output stream.
    ///
    /// Natural completions are reported on `done_tx`.
    pub fn open(
        audio: &AudioConfig,
        done_tx: UnboundedSender<PlaybackId>,
    ) -> Result<Self, PlaybackError> {
        let device = default_output_device()?;
        let label = device_name(&device);

        let config = StreamConfig {
            channels: audio.channels,
            sample_rate: cpal::SampleRate(audio.playback_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(PlaybackShared {
            sample_rate: audio.playback_sample_rate,
            frames_rendered: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            queue: Mutex::new(Vec::new()),
            done_tx,
        });

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = bounded::<Result<(), PlaybackError>>(1);
        let shared_for_thread = shared.clone();
        let running_for_loop = running.clone();

        let handle = thread::Builder::new()
            .name("voice-playback".to_string())
            .spawn(move || {
                let render_shared = shared_for_thread.clone();
                let stream = device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        render_shared.render(data);
                    },
                    move |err| {
                        tracing::error!("playback stream error: {}", err);
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(PlaybackError::Stream(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));

                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Stream(e.to_string())));
                    }
                }
            })
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                tracing::info!(device = %label, rate = audio.playback_sample_rate, "playback started");
                Ok(Self {
                    device_label: label,
                    shared,
                    running,
                    thread_handle: Mutex::new(Some(handle)),
                })
            }
            Ok(Err(e)) => {
                running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                Err(PlaybackError::Stream(
                    "playback thread did not report readiness".to_string(),
                ))
            }
        }
    }

    /// Device name for logging
    pub fn device_label(&self) -> &str {
        &self.device_label
    }

    fn close(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
            tracing::debug!(device = %self.device_label, "playback stopped");
        }
    }
}

impl PlaybackSink for AudioPlayback {
    fn now(&self) -> f64 {
        self.shared.frames_rendered.load(Ordering::Relaxed) as f64
            / self.shared.sample_rate as f64
    }

    fn schedule(
        &self,
        segment: InboundSegment,
        start_at: f64,
    ) -> Result<PlaybackHandle, PlaybackError> {
        let samples = segment.into_mono();

        let id = PlaybackId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let requested = (start_at.max(0.0) * self.shared.sample_rate as f64).round() as u64;
        let now_frame = self.shared.frames_rendered.load(Ordering::Relaxed);
        // A start time already in the past plays immediately from the top
        let start_frame = requested.max(now_frame);

        self.shared.queue.lock().push(ScheduledSegment {
            id,
            start_frame,
            samples,
        });

        Ok(PlaybackHandle::new(id))
    }

    fn stop(&self, handle: &PlaybackHandle) {
        self.shared.queue.lock().retain(|seg| seg.id != handle.id());
    }
}

impl Drop for AudioPlayback {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn shared(rate: u32) -> (Arc<PlaybackShared>, tokio::sync::mpsc::UnboundedReceiver<PlaybackId>) {
        let (done_tx, done_rx) = unbounded_channel();
        let shared = Arc::new(PlaybackShared {
            sample_rate: rate,
            frames_rendered: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
            queue: Mutex::new(Vec::new()),
            done_tx,
        });
        (shared, done_rx)
    }

    #[test]
    fn test_render_mixes_at_start_frame() {
        let (shared, _done_rx) = shared(24000);
        shared.queue.lock().push(ScheduledSegment {
            id: PlaybackId(0),
            start_frame: 4,
            samples: vec![0.5; 4],
        });

        let mut out = vec![0.0f32; 8];
        shared.render(&mut out);

        assert_eq!(&out[..4], &[0.0; 4]);
        assert_eq!(&out[4..], &[0.5; 4]);
    }

    #[test]
    fn test_render_reports_completion() {
        let (shared, mut done_rx) = shared(24000);
        shared.queue.lock().push(ScheduledSegment {
            id: PlaybackId(7),
            start_frame: 0,
            samples: vec![0.1; 8],
        });

        let mut out = vec![0.0f32; 16];
        shared.render(&mut out);

        assert_eq!(done_rx.try_recv().unwrap(), PlaybackId(7));
        assert!(shared.queue.lock().is_empty());
    }

    #[test]
    fn test_segment_spans_callbacks() {
        let (shared, mut done_rx) = shared(24000);
        shared.queue.lock().push(ScheduledSegment {
            id: PlaybackId(1),
            start_frame: 0,
            samples: vec![0.2; 12],
        });

        let mut out = vec![0.0f32; 8];
        shared.render(&mut out);
        assert_eq!(&out[..], &[0.2; 8]);
        assert!(done_rx.try_recv().is_err());

        shared.render(&mut out);
        assert_eq!(&out[..4], &[0.2; 4]);
        assert_eq!(&out[4..], &[0.0; 4]);
        assert_eq!(done_rx.try_recv().unwrap(), PlaybackId(1));
    }
}
