//! Microphone capture
//!
//! The cpal stream is not `Send`, so it lives on a dedicated thread for the
//! lifetime of the capture, the same way each track capture runs in its own
//! thread in a multi-track streamer.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::audio::device::{default_input_device, device_name};
use crate::audio::frame::{AudioFrame, FrameChunker};
use crate::config::AudioConfig;
use crate::error::CaptureError;

/// Source of fixed-size captured audio blocks.
///
/// Acquisition happens at construction so device failures surface before any
/// transport interaction; `start` begins block emission. All methods take
/// `&self` to keep the trait object-safe; interior mutability handles the
/// stream thread state.
pub trait CaptureSource: Send + Sync {
    /// Begin emitting blocks, in capture order, into `frames`
    fn start(&self, frames: UnboundedSender<AudioFrame>) -> Result<(), CaptureError>;

    /// Stop the stream and release the device; safe to call repeatedly
    fn stop(&self);
}

/// Default-input-device capture via cpal
pub struct MicSource {
    device_label: String,
    config: StreamConfig,
    block_size: usize,
    running: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MicSource {
    /// Resolve the default input device and validate it.
    ///
    /// Fails with `DeviceNotFound` when no device is present or the platform
    /// denies access, before any stream is built.
    pub fn open(audio: &AudioConfig) -> Result<Self, CaptureError> {
        if audio.channels != 1 {
            return Err(CaptureError::UnsupportedFormat(format!(
                "{} channels requested; capture is mono",
                audio.channels
            )));
        }

        let device = default_input_device()?;
        let label = device_name(&device);

        let config = StreamConfig {
            channels: audio.channels,
            sample_rate: cpal::SampleRate(audio.capture_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::debug!(device = %label, rate = audio.capture_sample_rate, "capture device acquired");

        Ok(Self {
            device_label: label,
            config,
            block_size: audio.block_size,
            running: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        })
    }

    /// Device name for logging
    pub fn device_label(&self) -> &str {
        &self.device_label
    }
}

impl CaptureSource for MicSource {
    fn start(&self, frames: UnboundedSender<AudioFrame>) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let config = self.config.clone();
        let block_size = self.block_size;
        let sample_rate = self.config.sample_rate.0;
        let channels = self.config.channels;

        let handle = thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || {
                let device = match default_input_device() {
                    Ok(d) => d,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let mut chunker = FrameChunker::new(block_size, sample_rate, channels);

                let stream = device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }
                        chunker.push(data, |frame| {
                            // Receiver dropped means the session is tearing
                            // down; the stream thread exits on the flag.
                            let _ = frames.send(frame);
                        });
                    },
                    move |err| {
                        tracing::error!("capture stream error: {}", err);
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
                            return;
                        }
                        let _ = ready_tx.send(Ok(()));

                        // Keep thread alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(Duration::from_millis(10));
                        }
                        // Stream is dropped here, releasing the device
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
                    }
                }
            })
            .map_err(|e| CaptureError::Stream(e.to_string()))?;

        *self.thread_handle.lock() = Some(handle);

        match ready_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => {
                tracing::info!(device = %self.device_label, "capture started");
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(CaptureError::Stream(
                    "capture thread did not report readiness".to_string(),
                ))
            }
        }
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
            tracing::debug!(device = %self.device_label, "capture stopped");
        }
    }
}

impl Drop for MicSource {
    fn drop(&mut self) {
        self.stop();
    }
}
