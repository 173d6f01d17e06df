//! Microphone capture through cpal.
//!
//! cpal streams are not `Send` on every platform, so the stream lives on a
//! dedicated thread that holds it until `stop` (or drop) signals it.

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::convert::{f32_to_i16, process_frame, Resampler};
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            stop_tx: None,
            thread: None,
        }
    }

    fn signal_stop(&mut self) -> Option<JoinHandle<()>> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.capturing.store(false, Ordering::SeqCst);
        self.thread.take()
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing.load(Ordering::SeqCst) {
            bail!("Microphone capture already started");
        }

        let (frame_tx, frame_rx) = mpsc::channel(self.config.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let config = self.config.clone();

        let thread = std::thread::Builder::new()
            .name("microphone".to_string())
            .spawn(move || {
                let stream = match open_input_stream(&config, frame_tx) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                // Hold the stream until stop is signalled or the backend is dropped
                let _ = stop_rx.recv();
                drop(stream);
                debug!("Microphone stream released");
            })
            .context("Failed to spawn microphone thread")?;

        ready_rx
            .await
            .map_err(|_| anyhow!("Microphone thread exited before reporting"))??;

        self.stop_tx = Some(stop_tx);
        self.thread = Some(thread);
        self.capturing.store(true, Ordering::SeqCst);

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.signal_stop() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || thread.join())
            .await
            .context("Microphone join task failed")?
            .map_err(|_| anyhow!("Microphone thread panicked"))?;

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        if self.signal_stop().is_some() {
            warn!("Microphone backend dropped while capturing; stream released");
        }
    }
}

fn open_input_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<Stream> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device"))?;

    let supported = device
        .default_input_config()
        .context("Input device has no usable configuration")?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();

    let device_rate = stream_config.sample_rate.0;
    let device_channels = stream_config.channels;
    let target_rate = config.target_sample_rate;
    let target_channels = config.target_channels;
    let started = Instant::now();

    info!(
        "Opening input device {} ({} Hz, {} channels, {:?})",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        device_rate,
        device_channels,
        sample_format
    );

    let mut resampler = Resampler::new(device_rate, target_rate);
    let mut deliver = move |samples: Vec<i16>| {
        let frame = AudioFrame {
            samples,
            sample_rate: device_rate,
            channels: device_channels,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };
        let frame = process_frame(frame, &mut resampler, target_channels);
        // Never block the audio callback; a lagging consumer loses frames
        let _ = frame_tx.try_send(frame);
    };

    let on_error = |e: cpal::StreamError| error!("Microphone stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(data.iter().map(|&s| f32_to_i16(s)).collect())
            },
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| deliver(data.to_vec()),
            on_error,
            None,
        )?,
        other => bail!("Unsupported input sample format {:?}", other),
    };

    stream.play().context("Failed to start input stream")?;

    Ok(stream)
}
