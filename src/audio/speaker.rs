//! Playback of the provider's synthesized audio through cpal.

use super::backend::{AudioFrame, AudioSink};
use super::convert::{i16_to_f32, process_frame, Resampler};
use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// Upper bound on queued playback (~10 s at 48 kHz)
const MAX_QUEUED_SAMPLES: usize = 480_000;

type PlaybackQueue = Arc<Mutex<VecDeque<i16>>>;

/// Default output device; the stream runs for the sink's lifetime
pub struct SpeakerSink {
    queue: PlaybackQueue,
    /// Source rate follows the incoming frames; target is the device rate
    resampler: Mutex<Resampler>,
    // Dropping the sender ends the playback thread
    _stop_tx: std::sync::mpsc::Sender<()>,
}

impl SpeakerSink {
    pub fn open() -> Result<Self> {
        let queue: PlaybackQueue = Arc::new(Mutex::new(VecDeque::new()));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<u32>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let thread_queue = Arc::clone(&queue);
        std::thread::Builder::new()
            .name("speaker".to_string())
            .spawn(move || {
                let (stream, rate) = match open_output_stream(thread_queue) {
                    Ok(opened) => opened,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(rate));
                let _ = stop_rx.recv();
                drop(stream);
            })
            .context("Failed to spawn speaker thread")?;

        let device_rate = ready_rx
            .recv()
            .map_err(|_| anyhow!("Speaker thread exited before reporting"))??;

        Ok(Self {
            queue,
            resampler: Mutex::new(Resampler::new(device_rate, device_rate)),
            _stop_tx: stop_tx,
        })
    }
}

impl AudioSink for SpeakerSink {
    fn play(&self, frame: AudioFrame) {
        let frame = match self.resampler.lock() {
            Ok(mut resampler) => process_frame(frame, &mut resampler, 1),
            Err(_) => return,
        };
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(frame.samples);
            let overflow = queue.len().saturating_sub(MAX_QUEUED_SAMPLES);
            queue.drain(..overflow);
        }
    }

    fn clear(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
        if let Ok(mut resampler) = self.resampler.lock() {
            resampler.reset();
        }
    }
}

/// Sink used when no output device is available
pub struct NullSink;

impl AudioSink for NullSink {
    fn play(&self, _frame: AudioFrame) {}

    fn clear(&self) {}
}

fn open_output_stream(queue: PlaybackQueue) -> Result<(Stream, u32)> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| anyhow!("No output device"))?;

    let supported = device
        .default_output_config()
        .context("Output device has no usable configuration")?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let rate = stream_config.sample_rate.0;
    let channels = stream_config.channels.max(1) as usize;

    info!("Opening output device ({} Hz, {} channels)", rate, channels);

    let on_error = |e: cpal::StreamError| error!("Speaker stream error: {}", e);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                fill(&queue, data, channels, i16_to_f32, 0.0)
            },
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            &stream_config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                fill(&queue, data, channels, |s| s, 0)
            },
            on_error,
            None,
        )?,
        other => bail!("Unsupported output sample format {:?}", other),
    };

    stream.play().context("Failed to start output stream")?;

    Ok((stream, rate))
}

/// Copy queued mono samples into every channel of `data`, padding with silence
fn fill<T: Copy>(
    queue: &PlaybackQueue,
    data: &mut [T],
    channels: usize,
    convert: impl Fn(i16) -> T,
    silence: T,
) {
    let Ok(mut queue) = queue.lock() else {
        data.fill(silence);
        return;
    };

    for frame in data.chunks_mut(channels) {
        let value = queue.pop_front().map(&convert).unwrap_or(silence);
        frame.fill(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_duplicates_mono_into_channels() {
        let queue: PlaybackQueue = Arc::new(Mutex::new(VecDeque::from(vec![5, 7])));
        let mut data = [0i16; 6];

        fill(&queue, &mut data, 2, |s| s, 0);

        assert_eq!(data, [5, 5, 7, 7, 0, 0]);
        assert!(queue.lock().unwrap().is_empty());
    }
}
