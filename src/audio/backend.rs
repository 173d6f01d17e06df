use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will resample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Capacity of the frame channel; frames are dropped when the consumer lags
    pub channel_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 8000, // G.711 on the peer transport
            target_channels: 1,       // Mono
            channel_capacity: 64,
        }
    }
}

/// Audio capture backend trait
///
/// One backend instance is one exclusive capture: `start` acquires the
/// device, `stop` releases it. `stop` on a stopped backend is a no-op.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Destination for synthesized audio coming back from the provider
pub trait AudioSink: Send + Sync {
    /// Queue a frame for playback
    fn play(&self, frame: AudioFrame);

    /// Drop anything still queued
    fn clear(&self);
}

/// Source of fresh capture backends, one per connection attempt
pub trait CaptureDevices: Send + Sync {
    fn microphone(&self) -> Result<Box<dyn AudioBackend>>;
}

/// Audio backend factory
pub struct AudioBackendFactory {
    config: AudioBackendConfig,
}

impl AudioBackendFactory {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self { config }
    }
}

impl CaptureDevices for AudioBackendFactory {
    /// Create a microphone backend for the default input device
    fn microphone(&self) -> Result<Box<dyn AudioBackend>> {
        let backend = super::microphone::MicrophoneBackend::new(self.config.clone());
        Ok(Box::new(backend))
    }
}
