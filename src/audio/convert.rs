// Sample format conversion between capture devices and the peer transport
//
// Capture devices deliver whatever rate/channel layout they support; the peer
// transport carries 8 kHz mono G.711 µ-law. Playback goes the other way.

use super::backend::AudioFrame;

const ULAW_BIAS: i32 = 0x84;
const ULAW_CLIP: i32 = 32635;

/// Process audio frame: downmix, then resample to the resampler's target rate
pub fn process_frame(
    frame: AudioFrame,
    resampler: &mut Resampler,
    target_channels: u16,
) -> AudioFrame {
    let mut processed = frame;

    // Convert to mono first so resampling touches fewer samples
    if processed.channels != target_channels && target_channels == 1 {
        processed = to_mono(processed);
    }

    resampler.process(processed)
}

/// Streaming nearest-sample resampler, works in both directions.
///
/// The read position carries over between frames, so a stream split into
/// arbitrary buffers yields the same output as one contiguous buffer.
#[derive(Debug, Clone)]
pub struct Resampler {
    source_rate: u32,
    target_rate: u32,
    /// Next read position in source frames, scaled by `target_rate`
    phase: u64,
}

impl Resampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate,
            phase: 0,
        }
    }

    /// Forget the carried position
    pub fn reset(&mut self) {
        self.phase = 0;
    }

    pub fn process(&mut self, frame: AudioFrame) -> AudioFrame {
        if frame.sample_rate != self.source_rate {
            self.source_rate = frame.sample_rate;
            self.phase = 0;
        }
        if self.source_rate == self.target_rate || self.source_rate == 0 || self.target_rate == 0
        {
            return frame;
        }

        let channels = frame.channels.max(1) as usize;
        let source_frames = (frame.samples.len() / channels) as u64;
        let end = source_frames * self.target_rate as u64;
        let step = self.source_rate as u64;

        let expected = end.saturating_sub(self.phase) / step + 1;
        let mut samples = Vec::with_capacity(expected as usize * channels);

        let mut position = self.phase;
        while position < end {
            let src = (position / self.target_rate as u64) as usize;
            samples.extend_from_slice(&frame.samples[src * channels..(src + 1) * channels]);
            position += step;
        }
        self.phase = position - end;

        AudioFrame {
            samples,
            sample_rate: self.target_rate,
            channels: frame.channels,
            timestamp_ms: frame.timestamp_ms,
        }
    }
}

/// One-shot resample of a single frame
pub fn resample(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    Resampler::new(frame.sample_rate, target_rate).process(frame)
}

/// Average interleaved channels down to one
pub fn to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels <= 1 {
        return frame;
    }

    let channels = frame.channels as usize;
    let mono_samples = frame
        .samples
        .chunks_exact(channels)
        .map(|chunk| {
            let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect();

    AudioFrame {
        samples: mono_samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Convert a float sample in [-1.0, 1.0] to i16
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// G.711 µ-law encode of one linear sample
pub fn ulaw_encode(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    magnitude = magnitude.min(ULAW_CLIP) + ULAW_BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// G.711 µ-law decode of one byte
pub fn ulaw_decode(byte: u8) -> i16 {
    let byte = !byte;
    let sign = byte & 0x80;
    let exponent = ((byte >> 4) & 0x07) as i32;
    let mantissa = (byte & 0x0F) as i32;

    let magnitude = (((mantissa << 3) + ULAW_BIAS) << exponent) - ULAW_BIAS;
    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

pub fn encode_ulaw(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| ulaw_encode(s)).collect()
}

pub fn decode_ulaw(payload: &[u8]) -> Vec<i16> {
    payload.iter().map(|&b| ulaw_decode(b)).collect()
}
