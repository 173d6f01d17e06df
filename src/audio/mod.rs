pub mod backend;
pub mod convert;
pub mod microphone;
pub mod speaker;

pub use backend::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSink, CaptureDevices,
};
pub use microphone::MicrophoneBackend;
pub use speaker::{NullSink, SpeakerSink};
