use crate::realtime::ServerEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the session controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Listening,
    Processing,
    Speaking,
}

impl ConnectionState {
    /// Status line shown to the user
    pub fn status_text(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Tap to connect",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Listening => "Listening",
            ConnectionState::Processing => "Thinking",
            ConnectionState::Speaking => "Speaking",
        }
    }

    /// Connected to the provider with a live transport
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            ConnectionState::Listening | ConnectionState::Processing | ConnectionState::Speaking
        )
    }

    /// State entered on an inbound control event.
    ///
    /// `None` means the event drives no transition: either it carries only
    /// transcript/error data, or the session is not live.
    pub fn on_server_event(self, event: &ServerEvent) -> Option<ConnectionState> {
        if !self.is_live() {
            return None;
        }

        match event {
            ServerEvent::SpeechStarted => Some(ConnectionState::Listening),
            ServerEvent::SpeechStopped => Some(ConnectionState::Processing),
            ServerEvent::OutputAudioDelta => Some(ConnectionState::Speaking),
            ServerEvent::OutputAudioDone | ServerEvent::ResponseDone => {
                Some(ConnectionState::Listening)
            }
            ServerEvent::InputTranscriptCompleted { .. }
            | ServerEvent::OutputTranscriptDone { .. }
            | ServerEvent::Error { .. }
            | ServerEvent::Unknown => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Listening => "listening",
            ConnectionState::Processing => "processing",
            ConnectionState::Speaking => "speaking",
        };
        f.write_str(name)
    }
}
