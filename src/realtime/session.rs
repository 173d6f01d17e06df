use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample rate shared by input and output PCM formats
pub const PCM_RATE: u32 = 24000;

/// Body of the credential-minting request: `{ "session": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRequest {
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub model: String,
    pub audio: AudioSettings,
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioSettings {
    pub input: AudioInput,
    pub output: AudioOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioInput {
    pub format: AudioFormat,
    pub turn_detection: TurnDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioOutput {
    pub format: AudioFormat,
    pub voice: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioFormat {
    #[serde(rename = "type")]
    pub kind: String,
    pub rate: u32,
}

impl AudioFormat {
    pub fn pcm() -> Self {
        Self {
            kind: "audio/pcm".to_string(),
            rate: PCM_RATE,
        }
    }
}

/// Provider-side voice activity detection mode
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: String,
}

impl TurnDetection {
    pub fn server_vad() -> Self {
        Self {
            kind: "server_vad".to_string(),
        }
    }
}

impl SessionRequest {
    /// Realtime session with PCM/24 kHz both ways and server VAD
    pub fn realtime(model: &str, voice: &str, instructions: &str) -> Self {
        Self {
            session: SessionSettings {
                kind: "realtime".to_string(),
                model: model.to_string(),
                audio: AudioSettings {
                    input: AudioInput {
                        format: AudioFormat::pcm(),
                        turn_detection: TurnDetection::server_vad(),
                    },
                    output: AudioOutput {
                        format: AudioFormat::pcm(),
                        voice: voice.to_string(),
                    },
                },
                instructions: instructions.to_string(),
            },
        }
    }
}

/// Provider response to a credential-minting request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSecret {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Short-lived credential handed to the session client
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionCredential {
    #[serde(rename = "ephemeralKey")]
    pub ephemeral_key: String,
    pub model: String,
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("ephemeral_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}
