//! Wire types for the realtime speech provider
//!
//! - `session`: credential-minting payloads and the issuer's response body
//! - `messages`: JSON control events exchanged over the data channel

pub mod messages;
pub mod session;

pub use messages::{ApiError, ClientEvent, ContentPart, ConversationItem, ServerEvent};
pub use session::{
    AudioFormat, AudioInput, AudioOutput, AudioSettings, ClientSecret, SessionCredential,
    SessionRequest, SessionSettings, TurnDetection,
};
