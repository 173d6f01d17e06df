//! Client-side session management
//!
//! This module provides the `SessionController` that manages:
//! - Credential fetch from the issuer
//! - Microphone capture and the peer transport, acquired and released as a unit
//! - The connection state machine driven by user commands and control events
//! - The two-line transcript shown to the user

mod config;
mod controller;
mod credential;
mod error;
mod resources;
mod state;
mod transcript;
mod view;

pub use config::SessionConfig;
pub use controller::{
    SessionCommand, SessionController, SessionDeps, API_ERROR_NOTICE, CONNECTION_LOST_NOTICE,
    CONNECT_FIRST_NOTICE,
};
pub use credential::{CredentialSource, HttpCredentialSource};
pub use error::SessionError;
pub use resources::SessionResources;
pub use state::ConnectionState;
pub use transcript::{Role, Transcript, TranscriptEntry, TRANSCRIPT_CAPACITY};
pub use view::{ConsoleView, SessionView};
