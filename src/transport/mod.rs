//! Peer transport to the realtime provider
//!
//! A transport bundles the peer connection, the outbound microphone track and
//! the `oai-events` data channel; the three are created and closed together.
//! Inbound data-channel messages and connection-state changes are pushed into
//! an [`EventSink`] tagged with the connection attempt that owns them.

mod negotiation;
mod peer;

pub use self::negotiation::HttpNegotiator;
pub use self::peer::{WebRtcTransport, WebRtcTransportFactory};

use crate::audio::AudioFrame;
use crate::realtime::{ClientEvent, SessionCredential};
use anyhow::Result;
use tokio::sync::{mpsc, watch};

/// Label of the control-event data channel
pub const DATA_CHANNEL_LABEL: &str = "oai-events";

/// Connection condition reported by the underlying peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCondition {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl TransportCondition {
    /// Conditions that end a connection attempt
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TransportCondition::Disconnected
                | TransportCondition::Failed
                | TransportCondition::Closed
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEventKind {
    /// Raw JSON text received on the data channel
    Message(String),
    Condition(TransportCondition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportEvent {
    /// Connection attempt that produced the event
    pub attempt: u64,
    pub kind: TransportEventKind,
}

/// Handle transports use to report back to the session controller
#[derive(Debug, Clone)]
pub struct EventSink {
    attempt: u64,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl EventSink {
    pub fn new(attempt: u64, tx: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { attempt, tx }
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn message(&self, raw: String) {
        self.emit(TransportEventKind::Message(raw));
    }

    pub fn condition(&self, condition: TransportCondition) {
        self.emit(TransportEventKind::Condition(condition));
    }

    fn emit(&self, kind: TransportEventKind) {
        // Receiver gone means the controller shut down; nothing left to notify
        let _ = self.tx.send(TransportEvent {
            attempt: self.attempt,
            kind,
        });
    }
}

#[async_trait::async_trait]
pub trait PeerTransport: Send + Sync {
    /// Produce the local session description, candidates included
    async fn create_offer(&self) -> Result<String>;

    /// Apply the provider's answer
    async fn apply_answer(&self, sdp: &str) -> Result<()>;

    /// Observe connection condition changes
    fn watch_condition(&self) -> watch::Receiver<TransportCondition>;

    /// Whether the control channel can carry messages
    fn channel_open(&self) -> bool;

    async fn send(&self, event: &ClientEvent) -> Result<()>;

    /// Close channel and connection and stop media. Safe to call twice.
    async fn close(&self);
}

#[async_trait::async_trait]
pub trait TransportFactory: Send + Sync {
    /// Build a transport streaming `microphone` out and reporting to `events`
    async fn create(
        &self,
        microphone: mpsc::Receiver<AudioFrame>,
        events: EventSink,
    ) -> Result<Box<dyn PeerTransport>>;
}

/// Offer/answer exchange with the provider, authorized by the ephemeral credential
#[async_trait::async_trait]
pub trait Negotiator: Send + Sync {
    async fn exchange(&self, credential: &SessionCredential, offer: &str) -> Result<String>;
}
