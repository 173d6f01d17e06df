use crate::audio::AudioBackend;
use crate::transport::PeerTransport;
use tracing::{debug, warn};

/// Media and transport held by one connection attempt.
///
/// Each resource is stored here the moment it is acquired, so a single
/// `release` covers every exit path of `connect`, including cancellation.
#[derive(Default)]
pub struct SessionResources {
    microphone: Option<Box<dyn AudioBackend>>,
    transport: Option<Box<dyn PeerTransport>>,
}

impl SessionResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach_microphone(
        &mut self,
        microphone: Box<dyn AudioBackend>,
    ) -> &mut Box<dyn AudioBackend> {
        self.microphone.insert(microphone)
    }

    pub fn attach_transport(&mut self, transport: Box<dyn PeerTransport>) -> &dyn PeerTransport {
        &**self.transport.insert(transport)
    }

    pub fn transport(&self) -> Option<&dyn PeerTransport> {
        self.transport.as_deref()
    }

    pub fn has_microphone(&self) -> bool {
        self.microphone.is_some()
    }

    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.microphone.is_none() && self.transport.is_none()
    }

    /// Close the transport and stop capture. Returns whether anything was held;
    /// a second call is a no-op.
    pub async fn release(&mut self) -> bool {
        let mut released = false;

        if let Some(transport) = self.transport.take() {
            transport.close().await;
            released = true;
        }

        if let Some(mut microphone) = self.microphone.take() {
            if microphone.is_capturing() {
                if let Err(e) = microphone.stop().await {
                    warn!("Failed to stop {}: {}", microphone.name(), e);
                }
            } else {
                debug!("{} never started capturing", microphone.name());
            }
            released = true;
        }

        if released {
            debug!("Session resources released");
        }

        released
    }
}
