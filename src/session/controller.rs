use super::config::SessionConfig;
use super::credential::CredentialSource;
use super::error::SessionError;
use super::resources::SessionResources;
use super::state::ConnectionState;
use super::transcript::{Role, Transcript};
use super::view::SessionView;
use crate::audio::CaptureDevices;
use crate::realtime::{ClientEvent, ServerEvent};
use crate::transport::{
    EventSink, Negotiator, PeerTransport, TransportCondition, TransportEvent, TransportEventKind,
    TransportFactory,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub const CONNECT_FIRST_NOTICE: &str = "Connect first to ask questions";
pub const API_ERROR_NOTICE: &str = "An error occurred";
pub const CONNECTION_LOST_NOTICE: &str = "Connection lost";

/// Collaborators the controller drives
#[derive(Clone)]
pub struct SessionDeps {
    pub credentials: Arc<dyn CredentialSource>,
    pub devices: Arc<dyn CaptureDevices>,
    pub transports: Arc<dyn TransportFactory>,
    pub negotiator: Arc<dyn Negotiator>,
}

/// User input to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Connect when idle, disconnect otherwise
    Toggle,
    /// Inject a text turn
    Ask(String),
    Quit,
}

/// Owns the single connection, its resources and the UI state machine
pub struct SessionController {
    deps: SessionDeps,
    view: Box<dyn SessionView>,
    config: SessionConfig,
    state: ConnectionState,
    connected: bool,
    transcript: Transcript,
    resources: SessionResources,
    /// Incremented per connection attempt; events from older attempts are dropped
    attempt: u64,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl SessionController {
    /// Create an idle controller and the receiver for its transport events
    pub fn new(
        deps: SessionDeps,
        view: Box<dyn SessionView>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut controller = Self {
            deps,
            view,
            config,
            state: ConnectionState::Idle,
            connected: false,
            transcript: Transcript::new(),
            resources: SessionResources::new(),
            attempt: 0,
            events_tx,
        };
        controller.view.render_state(controller.state);

        (controller, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn resources(&self) -> &SessionResources {
        &self.resources
    }

    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!("State {} -> {}", self.state, state);
        }
        self.state = state;
        self.view.render_state(state);
    }

    fn push_transcript(&mut self, role: Role, text: &str) {
        if self.transcript.push(role, text) {
            self.view.render_transcript(&self.transcript);
        }
    }

    /// Connect when idle; a toggle in any other state (including
    /// `connecting`) is a disconnect.
    pub async fn toggle(&mut self) -> Result<(), SessionError> {
        if self.state == ConnectionState::Idle {
            self.connect().await
        } else {
            self.disconnect().await;
            Ok(())
        }
    }

    /// Run one connection attempt.
    ///
    /// On failure the error is shown, state returns to idle and everything
    /// acquired so far is released before the error is returned.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if self.state != ConnectionState::Idle {
            warn!("Connect requested while {}; ignoring", self.state);
            return Ok(());
        }

        self.attempt += 1;
        let attempt = self.attempt;
        info!("Connecting (attempt {})", attempt);
        self.set_state(ConnectionState::Connecting);

        match self.establish().await {
            Ok(()) => {
                self.connected = true;
                self.set_state(ConnectionState::Listening);
                info!("Connected (attempt {})", attempt);
                Ok(())
            }
            Err(e) => {
                error!("Connection error (attempt {}): {}", attempt, e);
                self.view.toast(e.user_message());
                self.connected = false;
                self.set_state(ConnectionState::Idle);
                self.resources.release().await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<(), SessionError> {
        let credential = self
            .deps
            .credentials
            .fetch()
            .await
            .map_err(|e| SessionError::CredentialUnavailable(format!("{:#}", e)))?;

        let microphone = self
            .deps
            .devices
            .microphone()
            .map_err(|e| SessionError::MediaAccessDenied(format!("{:#}", e)))?;
        let frames = self
            .resources
            .attach_microphone(microphone)
            .start()
            .await
            .map_err(|e| SessionError::MediaAccessDenied(format!("{:#}", e)))?;

        let events = EventSink::new(self.attempt, self.events_tx.clone());
        let transport = self
            .deps
            .transports
            .create(frames, events)
            .await
            .map_err(|e| SessionError::Transport(format!("{:#}", e)))?;
        let transport = self.resources.attach_transport(transport);

        let offer = transport
            .create_offer()
            .await
            .map_err(|e| SessionError::Transport(format!("{:#}", e)))?;

        let answer = self
            .deps
            .negotiator
            .exchange(&credential, &offer)
            .await
            .map_err(|e| SessionError::NegotiationFailed(format!("{:#}", e)))?;
        // Single use: the credential only authorizes this handshake
        drop(credential);

        transport.apply_answer(&answer).await.map_err(|e| {
            warn!("Remote description rejected: {:#}", e);
            SessionError::ConnectionFailed
        })?;

        wait_for_connection(transport, self.config.connect_timeout).await
    }

    /// Cancel any response, release everything and return to idle.
    /// Safe to call in any state, any number of times.
    pub async fn disconnect(&mut self) {
        if let Some(transport) = self.resources.transport() {
            if transport.channel_open() {
                if let Err(e) = transport.send(&ClientEvent::ResponseCancel).await {
                    debug!("response.cancel not sent: {}", e);
                }
            }
        }

        let released = self.resources.release().await;
        let previous = self.state;

        self.connected = false;
        self.set_state(ConnectionState::Idle);
        self.transcript.hide();
        self.view.render_transcript(&self.transcript);

        info!("Disconnected from {} (released={})", previous, released);
    }

    /// Inject a user text turn. Returns whether a response was requested.
    pub async fn send_text_message(&mut self, text: &str) -> bool {
        let transport = match self.resources.transport() {
            Some(transport) if self.connected && transport.channel_open() => transport,
            _ => {
                self.view.toast(CONNECT_FIRST_NOTICE);
                return false;
            }
        };

        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty text message");
            return false;
        }

        if let Err(e) = transport.send(&ClientEvent::user_text(text)).await {
            error!("Failed to send text message: {:#}", e);
            self.view.toast(API_ERROR_NOTICE);
            return false;
        }
        let requested = transport.send(&ClientEvent::ResponseCreate).await;

        // The turn exists upstream once the item is created, answered or not
        self.push_transcript(Role::User, text);

        match requested {
            Ok(()) => {
                self.set_state(ConnectionState::Processing);
                true
            }
            Err(e) => {
                error!("Failed to request a response: {:#}", e);
                self.view.toast(API_ERROR_NOTICE);
                false
            }
        }
    }

    /// Apply an event reported by the current transport
    pub async fn handle_event(&mut self, event: TransportEvent) {
        if event.attempt != self.attempt || !self.connected {
            debug!(
                "Dropping transport event from attempt {} (current {}, connected={})",
                event.attempt, self.attempt, self.connected
            );
            return;
        }

        match event.kind {
            TransportEventKind::Message(raw) => match ServerEvent::parse(&raw) {
                Ok(event) => self.handle_server_event(event),
                Err(e) => warn!("Ignoring unparseable control event: {}", e),
            },
            TransportEventKind::Condition(condition) => {
                self.handle_condition(condition).await;
            }
        }
    }

    /// Apply one inbound control event: transcript, error notice, then state
    pub fn handle_server_event(&mut self, event: ServerEvent) {
        if !self.state.is_live() {
            debug!("Ignoring {:?} while {}", event, self.state);
            return;
        }

        match &event {
            ServerEvent::InputTranscriptCompleted {
                transcript: Some(text),
            } => self.push_transcript(Role::User, text),
            ServerEvent::OutputTranscriptDone {
                transcript: Some(text),
            } => self.push_transcript(Role::Assistant, text),
            ServerEvent::Error { error } => {
                error!("API error: {:?}", error);
                self.view.toast(API_ERROR_NOTICE);
            }
            ServerEvent::Unknown => debug!("Ignoring unhandled control event"),
            _ => {}
        }

        if let Some(next) = self.state.on_server_event(&event) {
            self.set_state(next);
        }
    }

    async fn handle_condition(&mut self, condition: TransportCondition) {
        match condition {
            TransportCondition::Failed | TransportCondition::Closed => {
                error!("Transport {:?}; ending session", condition);
                self.view.toast(CONNECTION_LOST_NOTICE);
                self.disconnect().await;
            }
            TransportCondition::Disconnected => {
                warn!("Transport disconnected; waiting for it to recover");
            }
            other => debug!("Transport condition {:?}", other),
        }
    }

    /// Drive the controller from user commands and transport events until
    /// `Quit` or the command channel closes. Leaves nothing held.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
    ) {
        info!("Session controller running");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.dispatch(command, &mut commands).await {
                        break;
                    }
                }
                Some(event) = events.recv() => self.handle_event(event).await,
            }
        }

        if self.state != ConnectionState::Idle || !self.resources.is_empty() {
            self.disconnect().await;
        }

        info!("Session controller stopped");
    }

    /// Returns false when the loop should stop
    async fn dispatch(
        &mut self,
        command: SessionCommand,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> bool {
        match command {
            SessionCommand::Quit => false,
            SessionCommand::Ask(text) => {
                self.send_text_message(&text).await;
                true
            }
            SessionCommand::Toggle if self.state == ConnectionState::Idle => {
                self.connect_interruptible(commands).await
            }
            SessionCommand::Toggle => {
                self.disconnect().await;
                true
            }
        }
    }

    /// Connect while still listening for commands: a toggle or quit during
    /// `connecting` abandons the attempt and disconnects.
    async fn connect_interruptible(
        &mut self,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> bool {
        let mut early_asks = 0usize;

        let interrupt = {
            let connect = self.connect();
            tokio::pin!(connect);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut connect => break None,
                    command = commands.recv() => match command {
                        Some(SessionCommand::Ask(_)) => early_asks += 1,
                        other => break Some(other),
                    },
                }
            }
        };

        for _ in 0..early_asks {
            self.view.toast(CONNECT_FIRST_NOTICE);
        }

        match interrupt {
            None => true,
            Some(command) => {
                info!("Connection attempt interrupted by {:?}", command);
                self.disconnect().await;
                matches!(command, Some(SessionCommand::Toggle))
            }
        }
    }
}

/// Wait for the transport to report connected, bounded by `limit`
async fn wait_for_connection(
    transport: &dyn PeerTransport,
    limit: Duration,
) -> Result<(), SessionError> {
    let mut conditions = transport.watch_condition();

    let wait = async {
        loop {
            let condition = *conditions.borrow_and_update();
            if condition == TransportCondition::Connected {
                return Ok(());
            }
            if condition.is_failure() {
                return Err(SessionError::ConnectionFailed);
            }
            if conditions.changed().await.is_err() {
                return Err(SessionError::ConnectionFailed);
            }
        }
    };

    tokio::time::timeout(limit, wait)
        .await
        .map_err(|_| SessionError::ConnectionTimeout)?
}
