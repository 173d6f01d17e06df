// Session controller tests against in-memory collaborators
//
// The fakes record everything the controller does to them so each test can
// check which resources were acquired, what was sent on the control channel
// and what the user was shown.

use anyhow::{anyhow, Result};
use axum::{http::StatusCode, routing::post, Router};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use voice_interview::audio::{AudioBackend, AudioFrame, CaptureDevices};
use voice_interview::realtime::{ClientEvent, SessionCredential};
use voice_interview::session::{
    ConnectionState, CredentialSource, HttpCredentialSource, Role, SessionCommand, SessionConfig,
    SessionController, SessionDeps, SessionError, SessionView, Transcript, API_ERROR_NOTICE,
    CONNECTION_LOST_NOTICE, CONNECT_FIRST_NOTICE,
};
use voice_interview::transport::{
    EventSink, Negotiator, PeerTransport, TransportCondition, TransportEvent, TransportFactory,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ViewLog {
    states: Vec<ConnectionState>,
    toasts: Vec<String>,
    transcripts: Vec<Vec<(Role, String)>>,
}

struct RecordingView(Arc<Mutex<ViewLog>>);

impl SessionView for RecordingView {
    fn render_state(&mut self, state: ConnectionState) {
        self.0.lock().unwrap().states.push(state);
    }

    fn toast(&mut self, message: &str) {
        self.0.lock().unwrap().toasts.push(message.to_string());
    }

    fn render_transcript(&mut self, transcript: &Transcript) {
        let lines = transcript
            .entries()
            .map(|e| (e.role, e.text.clone()))
            .collect();
        self.0.lock().unwrap().transcripts.push(lines);
    }
}

struct FakeCredentials {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl CredentialSource for FakeCredentials {
    async fn fetch(&self) -> Result<SessionCredential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("Credential issuer returned 500 Internal Server Error"));
        }
        Ok(SessionCredential {
            ephemeral_key: "ek_test".to_string(),
            model: "gpt-realtime".to_string(),
        })
    }
}

#[derive(Default)]
struct MicLog {
    created: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

struct FakeDevices {
    deny: bool,
    log: Arc<MicLog>,
}

impl CaptureDevices for FakeDevices {
    fn microphone(&self) -> Result<Box<dyn AudioBackend>> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeMicrophone {
            deny: self.deny,
            capturing: false,
            log: Arc::clone(&self.log),
            frames: None,
        }))
    }
}

struct FakeMicrophone {
    deny: bool,
    capturing: bool,
    log: Arc<MicLog>,
    frames: Option<mpsc::Sender<AudioFrame>>,
}

#[async_trait::async_trait]
impl AudioBackend for FakeMicrophone {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.deny {
            return Err(anyhow!("Permission denied"));
        }
        self.log.started.fetch_add(1, Ordering::SeqCst);
        self.capturing = true;
        let (tx, rx) = mpsc::channel(4);
        self.frames = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if self.capturing {
            self.capturing = false;
            self.frames = None;
            self.log.stopped.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "Fake Microphone"
    }
}

/// What the fake peer does once the answer is applied
#[derive(Clone, Copy, PartialEq)]
enum PeerBehavior {
    Connect,
    Fail,
    Hang,
}

#[derive(Default)]
struct TransportLog {
    created: AtomicUsize,
    closed: AtomicUsize,
    sent: Mutex<Vec<ClientEvent>>,
    answers: Mutex<Vec<String>>,
    sinks: Mutex<Vec<EventSink>>,
    /// Control channel reports closed while the peer stays connected
    channel_closed: AtomicBool,
    /// `response.create` fails after the item was accepted
    reject_response_create: AtomicBool,
}

struct FakeTransports {
    behavior: PeerBehavior,
    fail_create: bool,
    log: Arc<TransportLog>,
}

#[async_trait::async_trait]
impl TransportFactory for FakeTransports {
    async fn create(
        &self,
        _microphone: mpsc::Receiver<AudioFrame>,
        events: EventSink,
    ) -> Result<Box<dyn PeerTransport>> {
        if self.fail_create {
            return Err(anyhow!("Failed to create peer connection"));
        }
        self.log.created.fetch_add(1, Ordering::SeqCst);
        self.log.sinks.lock().unwrap().push(events.clone());

        let (condition_tx, _) = watch::channel(TransportCondition::New);
        Ok(Box::new(FakeTransport {
            behavior: self.behavior,
            condition_tx,
            events,
            open: AtomicBool::new(true),
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeTransport {
    behavior: PeerBehavior,
    condition_tx: watch::Sender<TransportCondition>,
    events: EventSink,
    open: AtomicBool,
    log: Arc<TransportLog>,
}

impl FakeTransport {
    fn report(&self, condition: TransportCondition) {
        self.condition_tx.send_replace(condition);
        self.events.condition(condition);
    }
}

#[async_trait::async_trait]
impl PeerTransport for FakeTransport {
    async fn create_offer(&self) -> Result<String> {
        Ok("v=0\r\no=- offer\r\n".to_string())
    }

    async fn apply_answer(&self, sdp: &str) -> Result<()> {
        self.log.answers.lock().unwrap().push(sdp.to_string());
        self.report(TransportCondition::Connecting);
        match self.behavior {
            PeerBehavior::Connect => self.report(TransportCondition::Connected),
            PeerBehavior::Fail => self.report(TransportCondition::Failed),
            PeerBehavior::Hang => {}
        }
        Ok(())
    }

    fn watch_condition(&self) -> watch::Receiver<TransportCondition> {
        self.condition_tx.subscribe()
    }

    fn channel_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.log.channel_closed.load(Ordering::SeqCst)
    }

    async fn send(&self, event: &ClientEvent) -> Result<()> {
        if !self.channel_open() {
            return Err(anyhow!("channel closed"));
        }
        if *event == ClientEvent::ResponseCreate
            && self.log.reject_response_create.load(Ordering::SeqCst)
        {
            return Err(anyhow!("data channel send failed"));
        }
        self.log.sent.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.log.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeNegotiator {
    fail: bool,
    keys: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl Negotiator for FakeNegotiator {
    async fn exchange(&self, credential: &SessionCredential, offer: &str) -> Result<String> {
        self.keys.lock().unwrap().push(credential.ephemeral_key.clone());
        if self.fail {
            return Err(anyhow!("Provider rejected offer with 502 Bad Gateway"));
        }
        assert!(offer.starts_with("v=0"));
        Ok("v=0\r\no=- answer\r\n".to_string())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Options {
    credential_fails: bool,
    /// Use the HTTP credential source against this issuer URL
    credential_url: Option<String>,
    mic_denied: bool,
    transport_fails: bool,
    negotiation_fails: bool,
    behavior: PeerBehavior,
    timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            credential_fails: false,
            credential_url: None,
            mic_denied: false,
            transport_fails: false,
            negotiation_fails: false,
            behavior: PeerBehavior::Connect,
            timeout: Duration::from_millis(200),
        }
    }
}

struct Recorder {
    view: Arc<Mutex<ViewLog>>,
    credentials: Arc<FakeCredentials>,
    mic: Arc<MicLog>,
    transport: Arc<TransportLog>,
    negotiator: Arc<FakeNegotiator>,
}

impl Recorder {
    fn states(&self) -> Vec<ConnectionState> {
        self.view.lock().unwrap().states.clone()
    }

    fn toasts(&self) -> Vec<String> {
        self.view.lock().unwrap().toasts.clone()
    }

    fn sent(&self) -> Vec<ClientEvent> {
        self.transport.sent.lock().unwrap().clone()
    }

    fn closed(&self) -> usize {
        self.transport.closed.load(Ordering::SeqCst)
    }

    fn sink(&self, index: usize) -> EventSink {
        self.transport.sinks.lock().unwrap()[index].clone()
    }
}

fn harness(
    options: Options,
) -> (
    SessionController,
    mpsc::UnboundedReceiver<TransportEvent>,
    Recorder,
) {
    let rec = Recorder {
        view: Arc::new(Mutex::new(ViewLog::default())),
        credentials: Arc::new(FakeCredentials {
            fail: options.credential_fails,
            calls: AtomicUsize::new(0),
        }),
        mic: Arc::new(MicLog::default()),
        transport: Arc::new(TransportLog::default()),
        negotiator: Arc::new(FakeNegotiator {
            fail: options.negotiation_fails,
            keys: Mutex::new(Vec::new()),
        }),
    };

    let credentials: Arc<dyn CredentialSource> = match options.credential_url {
        Some(url) => Arc::new(HttpCredentialSource::new(url)),
        None => rec.credentials.clone(),
    };

    let deps = SessionDeps {
        credentials,
        devices: Arc::new(FakeDevices {
            deny: options.mic_denied,
            log: Arc::clone(&rec.mic),
        }),
        transports: Arc::new(FakeTransports {
            behavior: options.behavior,
            fail_create: options.transport_fails,
            log: Arc::clone(&rec.transport),
        }),
        negotiator: rec.negotiator.clone(),
    };

    let config = SessionConfig {
        connect_timeout: options.timeout,
        assistant_name: "Koushik".to_string(),
    };

    let (controller, events) =
        SessionController::new(deps, Box::new(RecordingView(Arc::clone(&rec.view))), config);

    (controller, events, rec)
}

/// Apply every transport event queued so far
async fn drain(
    controller: &mut SessionController,
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Ok(event) = events.try_recv() {
        controller.handle_event(event).await;
    }
}

fn assert_released(controller: &SessionController, rec: &Recorder) {
    assert!(controller.resources().is_empty(), "resources still held");
    assert!(!controller.is_connected());
    assert_eq!(controller.state(), ConnectionState::Idle);
    assert_eq!(
        rec.mic.started.load(Ordering::SeqCst),
        rec.mic.stopped.load(Ordering::SeqCst),
        "every started microphone is stopped"
    );
    assert_eq!(
        rec.transport.created.load(Ordering::SeqCst),
        rec.closed(),
        "every created transport is closed"
    );
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_starts_idle() {
    let (controller, _events, rec) = harness(Options::default());

    assert_eq!(controller.state(), ConnectionState::Idle);
    assert!(!controller.is_connected());
    assert!(controller.resources().is_empty());
    assert_eq!(rec.states(), vec![ConnectionState::Idle]);
}

#[tokio::test]
async fn test_connect_success() {
    let (mut controller, _events, rec) = harness(Options::default());

    controller.connect().await.unwrap();

    assert!(controller.is_connected());
    assert_eq!(controller.state(), ConnectionState::Listening);
    assert_eq!(
        rec.states(),
        vec![
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Listening
        ]
    );
    assert!(controller.resources().has_microphone());
    assert!(controller.resources().has_transport());
    assert_eq!(rec.negotiator.keys.lock().unwrap().as_slice(), ["ek_test"]);
    assert_eq!(rec.transport.answers.lock().unwrap().len(), 1);
    assert!(rec.toasts().is_empty());
}

#[tokio::test]
async fn test_credential_failure_returns_to_idle() {
    let (mut controller, _events, rec) = harness(Options {
        credential_fails: true,
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, SessionError::CredentialUnavailable(_)));
    assert_eq!(
        rec.states(),
        vec![
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Idle
        ]
    );
    assert_eq!(rec.toasts(), vec!["Unable to connect"]);
    assert_eq!(rec.mic.created.load(Ordering::SeqCst), 0);
    assert!(rec.negotiator.keys.lock().unwrap().is_empty());
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_issuer_error_returns_to_idle() {
    let app = Router::new().route(
        "/api/session",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"OpenAI API key not configured"}"#,
            )
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let (mut controller, _events, rec) = harness(Options {
        credential_url: Some(format!("http://{}/api/session", addr)),
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, SessionError::CredentialUnavailable(_)));
    assert_eq!(
        rec.states(),
        vec![
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Idle
        ]
    );
    assert_eq!(rec.toasts(), vec!["Unable to connect"]);
    assert_eq!(rec.mic.created.load(Ordering::SeqCst), 0);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_microphone_denied() {
    let (mut controller, _events, rec) = harness(Options {
        mic_denied: true,
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, SessionError::MediaAccessDenied(_)));
    assert_eq!(rec.toasts(), vec!["Microphone access denied"]);
    assert_eq!(rec.transport.created.load(Ordering::SeqCst), 0);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_transport_setup_failure() {
    let (mut controller, _events, rec) = harness(Options {
        transport_fails: true,
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert_eq!(rec.toasts(), vec!["Unable to connect"]);
    assert_eq!(rec.mic.stopped.load(Ordering::SeqCst), 1);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_negotiation_failure_releases_everything() {
    let (mut controller, _events, rec) = harness(Options {
        negotiation_fails: true,
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert!(matches!(err, SessionError::NegotiationFailed(_)));
    assert_eq!(rec.toasts(), vec!["Voice service unavailable"]);
    assert_eq!(rec.closed(), 1);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_connection_timeout() {
    let (mut controller, _events, rec) = harness(Options {
        behavior: PeerBehavior::Hang,
        timeout: Duration::from_millis(50),
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert_eq!(err, SessionError::ConnectionTimeout);
    assert_eq!(rec.toasts(), vec!["Connection timeout"]);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_peer_failure_during_connect() {
    let (mut controller, _events, rec) = harness(Options {
        behavior: PeerBehavior::Fail,
        ..Default::default()
    });

    let err = controller.connect().await.unwrap_err();

    assert_eq!(err, SessionError::ConnectionFailed);
    assert_eq!(rec.toasts(), vec!["Connection failed"]);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_connect_ignored_when_not_idle() {
    let (mut controller, _events, rec) = harness(Options::default());

    controller.connect().await.unwrap();
    controller.connect().await.unwrap();

    assert_eq!(rec.credentials.calls.load(Ordering::SeqCst), 1);
    assert_eq!(rec.transport.created.load(Ordering::SeqCst), 1);
    assert_eq!(controller.attempt(), 1);
}

#[tokio::test]
async fn test_reconnect_after_failure() {
    let (mut controller, _events, rec) = harness(Options {
        behavior: PeerBehavior::Fail,
        ..Default::default()
    });

    assert!(controller.connect().await.is_err());
    assert!(controller.connect().await.is_err());

    assert_eq!(rec.credentials.calls.load(Ordering::SeqCst), 2);
    assert_eq!(controller.attempt(), 2);
    assert_released(&controller, &rec);
}

// ---------------------------------------------------------------------------
// Disconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    controller.disconnect().await;
    controller.disconnect().await;

    assert_eq!(rec.sent(), vec![ClientEvent::ResponseCancel]);
    assert_eq!(rec.closed(), 1);
    assert_eq!(rec.mic.stopped.load(Ordering::SeqCst), 1);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_disconnect_when_idle() {
    let (mut controller, _events, rec) = harness(Options::default());

    controller.disconnect().await;

    assert!(rec.sent().is_empty());
    assert_eq!(controller.state(), ConnectionState::Idle);
    assert!(rec.toasts().is_empty());
}

#[tokio::test]
async fn test_toggle_connects_then_disconnects() {
    let (mut controller, _events, rec) = harness(Options::default());

    controller.toggle().await.unwrap();
    assert!(controller.is_connected());

    controller.toggle().await.unwrap();
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_disconnect_hides_transcript() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();
    controller.send_text_message("hello").await;

    controller.disconnect().await;

    assert!(!controller.transcript().is_visible());
    let log = rec.view.lock().unwrap();
    assert_eq!(log.transcripts.len(), 2, "shown once, then re-rendered hidden");
}

// ---------------------------------------------------------------------------
// Text messages
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_text_when_not_connected() {
    let (mut controller, _events, rec) = harness(Options::default());

    assert!(!controller.send_text_message("hello").await);

    assert_eq!(rec.toasts(), vec![CONNECT_FIRST_NOTICE]);
    assert!(rec.sent().is_empty());
    assert!(controller.transcript().is_empty());
    assert_eq!(controller.state(), ConnectionState::Idle);
}

#[tokio::test]
async fn test_send_text_when_connected() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    assert!(controller.send_text_message("  What drives you?  ").await);

    assert_eq!(
        rec.sent(),
        vec![
            ClientEvent::user_text("What drives you?"),
            ClientEvent::ResponseCreate
        ]
    );
    let entries: Vec<_> = controller.transcript().entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].text, "What drives you?");
    assert_eq!(controller.state(), ConnectionState::Processing);
}

#[tokio::test]
async fn test_send_blank_text_is_noop() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    assert!(!controller.send_text_message("   ").await);

    assert!(rec.sent().is_empty());
    assert!(rec.toasts().is_empty());
    assert_eq!(controller.state(), ConnectionState::Listening);
}

#[tokio::test]
async fn test_send_text_with_channel_closed() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();
    rec.transport.channel_closed.store(true, Ordering::SeqCst);

    assert!(!controller.send_text_message("hello").await);

    assert!(controller.is_connected());
    assert_eq!(rec.toasts(), vec![CONNECT_FIRST_NOTICE]);
    assert!(rec.sent().is_empty());
    assert!(controller.transcript().is_empty());
    assert_eq!(controller.state(), ConnectionState::Listening);
}

#[tokio::test]
async fn test_send_text_when_response_request_fails() {
    let (mut controller, _events, rec) = harness(Options::default());
    controller.connect().await.unwrap();
    rec
        .transport
        .reject_response_create
        .store(true, Ordering::SeqCst);

    assert!(!controller.send_text_message("Tell me more").await);

    // The item reached the provider, so the turn is shown
    assert_eq!(rec.sent(), vec![ClientEvent::user_text("Tell me more")]);
    let entries: Vec<_> = controller.transcript().entries().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].text, "Tell me more");
    assert_eq!(rec.toasts(), vec![API_ERROR_NOTICE]);
    assert_eq!(controller.state(), ConnectionState::Listening);
    assert!(controller.is_connected());
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_inbound_event_sequence() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    let sink = rec.sink(0);
    for raw in [
        r#"{"type":"input_audio_buffer.speech_started"}"#,
        r#"{"type":"input_audio_buffer.speech_stopped"}"#,
        r#"{"type":"response.output_audio.delta","delta":"AAAA"}"#,
        r#"{"type":"response.done","response":{"status":"completed"}}"#,
    ] {
        sink.message(raw.to_string());
    }
    drain(&mut controller, &mut events).await;

    assert_eq!(
        rec.states(),
        vec![
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Listening,
            ConnectionState::Listening,
            ConnectionState::Processing,
            ConnectionState::Speaking,
            ConnectionState::Listening,
        ]
    );
}

#[tokio::test]
async fn test_transcripts_capped_at_two() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    let sink = rec.sink(0);
    sink.message(
        r#"{"type":"conversation.item.input_audio_transcription.completed","transcript":"Who are you?"}"#
            .to_string(),
    );
    sink.message(
        r#"{"type":"response.output_audio_transcript.done","transcript":"I'm Koushik."}"#
            .to_string(),
    );
    sink.message(
        r#"{"type":"conversation.item.input_audio_transcription.completed","transcript":"Nice"}"#
            .to_string(),
    );
    drain(&mut controller, &mut events).await;

    let entries: Vec<_> = controller
        .transcript()
        .entries()
        .map(|e| (e.role, e.text.clone()))
        .collect();
    assert_eq!(
        entries,
        vec![
            (Role::Assistant, "I'm Koushik.".to_string()),
            (Role::User, "Nice".to_string()),
        ]
    );
    assert!(controller.transcript().is_visible());
}

#[tokio::test]
async fn test_error_event_keeps_session() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    rec
        .sink(0)
        .message(r#"{"type":"error","error":{"message":"bad request"}}"#.to_string());
    drain(&mut controller, &mut events).await;

    assert_eq!(rec.toasts(), vec![API_ERROR_NOTICE]);
    assert!(controller.is_connected());
    assert!(controller.resources().has_transport());
    assert_eq!(controller.state(), ConnectionState::Listening);
}

#[tokio::test]
async fn test_unknown_and_malformed_messages_ignored() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    let sink = rec.sink(0);
    sink.message(r#"{"type":"session.updated","session":{}}"#.to_string());
    sink.message("garbage".to_string());
    drain(&mut controller, &mut events).await;

    assert_eq!(controller.state(), ConnectionState::Listening);
    assert!(rec.toasts().is_empty());
}

#[tokio::test]
async fn test_transport_failure_after_connect() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    rec.sink(0).condition(TransportCondition::Failed);
    drain(&mut controller, &mut events).await;

    assert_eq!(rec.toasts(), vec![CONNECTION_LOST_NOTICE]);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_transient_disconnect_keeps_session() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();

    rec.sink(0).condition(TransportCondition::Disconnected);
    drain(&mut controller, &mut events).await;

    assert!(controller.is_connected());
    assert!(rec.toasts().is_empty());
}

#[tokio::test]
async fn test_stale_attempt_events_ignored() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();
    controller.disconnect().await;
    controller.connect().await.unwrap();
    drain(&mut controller, &mut events).await;

    let stale = rec.sink(0);
    stale.condition(TransportCondition::Failed);
    stale.message(r#"{"type":"response.output_audio.delta"}"#.to_string());
    drain(&mut controller, &mut events).await;

    assert!(controller.is_connected());
    assert_eq!(controller.state(), ConnectionState::Listening);
    assert!(rec.toasts().is_empty());
}

#[tokio::test]
async fn test_events_after_disconnect_ignored() {
    let (mut controller, mut events, rec) = harness(Options::default());
    controller.connect().await.unwrap();
    controller.disconnect().await;

    rec
        .sink(0)
        .message(r#"{"type":"input_audio_buffer.speech_stopped"}"#.to_string());
    drain(&mut controller, &mut events).await;

    assert_eq!(controller.state(), ConnectionState::Idle);
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_run_toggle_while_connecting_cancels() {
    let (mut controller, events, rec) = harness(Options {
        behavior: PeerBehavior::Hang,
        timeout: Duration::from_secs(30),
        ..Default::default()
    });

    let (tx, rx) = mpsc::channel(8);
    tx.send(SessionCommand::Toggle).await.unwrap();
    tx.send(SessionCommand::Ask("too early".to_string()))
        .await
        .unwrap();
    tx.send(SessionCommand::Toggle).await.unwrap();
    tx.send(SessionCommand::Quit).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), controller.run(rx, events))
        .await
        .unwrap();

    assert_eq!(
        rec.states(),
        vec![
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Idle
        ]
    );
    assert_eq!(rec.toasts(), vec![CONNECT_FIRST_NOTICE]);
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_run_quit_while_connected_releases() {
    let (mut controller, events, rec) = harness(Options::default());

    let (tx, rx) = mpsc::channel(8);
    tx.send(SessionCommand::Toggle).await.unwrap();
    tx.send(SessionCommand::Ask("hi".to_string())).await.unwrap();
    tx.send(SessionCommand::Quit).await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), controller.run(rx, events))
        .await
        .unwrap();

    assert_eq!(
        rec.sent(),
        vec![
            ClientEvent::user_text("hi"),
            ClientEvent::ResponseCreate,
            ClientEvent::ResponseCancel
        ]
    );
    assert_released(&controller, &rec);
}

#[tokio::test]
async fn test_run_stops_when_commands_close() {
    let (mut controller, events, rec) = harness(Options::default());

    let (tx, rx) = mpsc::channel(8);
    tx.send(SessionCommand::Toggle).await.unwrap();
    drop(tx);

    tokio::time::timeout(Duration::from_secs(5), controller.run(rx, events))
        .await
        .unwrap();

    assert_eq!(rec.transport.created.load(Ordering::SeqCst), 1);
    assert_released(&controller, &rec);
}
