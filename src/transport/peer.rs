use super::{
    EventSink, PeerTransport, TransportCondition, TransportFactory, DATA_CHANNEL_LABEL,
};
use crate::audio::convert::{decode_ulaw, encode_ulaw};
use crate::audio::{AudioFrame, AudioSink};
use crate::realtime::ClientEvent;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_PCMU};
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{
    RTCRtpCodecCapability, RTCRtpCodecParameters, RTPCodecType,
};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// G.711 clock rate
const PCMU_RATE: u32 = 8000;

fn pcmu_capability() -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: MIME_TYPE_PCMU.to_owned(),
        clock_rate: PCMU_RATE,
        channels: 0,
        sdp_fmtp_line: String::new(),
        rtcp_feedback: vec![],
    }
}

fn condition_of(state: RTCPeerConnectionState) -> TransportCondition {
    match state {
        RTCPeerConnectionState::Connecting => TransportCondition::Connecting,
        RTCPeerConnectionState::Connected => TransportCondition::Connected,
        RTCPeerConnectionState::Disconnected => TransportCondition::Disconnected,
        RTCPeerConnectionState::Failed => TransportCondition::Failed,
        RTCPeerConnectionState::Closed => TransportCondition::Closed,
        _ => TransportCondition::New,
    }
}

/// Builds webrtc-rs peer connections negotiating PCMU audio only
pub struct WebRtcTransportFactory {
    ice_servers: Vec<String>,
    speaker: Arc<dyn AudioSink>,
}

impl WebRtcTransportFactory {
    pub fn new(ice_servers: Vec<String>, speaker: Arc<dyn AudioSink>) -> Self {
        Self {
            ice_servers,
            speaker,
        }
    }

    fn rtc_config(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }

    async fn new_peer(&self) -> Result<Arc<RTCPeerConnection>> {
        let mut media = MediaEngine::default();
        media.register_codec(
            RTCRtpCodecParameters {
                capability: pcmu_capability(),
                payload_type: 0,
                ..Default::default()
            },
            RTPCodecType::Audio,
        )?;

        let registry = register_default_interceptors(Registry::new(), &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let pc = api
            .new_peer_connection(self.rtc_config())
            .await
            .context("Failed to create peer connection")?;

        Ok(Arc::new(pc))
    }
}

#[async_trait::async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        microphone: mpsc::Receiver<AudioFrame>,
        events: EventSink,
    ) -> Result<Box<dyn PeerTransport>> {
        let pc = self.new_peer().await?;

        match self.assemble(Arc::clone(&pc), microphone, events).await {
            Ok(transport) => Ok(Box::new(transport)),
            Err(e) => {
                // Never leave a half-built peer connection behind
                if let Err(close_err) = pc.close().await {
                    debug!("Peer connection close after failed setup: {}", close_err);
                }
                Err(e)
            }
        }
    }
}

impl WebRtcTransportFactory {
    async fn assemble(
        &self,
        pc: Arc<RTCPeerConnection>,
        microphone: mpsc::Receiver<AudioFrame>,
        events: EventSink,
    ) -> Result<WebRtcTransport> {
        let (condition_tx, condition_rx) = watch::channel(TransportCondition::New);

        let condition_events = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let condition = condition_of(state);
            debug!("Peer connection state changed to: {:?}", state);
            let _ = condition_tx.send(condition);
            condition_events.condition(condition);
            Box::pin(async {})
        }));

        // Remote audio: decode PCMU and hand it to the speaker
        let speaker = Arc::clone(&self.speaker);
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                info!("Remote audio track received (ssrc={})", track.ssrc());
                let speaker = Arc::clone(&speaker);
                tokio::spawn(async move {
                    let started = std::time::Instant::now();
                    while let Ok((packet, _)) = track.read_rtp().await {
                        speaker.play(AudioFrame {
                            samples: decode_ulaw(&packet.payload),
                            sample_rate: PCMU_RATE,
                            channels: 1,
                            timestamp_ms: started.elapsed().as_millis() as u64,
                        });
                    }
                    debug!("Remote audio track ended");
                });
                Box::pin(async {})
            },
        ));

        // Local audio: microphone frames out as PCMU samples
        let track = Arc::new(TrackLocalStaticSample::new(
            pcmu_capability(),
            "audio".to_owned(),
            "voice-interview".to_owned(),
        ));
        let sender = pc
            .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await
            .context("Failed to attach microphone track")?;

        // RTCP must be drained for interceptors to work
        tokio::spawn(async move { while sender.read_rtcp().await.is_ok() {} });

        let pump = tokio::spawn(pump_microphone(microphone, track));

        let dc = match pc.create_data_channel(DATA_CHANNEL_LABEL, None).await {
            Ok(dc) => dc,
            Err(e) => {
                pump.abort();
                return Err(e).context("Failed to open control channel");
            }
        };

        let message_events = events.clone();
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => message_events.message(text),
                Err(e) => warn!("Dropping non-UTF-8 control message: {}", e),
            }
            Box::pin(async {})
        }));

        info!("Peer transport created for attempt {}", events.attempt());

        Ok(WebRtcTransport {
            pc,
            dc,
            condition: condition_rx,
            pump,
            speaker: Arc::clone(&self.speaker),
        })
    }
}

async fn pump_microphone(
    mut microphone: mpsc::Receiver<AudioFrame>,
    track: Arc<TrackLocalStaticSample>,
) {
    while let Some(frame) = microphone.recv().await {
        let sample_count = frame.samples.len() as u64;
        if sample_count == 0 {
            continue;
        }

        let sample = Sample {
            data: Bytes::from(encode_ulaw(&frame.samples)),
            duration: Duration::from_micros(sample_count * 1_000_000 / PCMU_RATE as u64),
            ..Default::default()
        };

        if let Err(e) = track.write_sample(&sample).await {
            warn!("Failed to write microphone sample: {}", e);
        }
    }
    debug!("Microphone pump finished");
}

pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
    dc: Arc<RTCDataChannel>,
    condition: watch::Receiver<TransportCondition>,
    pump: JoinHandle<()>,
    speaker: Arc<dyn AudioSink>,
}

#[async_trait::async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<String> {
        let offer = self.pc.create_offer(None).await?;

        // Non-trickle: the provider only sees the single offer we POST
        let mut gather_complete = self.pc.gathering_complete_promise().await;
        self.pc.set_local_description(offer).await?;
        let _ = gather_complete.recv().await;

        let local = self
            .pc
            .local_description()
            .await
            .ok_or_else(|| anyhow!("No local description after gathering"))?;

        Ok(local.sdp)
    }

    async fn apply_answer(&self, sdp: &str) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp.to_owned())?;
        self.pc
            .set_remote_description(answer)
            .await
            .context("Failed to apply SDP answer")
    }

    fn watch_condition(&self) -> watch::Receiver<TransportCondition> {
        self.condition.clone()
    }

    fn channel_open(&self) -> bool {
        self.dc.ready_state() == RTCDataChannelState::Open
    }

    async fn send(&self, event: &ClientEvent) -> Result<()> {
        let text = event.to_json()?;
        self.dc
            .send_text(text)
            .await
            .context("Failed to send control message")?;
        Ok(())
    }

    async fn close(&self) {
        self.pump.abort();

        if let Err(e) = self.dc.close().await {
            debug!("Control channel close: {}", e);
        }
        if let Err(e) = self.pc.close().await {
            warn!("Peer connection close failed: {}", e);
        }

        self.speaker.clear();
        info!("Peer transport closed");
    }
}
