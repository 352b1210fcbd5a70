use anyhow::{Context, Result};
use bytes::Bytes;
use duet_core::IceServerConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Label of the single chat data channel, shared by both sides.
const DATA_CHANNEL_LABEL: &str = "messaging";

/// Events the transport pushes into the controller's serial loop. Local
/// candidate discovery arrives here too, so it never interleaves with an
/// in-flight negotiation call.
pub enum TransportEvent {
    ChannelReady(Arc<RTCDataChannel>),
    Message(Bytes),
    CandidateGenerated(RTCIceCandidateInit),
    Disconnected,
}

/// One WebRTC peer connection plus its callback wiring. All outcomes
/// flow through the event channel handed to `new`.
pub struct PeerTransport {
    pc: Arc<RTCPeerConnection>,
    event_tx: mpsc::Sender<TransportEvent>,
}

impl PeerTransport {
    pub async fn new(
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                debug!("Peer connection state: {state:?}");
                match state {
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(TransportEvent::Disconnected).await;
                    }
                    _ => {}
                }
            })
        }));

        // Trickle ICE: forward each local candidate as it is discovered.
        let ice_tx = event_tx.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(init)).await;
            })
        }));

        // The remote side may open the channel (we are the responder).
        let dc_tx = event_tx.clone();
        pc.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            Box::pin(async move {
                info!("Incoming data channel '{}'", dc.label());
                Self::wire_data_channel(dc, tx);
            })
        }));

        Ok(Self { pc, event_tx })
    }

    fn wire_data_channel(dc: Arc<RTCDataChannel>, event_tx: mpsc::Sender<TransportEvent>) {
        let open_tx = event_tx.clone();
        let dc_ready = dc.clone();
        dc.on_open(Box::new(move || {
            let tx = open_tx.clone();
            let channel = dc_ready.clone();
            Box::pin(async move {
                info!("Data channel '{}' open", channel.label());
                let _ = tx.send(TransportEvent::ChannelReady(channel)).await;
            })
        }));

        let close_tx = event_tx.clone();
        dc.on_close(Box::new(move || {
            let tx = close_tx.clone();
            Box::pin(async move {
                debug!("Data channel closed");
                let _ = tx.send(TransportEvent::Disconnected).await;
            })
        }));

        let msg_tx = event_tx;
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let tx = msg_tx.clone();
            Box::pin(async move {
                let data = Bytes::from(msg.data.to_vec());
                let _ = tx.send(TransportEvent::Message(data)).await;
            })
        }));
    }

    /// Open the chat channel and produce the local offer description.
    pub async fn create_offer(&self) -> Result<String> {
        let dc = self
            .pc
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await
            .context("Failed to create data channel")?;
        Self::wire_data_channel(dc, self.event_tx.clone());

        let offer = self
            .pc
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;

        Ok(offer.sdp)
    }

    pub async fn apply_remote_offer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::offer(sdp)?;
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    /// Produce the local answer to a previously applied remote offer.
    pub async fn create_answer(&self) -> Result<String> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;
        Ok(answer.sdp)
    }

    pub async fn apply_remote_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp)?;
        self.pc.set_remote_description(desc).await?;
        Ok(())
    }

    pub async fn add_candidate(&self, candidate: RTCIceCandidateInit) -> Result<()> {
        self.pc
            .add_ice_candidate(candidate)
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}
