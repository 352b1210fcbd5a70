use crate::observer::{MessageSource, RoomObserver, Status};
use crate::session::{ConnectionSession, NegotiationState, Role, SessionError};
use crate::transport::{PeerTransport, TransportEvent};
use duet_core::{ClientMessage, IceServerConfig, PartyId, RelayEvent, RoomId, SignalPayload};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

enum RoomCommand {
    Join(RoomId),
    Send(String),
    Leave,
}

/// Cloneable handle the embedding UI drives the controller with.
#[derive(Clone)]
pub struct RoomHandle {
    command_tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn join(&self, room: RoomId) {
        let _ = self.command_tx.send(RoomCommand::Join(room));
    }

    pub fn send(&self, text: impl Into<String>) {
        let _ = self.command_tx.send(RoomCommand::Send(text.into()));
    }

    pub fn leave(&self) {
        let _ = self.command_tx.send(RoomCommand::Leave);
    }
}

/// Orchestrates one party's side of a room: relay events in, session
/// calls out, status and chat up to the observer. Everything is
/// processed on one serial event loop, so the session needs no locking.
pub struct RoomController {
    party_id: Option<PartyId>,
    ice_servers: Vec<IceServerConfig>,
    room: Option<RoomId>,
    session: Option<ConnectionSession>,
    channel: Option<Arc<RTCDataChannel>>,
    observer: Arc<dyn RoomObserver>,
    relay_tx: mpsc::UnboundedSender<ClientMessage>,
    relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
    command_rx: mpsc::UnboundedReceiver<RoomCommand>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
}

impl RoomController {
    pub fn new(
        relay_tx: mpsc::UnboundedSender<ClientMessage>,
        relay_rx: mpsc::UnboundedReceiver<RelayEvent>,
        observer: Arc<dyn RoomObserver>,
    ) -> (Self, RoomHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::channel(256);

        let controller = Self {
            party_id: None,
            ice_servers: Vec::new(),
            room: None,
            session: None,
            channel: None,
            observer,
            relay_tx,
            relay_rx,
            command_rx,
            transport_tx,
            transport_rx,
        };

        (controller, RoomHandle { command_tx })
    }

    pub async fn run(mut self) {
        info!("Room controller event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            // Handle dropped: shut down this party.
                            self.teardown().await;
                            break;
                        }
                    }
                }

                event = self.relay_rx.recv() => {
                    match event {
                        Some(e) => self.handle_relay_event(e).await,
                        None => {
                            // Relay connection is gone.
                            info!("Relay link closed, shutting down");
                            self.teardown().await;
                            break;
                        }
                    }
                }

                event = self.transport_rx.recv() => {
                    if let Some(e) = event {
                        self.handle_transport_event(e).await;
                    }
                }
            }
        }

        info!("Room controller event loop finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join(room) => {
                if self.room.is_some() {
                    // Re-join: release the previous room first.
                    self.send_to_relay(ClientMessage::LeaveRoom);
                    self.teardown_session().await;
                }
                match &self.party_id {
                    Some(id) => info!("Party {id} joining room {room}"),
                    None => info!("Joining room {room} before welcome"),
                }
                self.room = Some(room.clone());
                self.observer.on_status(Status::Joining).await;
                self.send_to_relay(ClientMessage::JoinRoom { room });
            }

            RoomCommand::Send(text) => self.send_text(text).await,

            RoomCommand::Leave => {
                self.send_to_relay(ClientMessage::LeaveRoom);
                self.room = None;
                self.teardown().await;
            }
        }
    }

    async fn send_text(&mut self, text: String) {
        let connected = self
            .session
            .as_ref()
            .is_some_and(|s| s.state() == NegotiationState::Connected);

        let channel = match (connected, self.channel.clone()) {
            (true, Some(channel)) => channel,
            _ => {
                warn!("Ignoring send: no connected session");
                return;
            }
        };

        match channel.send_text(text.clone()).await {
            Ok(_) => self.observer.on_message(MessageSource::Local, text).await,
            Err(e) => {
                error!("Failed to send over data channel: {e}");
                self.teardown().await;
            }
        }
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Welcome {
                party_id,
                ice_servers,
            } => {
                info!("Assigned party id {party_id}");
                self.party_id = Some(party_id);
                self.ice_servers = ice_servers;
            }

            RelayEvent::RoomFull => {
                info!("Room is full");
                self.room = None;
                self.observer.on_status(Status::RoomFull).await;
            }

            RelayEvent::UserJoined { party_id } => self.start_negotiation(party_id).await,

            RelayEvent::UserLeft { party_id } => {
                info!("Peer {party_id} left the room");
                let matches_peer = self
                    .session
                    .as_ref()
                    .is_some_and(|s| *s.remote() == party_id);
                if matches_peer {
                    self.teardown().await;
                }
            }

            RelayEvent::Signal { from, payload } => self.handle_signal(from, payload).await,
        }
    }

    /// A peer appeared in our room: we are the existing member, so we
    /// initiate toward it.
    async fn start_negotiation(&mut self, peer: PartyId) {
        info!("Peer {peer} joined, creating offer");

        if self.session.is_some() {
            // A stale session can only mean the peer reconnected.
            self.teardown_session().await;
        }

        let transport =
            match PeerTransport::new(&self.ice_servers, self.transport_tx.clone()).await {
                Ok(transport) => transport,
                Err(e) => {
                    error!("Failed to create transport: {e:?}");
                    return;
                }
            };

        let mut session = ConnectionSession::new(peer.clone(), Role::Initiator, transport);
        match session.create_offer().await {
            Ok(sdp) => {
                self.send_to_relay(ClientMessage::Signal {
                    target: peer,
                    payload: SignalPayload::Offer { sdp },
                });
                session.offer_sent();
                self.session = Some(session);
            }
            Err(e) => {
                error!("Failed to create offer for {peer}: {e}");
                session.close().await;
            }
        }
    }

    async fn handle_signal(&mut self, from: PartyId, payload: SignalPayload) {
        match payload {
            SignalPayload::Offer { sdp } => {
                if self.session.is_none() {
                    let transport =
                        match PeerTransport::new(&self.ice_servers, self.transport_tx.clone())
                            .await
                        {
                            Ok(transport) => transport,
                            Err(e) => {
                                error!("Failed to create transport: {e:?}");
                                return;
                            }
                        };
                    self.session = Some(ConnectionSession::new(
                        from.clone(),
                        Role::Responder,
                        transport,
                    ));
                }

                let Some(session) = self.session.as_mut() else {
                    return;
                };
                match session.receive_offer(sdp).await {
                    Ok(answer) => self.send_to_relay(ClientMessage::Signal {
                        target: from,
                        payload: SignalPayload::Answer { sdp: answer },
                    }),
                    Err(e) => self.handle_session_error(e).await,
                }
            }

            SignalPayload::Answer { sdp } => {
                let Some(session) = self.session.as_mut() else {
                    warn!("Answer from {from} with no active session, dropped");
                    return;
                };
                if let Err(e) = session.receive_answer(sdp).await {
                    self.handle_session_error(e).await;
                }
            }

            SignalPayload::IceCandidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Candidate from {from} with no active session, dropped");
                    return;
                };
                let init = RTCIceCandidateInit {
                    candidate,
                    sdp_mid,
                    sdp_mline_index: sdp_m_line_index,
                    username_fragment: None,
                };
                if let Err(e) = session.add_remote_candidate(init).await {
                    warn!("Rejected candidate from {from}: {e}");
                }
            }
        }
    }

    async fn handle_session_error(&mut self, err: SessionError) {
        match err {
            // Only the offending message is rejected; the session lives.
            SessionError::MalformedSignal(_) => warn!("Rejected signal: {err}"),
            SessionError::InvalidState { .. } | SessionError::Transport(_) => {
                error!("Negotiation failed: {err}");
                self.teardown().await;
            }
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ChannelReady(channel) => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Channel ready after session teardown, ignored");
                    return;
                };
                info!("Data channel ready, session with {} connected", session.remote());
                session.channel_open();
                self.channel = Some(channel);
                self.observer.on_status(Status::Connected).await;
            }

            TransportEvent::Message(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                self.observer.on_message(MessageSource::Remote, text).await;
            }

            TransportEvent::CandidateGenerated(init) => {
                let Some(session) = self.session.as_ref() else {
                    debug!("Local candidate after session teardown, dropped");
                    return;
                };
                self.send_to_relay(ClientMessage::Signal {
                    target: session.remote().clone(),
                    payload: SignalPayload::IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    },
                });
            }

            TransportEvent::Disconnected => {
                if self.session.is_some() {
                    info!("Transport reported disconnect");
                    self.teardown().await;
                }
            }
        }
    }

    /// Tear down the active session, surfacing `Disconnected` if there
    /// was one. Safe to call repeatedly.
    async fn teardown(&mut self) {
        let had_session = self.session.is_some();
        self.teardown_session().await;
        if had_session {
            self.observer.on_status(Status::Disconnected).await;
        }
    }

    async fn teardown_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.channel = None;
    }

    fn send_to_relay(&self, msg: ClientMessage) {
        if self.relay_tx.send(msg).is_err() {
            debug!("Relay link closed, outbound message dropped");
        }
    }
}
