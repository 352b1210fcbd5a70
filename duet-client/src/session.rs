use crate::transport::PeerTransport;
use duet_core::PartyId;
use thiserror::Error;
use tracing::{debug, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

/// Which side of the negotiation this session plays. Exactly one party
/// per session holds each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Negotiation progress. `Closed` is terminal and reachable from every
/// state; the initiator walks the offer path, the responder the answer
/// path, and both meet in `Negotiating` before the channel opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferCreated,
    AnswerAwaited,
    OfferReceived,
    AnswerCreated,
    Negotiating,
    Connected,
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation is not legal in the session's current state. The
    /// state is left untouched; the caller decides whether to restart.
    #[error("operation invalid in state {state:?}")]
    InvalidState { state: NegotiationState },

    /// The remote party sent something the transport cannot apply. Only
    /// the offending message is rejected; the session stays alive.
    #[error("malformed signal: {0}")]
    MalformedSignal(String),

    /// The local transport stack failed.
    #[error("transport failure: {0}")]
    Transport(#[from] anyhow::Error),
}

/// One transport-negotiation attempt with one remote party. Owned by the
/// RoomController, which serializes all calls; candidates that arrive
/// before the remote description are buffered and flushed in order.
pub struct ConnectionSession {
    remote: PartyId,
    role: Role,
    state: NegotiationState,
    transport: PeerTransport,
    pending_candidates: Vec<RTCIceCandidateInit>,
    remote_description_set: bool,
}

impl ConnectionSession {
    pub fn new(remote: PartyId, role: Role, transport: PeerTransport) -> Self {
        Self {
            remote,
            role,
            state: NegotiationState::Idle,
            transport,
            pending_candidates: Vec::new(),
            remote_description_set: false,
        }
    }

    pub fn remote(&self) -> &PartyId {
        &self.remote
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Open the local endpoint and produce the offer description. This
    /// component has no relay access: the caller relays the offer and
    /// then acknowledges with `offer_sent`.
    pub async fn create_offer(&mut self) -> Result<String, SessionError> {
        if self.role != Role::Initiator || self.state != NegotiationState::Idle {
            return Err(SessionError::InvalidState { state: self.state });
        }

        let sdp = self.transport.create_offer().await?;
        self.state = NegotiationState::OfferCreated;
        Ok(sdp)
    }

    /// The offer has been handed to the relay; the answer is now owed.
    pub fn offer_sent(&mut self) {
        if self.state == NegotiationState::OfferCreated {
            self.state = NegotiationState::AnswerAwaited;
        }
    }

    /// Record the remote offer and produce the local answer.
    pub async fn receive_offer(&mut self, sdp: String) -> Result<String, SessionError> {
        if self.role != Role::Responder || self.state != NegotiationState::Idle {
            return Err(SessionError::InvalidState { state: self.state });
        }

        self.transport
            .apply_remote_offer(sdp)
            .await
            .map_err(|e| SessionError::MalformedSignal(e.to_string()))?;
        self.state = NegotiationState::OfferReceived;
        self.remote_description_set = true;
        self.flush_pending_candidates().await;

        let answer = self.transport.create_answer().await?;
        self.state = NegotiationState::AnswerCreated;
        Ok(answer)
    }

    /// Record the remote answer. A duplicate answer is rejected, not
    /// silently re-applied.
    pub async fn receive_answer(&mut self, sdp: String) -> Result<(), SessionError> {
        if !matches!(
            self.state,
            NegotiationState::OfferCreated | NegotiationState::AnswerAwaited
        ) {
            return Err(SessionError::InvalidState { state: self.state });
        }

        self.transport
            .apply_remote_answer(sdp)
            .await
            .map_err(|e| SessionError::MalformedSignal(e.to_string()))?;
        self.remote_description_set = true;
        self.state = NegotiationState::Negotiating;
        self.flush_pending_candidates().await;
        Ok(())
    }

    /// Apply a remote candidate, or buffer it until the remote
    /// description lands. Candidates are not deduplicated; the transport
    /// tolerates redundant delivery.
    pub async fn add_remote_candidate(
        &mut self,
        candidate: RTCIceCandidateInit,
    ) -> Result<(), SessionError> {
        if self.state == NegotiationState::Closed {
            debug!("Ignoring candidate for closed session with {}", self.remote);
            return Ok(());
        }

        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return Ok(());
        }

        if self.state == NegotiationState::AnswerCreated {
            self.state = NegotiationState::Negotiating;
        }

        self.transport
            .add_candidate(candidate)
            .await
            .map_err(|e| SessionError::MalformedSignal(e.to_string()))
    }

    async fn flush_pending_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.transport.add_candidate(candidate).await {
                warn!("Failed to apply buffered candidate: {e:?}");
            }
        }
    }

    pub fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    /// The transport's data channel came up.
    pub fn channel_open(&mut self) {
        if self.state != NegotiationState::Closed {
            self.state = NegotiationState::Connected;
        }
    }

    /// Idempotent teardown. Channel close, remote leave and explicit
    /// local teardown all land here; the transport is released once.
    pub async fn close(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.state = NegotiationState::Closed;
        if let Err(e) = self.transport.close().await {
            debug!("Error releasing transport for {}: {e:?}", self.remote);
        }
    }
}
