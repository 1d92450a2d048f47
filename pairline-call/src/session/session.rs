use crate::channel::{SignalChannel, SignalConsumer};
use crate::error::CallError;
use crate::media::{LocalStream, MediaDevices, PeerTransport, TransportEvent, TransportFactory};
use crate::session::{Phase, Role, SignalDisposition, decide};
use async_trait::async_trait;
use pairline_core::{CallStatus, EndReason, Signal, SignalKind};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a caller waits in `AwaitingAnswer` before giving up with
    /// [`EndReason::NoAnswer`]. `None` waits forever, which leaks the local
    /// devices if the callee never shows up.
    pub answer_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            answer_timeout: Some(Duration::from_secs(45)),
        }
    }
}

struct SessionState {
    phase: Phase,
    local_description: Option<String>,
    remote_description: Option<String>,
    /// Remote candidates that arrived before the remote description; the
    /// expected trickle ordering, not an exception. Drained in receipt
    /// order once the description lands.
    buffered_candidates: Vec<String>,
    /// Candidate payloads already handed to the transport. Redelivered
    /// candidates hit this set and become no-ops.
    applied_candidates: HashSet<String>,
    /// Set once this side's half of the handshake fully succeeded: answer
    /// applied and buffer drained (caller), or answer submitted (callee).
    /// Guards duplicate offers/answers while a redelivered signal can still
    /// resume a half-finished apply.
    negotiated: bool,
    end_reason: Option<EndReason>,
    stream: Option<Arc<dyn LocalStream>>,
    transport: Option<Arc<dyn PeerTransport>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            local_description: None,
            remote_description: None,
            buffered_candidates: Vec::new(),
            applied_candidates: HashSet::new(),
            negotiated: false,
            end_reason: None,
            stream: None,
            transport: None,
        }
    }
}

/// Per-call state machine and signal interpreter for one participant.
///
/// Consumes the channel's drained signals, owns the local/remote
/// descriptions and the trickled candidate buffer, and emits outgoing
/// signals. All mutable state sits behind one mutex, so the poll callback
/// and user-initiated calls (hangup, toggles) never race.
pub struct CallSession {
    role: Role,
    channel: Arc<SignalChannel>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    status: watch::Sender<CallStatus>,
    trouble: watch::Sender<bool>,
}

impl CallSession {
    pub fn new(
        role: Role,
        channel: Arc<SignalChannel>,
        config: SessionConfig,
        status: watch::Sender<CallStatus>,
    ) -> Self {
        let (trouble, _) = watch::channel(false);
        Self {
            role,
            channel,
            config,
            state: Mutex::new(SessionState::new()),
            status,
            trouble,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    pub async fn end_reason(&self) -> Option<EndReason> {
        self.state.lock().await.end_reason
    }

    /// `true` while the store has been failing reads past the channel's
    /// trouble threshold. Informational; never ends the call.
    pub fn relay_trouble(&self) -> watch::Receiver<bool> {
        self.trouble.subscribe()
    }

    /// Acquire local media, build the transport, and (as caller) create
    /// and submit the offer. Any failure here is fatal to the attempt;
    /// the owner ends the session with a reason derived from the error
    /// ([`EndReason::DeviceAccess`] or [`EndReason::SetupFailed`]).
    pub async fn begin(
        &self,
        devices: &dyn MediaDevices,
        factory: &dyn TransportFactory,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), CallError> {
        let stream = devices.open().await?;
        self.state.lock().await.stream = Some(stream.clone());

        let transport = factory.create(stream, events);
        self.state.lock().await.transport = Some(transport.clone());

        match self.role {
            Role::Caller => {
                self.state.lock().await.phase = Phase::Offering;

                let offer = transport.create_offer().await?;
                transport.set_local_description(offer.clone()).await?;
                {
                    let mut st = self.state.lock().await;
                    st.local_description = Some(offer.clone());
                }
                self.channel.submit(SignalKind::Offer, offer).await?;
                {
                    let mut st = self.state.lock().await;
                    // A remote end-call could have landed mid-setup.
                    if st.phase == Phase::Offering {
                        st.phase = Phase::AwaitingAnswer;
                    }
                }
                info!(call_id = %self.channel.call_id(), "offer submitted, awaiting answer");
            }
            Role::Callee => {
                info!(call_id = %self.channel.call_id(), "waiting for remote offer");
            }
        }

        let _ = self.status.send(CallStatus::Calling);
        Ok(())
    }

    /// Pump transport events: trickle generated candidates out as signals
    /// and declare the call connected when the media path reports ready.
    pub async fn run_transport_events(
        self: Arc<Self>,
        mut events: mpsc::Receiver<TransportEvent>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::CandidateGenerated(candidate) => {
                    if self.phase().await == Phase::Ended {
                        break;
                    }
                    if let Err(e) = self
                        .channel
                        .submit(SignalKind::IceCandidate, candidate)
                        .await
                    {
                        // Lost candidates degrade connectivity, not
                        // correctness; the transport keeps generating.
                        warn!("trickled candidate not submitted: {}", e);
                    }
                }
                TransportEvent::Ready => {
                    let connected = {
                        let mut st = self.state.lock().await;
                        if st.phase != Phase::Ended && st.phase != Phase::Connected {
                            st.phase = Phase::Connected;
                            true
                        } else {
                            false
                        }
                    };
                    if connected {
                        let _ = self.status.send(CallStatus::Connected);
                        info!(call_id = %self.channel.call_id(), "transport ready, call connected");
                    }
                }
                TransportEvent::Closed => {
                    debug!("transport closed, event pump exiting");
                    break;
                }
            }
        }
    }

    /// Arm the no-answer timeout for a caller. A session still in
    /// `AwaitingAnswer` with no remote description when it fires ends with
    /// [`EndReason::NoAnswer`].
    pub fn spawn_answer_timeout(self: &Arc<Self>) {
        if self.role != Role::Caller {
            return;
        }
        let Some(timeout) = self.config.answer_timeout else {
            return;
        };

        let session = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let unanswered = {
                let st = session.state.lock().await;
                st.phase == Phase::AwaitingAnswer && st.remote_description.is_none()
            };
            if unanswered {
                warn!(
                    call_id = %session.channel.call_id(),
                    "no answer within {:?}, ending call", timeout
                );
                session.end(EndReason::NoAnswer).await;
            }
        });
    }

    /// Local hangup: tell the peer, then end immediately without waiting
    /// for anything to come back.
    pub async fn hangup(&self) {
        if self.phase().await == Phase::Ended {
            return;
        }
        if let Err(e) = self.channel.submit(SignalKind::EndCall, "{}".to_string()).await {
            // Best effort; the peer's own timeout/hangup covers the rest.
            warn!("end-call signal not submitted: {}", e);
        }
        self.end(EndReason::Hangup).await;
    }

    /// Tear the session down. Runs on every exit path and exactly once:
    /// stops all local tracks, closes the transport, stops polling.
    pub async fn end(&self, reason: EndReason) {
        let (stream, transport) = {
            let mut st = self.state.lock().await;
            if st.phase == Phase::Ended {
                return;
            }
            st.phase = Phase::Ended;
            st.end_reason = Some(reason);
            (st.stream.take(), st.transport.take())
        };

        if let Some(stream) = stream {
            stream.stop();
        }
        if let Some(transport) = transport {
            if let Err(e) = transport.close().await {
                warn!("transport close failed: {}", e);
            }
        }
        self.channel.stop();

        let _ = self.status.send(CallStatus::Ended { reason });
        info!(call_id = %self.channel.call_id(), ?reason, "call ended");
    }

    pub async fn toggle_video(&self) -> bool {
        let st = self.state.lock().await;
        match &st.stream {
            Some(stream) => {
                let enabled = !stream.video_enabled();
                stream.set_video_enabled(enabled);
                enabled
            }
            None => false,
        }
    }

    pub async fn toggle_audio(&self) -> bool {
        let st = self.state.lock().await;
        match &st.stream {
            Some(stream) => {
                let enabled = !stream.audio_enabled();
                stream.set_audio_enabled(enabled);
                enabled
            }
            None => false,
        }
    }

    /// Flush buffered early candidates to the transport in receipt order.
    /// Leaves anything not yet applied in the buffer if the transport
    /// rejects one, so a later attempt can resume.
    async fn drain_buffered(
        st: &mut SessionState,
        transport: &Arc<dyn PeerTransport>,
    ) -> Result<(), CallError> {
        let pending = std::mem::take(&mut st.buffered_candidates);
        for (i, candidate) in pending.iter().enumerate() {
            if st.applied_candidates.contains(candidate) {
                continue;
            }
            if let Err(e) = transport.add_ice_candidate(candidate.clone()).await {
                st.buffered_candidates = pending[i..].to_vec();
                return Err(e.into());
            }
            st.applied_candidates.insert(candidate.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl SignalConsumer for CallSession {
    async fn apply(&self, signal: &Signal) -> Result<(), CallError> {
        let mut st = self.state.lock().await;
        let disposition = decide(self.role, st.phase, st.negotiated, signal.kind);

        match disposition {
            SignalDisposition::Ignore(why) => {
                debug!(id = %signal.id, kind = %signal.kind, "signal dropped: {}", why);
                Ok(())
            }

            // Both apply paths are resumable: a failed step returns Err,
            // the signal stays in the store, and the redelivery skips
            // whatever already took effect instead of being dropped as a
            // duplicate.
            SignalDisposition::ApplyAnswer => {
                let transport = st.transport.clone().ok_or(CallError::NoTransport)?;
                if st.remote_description.is_none() {
                    transport
                        .set_remote_description(signal.payload.clone())
                        .await?;
                    st.remote_description = Some(signal.payload.clone());
                }
                Self::drain_buffered(&mut st, &transport).await?;
                st.negotiated = true;
                info!(call_id = %signal.call_id, "answer applied, awaiting transport readiness");
                Ok(())
            }

            SignalDisposition::ApplyOffer => {
                let transport = st.transport.clone().ok_or(CallError::NoTransport)?;
                if st.remote_description.is_none() {
                    transport
                        .set_remote_description(signal.payload.clone())
                        .await?;
                    st.remote_description = Some(signal.payload.clone());
                }
                Self::drain_buffered(&mut st, &transport).await?;

                let answer = match &st.local_description {
                    Some(answer) => answer.clone(),
                    None => {
                        let answer = transport.create_answer().await?;
                        transport.set_local_description(answer.clone()).await?;
                        st.local_description = Some(answer.clone());
                        answer
                    }
                };
                st.phase = Phase::Answering;
                self.channel.submit(SignalKind::Answer, answer).await?;
                st.negotiated = true;
                info!(call_id = %signal.call_id, "offer applied, answer submitted");
                Ok(())
            }

            SignalDisposition::ApplyCandidate => {
                if st.applied_candidates.contains(&signal.payload) {
                    debug!(id = %signal.id, "duplicate candidate ignored");
                    return Ok(());
                }
                if st.remote_description.is_none() {
                    if !st.buffered_candidates.contains(&signal.payload) {
                        st.buffered_candidates.push(signal.payload.clone());
                    }
                    debug!(id = %signal.id, "candidate buffered until remote description is set");
                    return Ok(());
                }

                let transport = st.transport.clone().ok_or(CallError::NoTransport)?;
                // A failed drain earlier can leave stragglers; they go
                // first to keep receipt order.
                Self::drain_buffered(&mut st, &transport).await?;
                transport.add_ice_candidate(signal.payload.clone()).await?;
                st.applied_candidates.insert(signal.payload.clone());
                Ok(())
            }

            SignalDisposition::EndCall => {
                drop(st);
                info!(call_id = %signal.call_id, "remote party ended the call");
                self.end(EndReason::Remote).await;
                Ok(())
            }
        }
    }

    async fn on_relay_trouble(&self) {
        warn!(call_id = %self.channel.call_id(), "signal store unreachable, still retrying");
        let _ = self.trouble.send(true);
    }

    async fn on_relay_recovered(&self) {
        info!(call_id = %self.channel.call_id(), "signal store reachable again");
        let _ = self.trouble.send(false);
    }
}
