use crate::channel::{ChannelConfig, SignalChannel};
use crate::error::CallError;
use crate::media::{MediaDevices, MediaError, TransportFactory};
use crate::session::{CallSession, Role, SessionConfig};
use pairline_core::{CallId, CallStatus, EndReason, UserId};
use pairline_relay::SignalStore;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::error;

#[derive(Debug, Clone, Default)]
pub struct CallConfig {
    pub channel: ChannelConfig,
    pub session: SessionConfig,
}

/// Owns one call's identity and lifecycle for the local participant.
///
/// Wires store, channel, and session together, runs the background tasks,
/// and exposes exactly what the presentation layer needs: a status stream,
/// the media toggles, and hangup. Relay-internal churn never crosses this
/// boundary; only device-access, setup, and no-answer failures do.
#[derive(Debug)]
pub struct CallController {
    session: Arc<CallSession>,
    call_id: CallId,
    status: watch::Receiver<CallStatus>,
}

impl CallController {
    /// Start a call to `peer` as the initiator. Generates the call id and
    /// submits the opening offer.
    pub async fn call(
        local: UserId,
        peer: UserId,
        store: Arc<dyn SignalStore>,
        devices: &dyn MediaDevices,
        transports: &dyn TransportFactory,
        config: CallConfig,
    ) -> Result<Self, CallError> {
        let call_id = CallId::generate();
        Self::start(Role::Caller, local, peer, call_id, store, devices, transports, config).await
    }

    /// Answer an incoming call whose id arrived out of band (the original
    /// application passed it alongside the chat notification).
    pub async fn join(
        local: UserId,
        peer: UserId,
        call_id: CallId,
        store: Arc<dyn SignalStore>,
        devices: &dyn MediaDevices,
        transports: &dyn TransportFactory,
        config: CallConfig,
    ) -> Result<Self, CallError> {
        Self::start(Role::Callee, local, peer, call_id, store, devices, transports, config).await
    }

    async fn start(
        role: Role,
        local: UserId,
        peer: UserId,
        call_id: CallId,
        store: Arc<dyn SignalStore>,
        devices: &dyn MediaDevices,
        transports: &dyn TransportFactory,
        config: CallConfig,
    ) -> Result<Self, CallError> {
        let channel = Arc::new(SignalChannel::new(
            store,
            local,
            peer,
            call_id.clone(),
            config.channel,
        ));

        let (status_tx, status_rx) = watch::channel(CallStatus::Initializing);
        let (events_tx, events_rx) = mpsc::channel(64);
        let session = Arc::new(CallSession::new(
            role,
            channel.clone(),
            config.session,
            status_tx,
        ));

        if let Err(e) = session.begin(devices, transports, events_tx).await {
            error!(call_id = %call_id, "call setup failed: {}", e);
            session.end(setup_failure_reason(&e)).await;
            return Err(e);
        }

        tokio::spawn(session.clone().run_transport_events(events_rx));
        let _ = channel.start(session.clone());
        session.spawn_answer_timeout();

        Ok(Self {
            session,
            call_id,
            status: status_rx,
        })
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    /// Status stream for the presentation layer:
    /// `Initializing → Calling → Connected → Ended { reason }`.
    pub fn status(&self) -> watch::Receiver<CallStatus> {
        self.status.clone()
    }

    /// `true` while the relay store keeps failing reads. "Connection
    /// trouble" banner material, never a terminal state.
    pub fn relay_trouble(&self) -> watch::Receiver<bool> {
        self.session.relay_trouble()
    }

    /// Flip the local video track; returns the new enabled state.
    pub async fn toggle_video(&self) -> bool {
        self.session.toggle_video().await
    }

    /// Flip the local audio track; returns the new enabled state.
    pub async fn toggle_audio(&self) -> bool {
        self.session.toggle_audio().await
    }

    /// End the call locally and notify the peer, best effort. Safe to call
    /// at any time, including after the call already ended.
    pub async fn hangup(&self) {
        self.session.hangup().await;
    }

    pub fn session(&self) -> &Arc<CallSession> {
        &self.session
    }
}

/// Denied devices keep their own taxonomy entry; transport and store
/// failures during setup are reported as a plain setup failure instead of
/// masquerading as a device problem.
fn setup_failure_reason(error: &CallError) -> EndReason {
    match error {
        CallError::Media(MediaError::Access(_)) => EndReason::DeviceAccess,
        _ => EndReason::SetupFailed,
    }
}
