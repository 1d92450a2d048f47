use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum MediaError {
    /// Camera/microphone denied or unavailable. Fatal to the call attempt.
    #[error("media device access failed: {0}")]
    Access(String),

    #[error("peer transport failure: {0}")]
    Transport(String),
}

/// Events the platform transport reports back to the session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local connectivity candidate was generated; trickled to the peer
    /// immediately, never batched.
    CandidateGenerated(String),
    /// A usable media path is up and remote media is flowing. This, not any
    /// signal, is what declares the call connected.
    Ready,
    /// The transport shut down on its own.
    Closed,
}

/// Platform capability that acquires local capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open(&self) -> Result<Arc<dyn LocalStream>, MediaError>;
}

/// A live local capture stream. Exclusively owned by the active session and
/// stopped on every exit path, without exception.
pub trait LocalStream: Send + Sync {
    fn set_video_enabled(&self, enabled: bool);
    fn set_audio_enabled(&self, enabled: bool);
    fn video_enabled(&self) -> bool;
    fn audio_enabled(&self) -> bool;

    /// Stop all tracks and release the devices. Idempotent.
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

/// The platform peer connection. Descriptions and candidates are opaque
/// serialized strings; the session routes them, it never inspects them.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<String, MediaError>;
    async fn create_answer(&self) -> Result<String, MediaError>;
    async fn set_local_description(&self, description: String) -> Result<(), MediaError>;
    async fn set_remote_description(&self, description: String) -> Result<(), MediaError>;
    async fn add_ice_candidate(&self, candidate: String) -> Result<(), MediaError>;

    /// Tear the transport down. Idempotent.
    async fn close(&self) -> Result<(), MediaError>;
    fn is_closed(&self) -> bool;
}

/// Builds the peer transport around an acquired local stream, wiring its
/// events into the session's event channel.
pub trait TransportFactory: Send + Sync {
    fn create(
        &self,
        local_stream: Arc<dyn LocalStream>,
        events: mpsc::Sender<TransportEvent>,
    ) -> Arc<dyn PeerTransport>;
}
