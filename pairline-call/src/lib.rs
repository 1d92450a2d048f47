pub mod channel;
pub mod controller;
pub mod error;
pub mod media;
pub mod session;

pub use channel::{ChannelConfig, SignalChannel, SignalConsumer};
pub use controller::{CallConfig, CallController};
pub use error::CallError;
pub use media::{
    LocalStream, MediaDevices, MediaError, PeerTransport, TransportEvent, TransportFactory,
};
pub use session::{CallSession, Phase, Role, SessionConfig};
