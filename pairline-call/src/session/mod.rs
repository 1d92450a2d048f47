mod phase;
mod session;

pub use phase::{Phase, Role};
pub use session::{CallSession, SessionConfig};

pub(crate) use phase::{SignalDisposition, decide};
