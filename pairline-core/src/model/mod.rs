mod call;
mod signal;
mod status;
mod user;

pub use call::CallId;
pub use signal::{Signal, SignalDraft, SignalId, SignalKind};
pub use status::{CallStatus, EndReason};
pub use user::UserId;
