pub mod model;

pub use model::{
    CallId, CallStatus, EndReason, Signal, SignalDraft, SignalId, SignalKind, UserId,
};
