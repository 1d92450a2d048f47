use crate::model::{CallId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct SignalId(pub Uuid);

impl SignalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
    EndCall,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
            SignalKind::EndCall => "end-call",
        };
        write!(f, "{}", s)
    }
}

/// Outgoing signal as submitted by a client; the store assigns `id` and
/// `created_at` on write.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignalDraft {
    pub from: UserId,
    pub to: UserId,
    pub call_id: CallId,
    pub kind: SignalKind,
    /// Serialized session description or connectivity candidate. Opaque to
    /// the relay; passed through whole.
    pub payload: String,
}

/// The one wire/storage entity: a message in flight between the two parties
/// of a call, parked in the store until its recipient consumes it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Signal {
    pub id: SignalId,
    pub from: UserId,
    pub to: UserId,
    pub call_id: CallId,
    pub kind: SignalKind,
    pub payload: String,
    /// Store-assigned, epoch milliseconds. Read ordering only; never
    /// business logic.
    pub created_at: u64,
}
