use serde::{Deserialize, Serialize};

/// Why a call reached `Ended`. `Hangup` and `Remote` are normal exits;
/// the rest are errors from the user's point of view.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum EndReason {
    /// Local user hung up.
    Hangup,
    /// The remote party ended the call.
    Remote,
    /// Camera/microphone could not be acquired; fatal to the attempt.
    DeviceAccess,
    /// Transport or store failure while setting the call up, with devices
    /// already granted. Fatal to the attempt, distinct from a denied device.
    SetupFailed,
    /// No answer arrived before the configured timeout; the peer is
    /// unreachable and the UI may offer a retry.
    NoAnswer,
}

/// Call status surfaced to the presentation layer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum CallStatus {
    Initializing,
    Calling,
    Connected,
    Ended { reason: EndReason },
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallStatus::Ended { .. })
    }
}
