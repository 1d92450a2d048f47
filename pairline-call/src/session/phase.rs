use pairline_core::SignalKind;

/// Which side of the call this session is. The caller creates the call id
/// and sends the first offer; the callee waits for it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Role {
    Caller,
    Callee,
}

/// Negotiation phase of one session.
///
/// Caller: `Idle → Offering → AwaitingAnswer → Connected → Ended`.
/// Callee: `Idle → Answering → Connected → Ended`.
/// `Connected` is only entered when the transport reports readiness, never
/// on a signal alone.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Offering,
    AwaitingAnswer,
    Answering,
    Connected,
    Ended,
}

/// What to do with one incoming signal, decided purely from the current
/// phase snapshot. Effects (transport calls, submits, teardown) happen
/// afterwards, so every guard here is independently testable.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SignalDisposition {
    ApplyOffer,
    ApplyAnswer,
    ApplyCandidate,
    EndCall,
    /// Dropped silently with the given diagnostic. Expected artifacts of
    /// at-least-once delivery, not errors.
    Ignore(&'static str),
}

/// `negotiated` means this side's half of the handshake fully completed.
/// Keying the duplicate guard on it (instead of "remote description set")
/// lets a redelivered offer/answer resume an apply that failed partway,
/// while a finished negotiation still drops duplicates.
pub(crate) fn decide(
    role: Role,
    phase: Phase,
    negotiated: bool,
    kind: SignalKind,
) -> SignalDisposition {
    use SignalDisposition::*;

    if phase == Phase::Ended {
        return match kind {
            SignalKind::EndCall => Ignore("end-call for already ended call"),
            _ => Ignore("signal for ended call"),
        };
    }

    match kind {
        SignalKind::Offer => {
            if role == Role::Caller {
                Ignore("offer received on the offering side")
            } else if negotiated {
                Ignore("duplicate offer, negotiation already resolved")
            } else {
                ApplyOffer
            }
        }
        SignalKind::Answer => {
            if role == Role::Callee {
                Ignore("answer received on the answering side")
            } else if negotiated {
                Ignore("duplicate answer, negotiation already resolved")
            } else {
                ApplyAnswer
            }
        }
        SignalKind::IceCandidate => ApplyCandidate,
        SignalKind::EndCall => EndCall,
    }
}
