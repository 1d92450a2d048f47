mod memory;

pub use memory::MemorySignalStore;

use async_trait::async_trait;
use pairline_core::{CallId, Signal, SignalDraft, SignalId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or answered abnormally.
    /// Callers retry on the next poll tick; this is never fatal to a call.
    #[error("signal store unavailable: {0}")]
    Unavailable(String),

    #[error("signal store rejected the request: {0}")]
    Rejected(String),
}

/// Durable mailbox for call signals, keyed by `(recipient, call id)`.
///
/// Append-only write, filtered read, explicit delete-after-consume. The
/// store never reorders by kind and never interprets payloads; ordering
/// correctness across offer/answer/candidates is the session's job.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Persist an outgoing signal. The store assigns `id` and `created_at`;
    /// the write is durable before this returns.
    async fn write(&self, draft: SignalDraft) -> Result<Signal, StoreError>;

    /// All signals addressed to `to` for `call_id` that have not been
    /// deleted yet, **oldest-first**.
    ///
    /// Polled once per interval for every active call, so implementations
    /// must make this filter cheap.
    async fn read_pending(&self, to: &UserId, call_id: &CallId)
    -> Result<Vec<Signal>, StoreError>;

    /// Remove a consumed signal. Deleting an id that is already gone is a
    /// no-op, not an error; double-processing races depend on this.
    async fn delete(&self, id: &SignalId) -> Result<(), StoreError>;
}
