use crate::store::{SignalStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use pairline_core::{CallId, Signal, SignalDraft, SignalId, UserId};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

type MailboxKey = (UserId, CallId);

/// In-process [`SignalStore`] backed by per-recipient mailboxes.
///
/// Each `(to, call_id)` pair owns one mailbox vector, so the polled filter
/// is a single map lookup. Signals stay in insertion order inside a
/// mailbox, which gives `read_pending` its oldest-first contract for free.
/// Orphaned signals (recipient stopped polling) just sit there; nothing
/// here assumes they ever get consumed.
pub struct MemorySignalStore {
    mailboxes: DashMap<MailboxKey, Vec<Signal>>,
    index: DashMap<SignalId, MailboxKey>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self {
            mailboxes: DashMap::new(),
            index: DashMap::new(),
        }
    }

    /// Total number of stored signals, consumed or not yet polled.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Default for MemorySignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn write(&self, draft: SignalDraft) -> Result<Signal, StoreError> {
        let signal = Signal {
            id: SignalId::new(),
            from: draft.from,
            to: draft.to,
            call_id: draft.call_id,
            kind: draft.kind,
            payload: draft.payload,
            created_at: Self::now_millis(),
        };

        let key = (signal.to.clone(), signal.call_id.clone());
        self.index.insert(signal.id.clone(), key.clone());
        self.mailboxes.entry(key).or_default().push(signal.clone());

        debug!(id = %signal.id, kind = %signal.kind, to = %signal.to, "signal stored");
        Ok(signal)
    }

    async fn read_pending(
        &self,
        to: &UserId,
        call_id: &CallId,
    ) -> Result<Vec<Signal>, StoreError> {
        let key = (to.clone(), call_id.clone());
        Ok(self
            .mailboxes
            .get(&key)
            .map(|mailbox| mailbox.clone())
            .unwrap_or_default())
    }

    async fn delete(&self, id: &SignalId) -> Result<(), StoreError> {
        let Some((_, key)) = self.index.remove(id) else {
            debug!(id = %id, "delete of unknown signal id ignored");
            return Ok(());
        };

        if let Some(mut mailbox) = self.mailboxes.get_mut(&key) {
            mailbox.retain(|s| s.id != *id);
        }
        Ok(())
    }
}
