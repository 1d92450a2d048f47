use crate::media::MediaError;
use pairline_relay::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session has no live transport for the requested operation,
    /// e.g. a signal arrived before `begin` finished or after teardown.
    #[error("no active transport for this session")]
    NoTransport,
}
