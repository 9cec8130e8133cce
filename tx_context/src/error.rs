use std::sync::Arc;

use thiserror::Error;

use crate::key::FetchKey;

/// Stores the result of an acquisition. Returns a [`FetchError`] upon
/// failure.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure modes of the acquisition layer.
///
/// Clonable on purpose: one failed remote call resolves every waiter that
/// coalesced onto the same key, and each of them gets the same error.
#[derive(Clone, Debug, Error)]
pub enum FetchError {
    /// The remote call behind a key failed. Not retried at this layer;
    /// transport-level retry lives inside the data-source adapter.
    #[error("transport failure while fetching {key}: {cause:#}")]
    Transport {
        /// The key whose remote call failed.
        key: FetchKey,
        /// The underlying adapter error, shared verbatim by all waiters.
        cause: Arc<anyhow::Error>,
    },
    /// The remote node answered, but with data this layer cannot interpret.
    #[error("remote node returned {what} in an unsupported format: {detail}")]
    UnsupportedFormat {
        /// Which payload was malformed.
        what: &'static str,
        /// What was wrong with it.
        detail: String,
    },
    /// The first failure observed by a batch acquisition. Sibling requests
    /// already in flight still run to completion and populate the store.
    #[error("batch acquisition failed: {0}")]
    Batch(#[source] Box<FetchError>),
}

impl FetchError {
    /// Wraps an adapter error as the terminal outcome of `key`'s current
    /// attempt.
    pub fn transport(key: FetchKey, cause: anyhow::Error) -> Self {
        FetchError::Transport {
            key,
            cause: Arc::new(cause),
        }
    }

    /// The key this failure is about, where there is one.
    pub fn key(&self) -> Option<&FetchKey> {
        match self {
            FetchError::Transport { key, .. } => Some(key),
            FetchError::UnsupportedFormat { .. } => None,
            FetchError::Batch(inner) => inner.key(),
        }
    }
}
