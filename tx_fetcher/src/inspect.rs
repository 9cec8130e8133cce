//! The per-transaction acquisition workflow.
//!
//! [`Inspector::inspect_transaction`] drives the trace-then-context
//! sequence; [`Inspector::obtain_binaries`] and
//! [`Inspector::obtain_storage`] serve the stepping interpreter as it
//! discovers contract addresses and storage slots. Any sub-step failure is
//! terminal for the whole inspection: the error is surfaced as-is and no
//! further fetches are initiated, though fetches already in flight run to
//! completion and stay cached.

use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;
use tracing::debug;
use tx_context::{
    normalize_trace, BlockRef, CallContext, FetchKey, FetchResult, FetchValue, TraceFrame,
};

use crate::adapter::DataSource;
use crate::coordinator::Coordinator;

/// Everything the stepping interpreter needs to replay one transaction.
#[derive(Clone, Debug, Serialize)]
pub struct InspectedTransaction {
    /// The normalized instruction-level trace.
    pub trace: TraceFrame,
    /// The call context derived from transaction, receipt, block header
    /// and chain id.
    pub context: CallContext,
}

/// Per-transaction acquisition workflow over a [`Coordinator`].
pub struct Inspector<A> {
    coordinator: Coordinator<A>,
}

impl<A> Inspector<A>
where
    A: DataSource + Send + Sync + 'static,
{
    /// A fresh inspector owning a fresh coordinator. Scope one of these to
    /// each inspected transaction.
    pub fn new(adapter: A) -> Self {
        Self {
            coordinator: Coordinator::new(adapter),
        }
    }

    /// Reconstructs the execution context of a mined transaction: its
    /// normalized trace plus the derived call context.
    ///
    /// The trace comes first; if it cannot be fetched, the error is
    /// returned without issuing any of the ancillary queries.
    pub async fn inspect_transaction(
        &self,
        tx_hash: B256,
    ) -> FetchResult<InspectedTransaction> {
        debug!(%tx_hash, "inspecting transaction");
        let trace = match self.coordinator.acquire(FetchKey::Trace(tx_hash)).await? {
            FetchValue::Trace(frame) => normalize_trace((*frame).clone()),
            other => unreachable!("trace key resolved to {other:?}"),
        };
        debug!(steps = trace.struct_logs.len(), "trace received");

        let bundle = match self.coordinator.acquire(FetchKey::TxBundle(tx_hash)).await? {
            FetchValue::TxBundle(bundle) => bundle,
            other => unreachable!("transaction-data key resolved to {other:?}"),
        };
        let context = CallContext::derive(&bundle);
        debug!(storage_address = %context.storage_address, "context derived");

        Ok(InspectedTransaction { trace, context })
    }

    /// Fetches the deployed code of every address in one shot, optionally
    /// as of a historical block. Fails on the first code fetch that fails.
    pub async fn obtain_binaries(
        &self,
        addresses: &[Address],
        block: BlockRef,
    ) -> FetchResult<HashMap<Address, Bytes>> {
        debug!(count = addresses.len(), %block, "requesting binaries");
        let keys = addresses
            .iter()
            .map(|address| FetchKey::Code(*address, block));
        let values = self.coordinator.acquire_all(keys).await?;
        Ok(values
            .into_iter()
            .filter_map(|(key, value)| match (key, value) {
                (FetchKey::Code(address, _), FetchValue::Code(code)) => Some((address, code)),
                _ => None,
            })
            .collect())
    }

    /// Reads one storage word as of `tx_index` inside `block_hash`.
    ///
    /// Slots are acquired one at a time and each is independently
    /// retryable by the caller, but concurrent requests for the same slot
    /// still share one remote call.
    pub async fn obtain_storage(
        &self,
        address: Address,
        slot: U256,
        block_hash: B256,
        tx_index: u64,
    ) -> FetchResult<B256> {
        let key = FetchKey::Storage {
            address,
            slot,
            block_hash,
            tx_index,
        };
        match self.coordinator.acquire(key).await? {
            FetchValue::Storage(word) => Ok(word),
            other => unreachable!("storage key resolved to {other:?}"),
        }
    }

    /// The underlying coordinator, for consumers that want to peek at the
    /// transaction-scoped result store.
    pub fn coordinator(&self) -> &Coordinator<A> {
        &self.coordinator
    }
}
