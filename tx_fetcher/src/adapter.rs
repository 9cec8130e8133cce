//! The data-source adapter: what this layer needs from a remote node.
//!
//! [`DataSource`] is the capability seam the coordinator fetches through;
//! [`NodeAdapter`] implements it against any alloy provider. Transport
//! retry is layered underneath (see [`crate::retry`]) so callers above the
//! trait never see transient failures that a retry would have absorbed.

use std::collections::BTreeMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::Provider;
use alloy::transports::Transport;
use anyhow::{ensure, Context as _};
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};
use tx_context::{BlockHeader, BlockRef, TraceFrame, TxData, TxReceipt};

// The alloy provider keeps an unbounded reqwest connection pool underneath,
// so the number of parallel RPC requests has to be bounded on our side.
const MAX_PARALLEL_REQUESTS: usize = 64;

/// Capability set required from a remote node.
///
/// Every call may suspend and may fail with a transport-level error, which
/// the coordinator treats as the terminal outcome of that key's current
/// attempt.
pub trait DataSource {
    /// `debug_traceTransaction`.
    fn get_trace(&self, tx_hash: B256)
        -> impl Future<Output = anyhow::Result<TraceFrame>> + Send;

    /// `eth_getTransactionByHash`; an unknown hash is an error.
    fn get_transaction(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = anyhow::Result<TxData>> + Send;

    /// `eth_getTransactionReceipt`; an unknown hash is an error.
    fn get_receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = anyhow::Result<TxReceipt>> + Send;

    /// `eth_getBlockByNumber`, header only.
    fn get_block(
        &self,
        number: u64,
    ) -> impl Future<Output = anyhow::Result<BlockHeader>> + Send;

    /// `eth_chainId`.
    fn get_chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// `eth_getCode` at a block.
    fn get_deployed_code(
        &self,
        address: Address,
        block: BlockRef,
    ) -> impl Future<Output = anyhow::Result<Bytes>> + Send;

    /// One storage word as of `tx_index` inside `block_hash`. Fails when
    /// the node cannot attest the slot existed at that point.
    fn get_existing_storage(
        &self,
        address: Address,
        slot: U256,
        block_hash: B256,
        tx_index: u64,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send;
}

/// [`DataSource`] over an alloy provider.
pub struct NodeAdapter<ProviderT, TransportT> {
    provider: Arc<ProviderT>,
    semaphore: Arc<Semaphore>,
    _phantom: PhantomData<TransportT>,
}

impl<ProviderT, TransportT> NodeAdapter<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    /// Wraps `provider`, bounding its parallel request count.
    pub fn new(provider: ProviderT) -> Self {
        Self {
            provider: provider.into(),
            semaphore: Arc::new(Semaphore::new(MAX_PARALLEL_REQUESTS)),
            _phantom: PhantomData,
        }
    }

    async fn permit(&self) -> anyhow::Result<SemaphorePermit<'_>> {
        Ok(self.semaphore.acquire().await?)
    }
}

/// Knobs of the `debug_traceTransaction` call.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceOptions {
    enable_memory: bool,
    disable_storage: bool,
    enable_return_data: bool,
}

// Memory is needed for stepping; per-slot storage is fetched on demand
// through `get_existing_storage`, so tracing it would only bloat the
// response.
fn trace_options() -> TraceOptions {
    TraceOptions {
        enable_memory: true,
        disable_storage: true,
        enable_return_data: false,
    }
}

/// A `debug_storageRangeAt` response.
#[derive(Debug, Deserialize)]
struct StorageRange {
    storage: BTreeMap<B256, StorageEntry>,
}

#[derive(Debug, Deserialize)]
struct StorageEntry {
    key: Option<B256>,
    value: B256,
}

impl<ProviderT, TransportT> DataSource for NodeAdapter<ProviderT, TransportT>
where
    ProviderT: Provider<TransportT>,
    TransportT: Transport + Clone,
{
    async fn get_trace(&self, tx_hash: B256) -> anyhow::Result<TraceFrame> {
        let _permit = self.permit().await?;
        let raw: serde_json::Value = self
            .provider
            .raw_request("debug_traceTransaction".into(), (tx_hash, trace_options()))
            .await?;
        serde_path_to_error::deserialize(raw)
            .with_context(|| format!("could not decode the trace of {tx_hash}"))
    }

    async fn get_transaction(&self, tx_hash: B256) -> anyhow::Result<TxData> {
        let _permit = self.permit().await?;
        let tx: Option<TxData> = self
            .provider
            .raw_request("eth_getTransactionByHash".into(), (tx_hash,))
            .await?;
        tx.with_context(|| format!("transaction {tx_hash} not found"))
    }

    async fn get_receipt(&self, tx_hash: B256) -> anyhow::Result<TxReceipt> {
        let _permit = self.permit().await?;
        let receipt: Option<TxReceipt> = self
            .provider
            .raw_request("eth_getTransactionReceipt".into(), (tx_hash,))
            .await?;
        receipt.with_context(|| format!("no receipt for transaction {tx_hash}"))
    }

    async fn get_block(&self, number: u64) -> anyhow::Result<BlockHeader> {
        let _permit = self.permit().await?;
        let block: Option<BlockHeader> = self
            .provider
            .raw_request(
                "eth_getBlockByNumber".into(),
                (format!("{number:#x}"), false),
            )
            .await?;
        block.with_context(|| format!("block {number} does not exist"))
    }

    async fn get_chain_id(&self) -> anyhow::Result<u64> {
        let _permit = self.permit().await?;
        Ok(self.provider.get_chain_id().await?)
    }

    async fn get_deployed_code(
        &self,
        address: Address,
        block: BlockRef,
    ) -> anyhow::Result<Bytes> {
        let _permit = self.permit().await?;
        let block_param = match block {
            BlockRef::Number(number) => format!("{number:#x}"),
            BlockRef::Latest => "latest".to_owned(),
        };
        Ok(self
            .provider
            .raw_request("eth_getCode".into(), (address, block_param))
            .await?)
    }

    async fn get_existing_storage(
        &self,
        address: Address,
        slot: U256,
        block_hash: B256,
        tx_index: u64,
    ) -> anyhow::Result<B256> {
        let _permit = self.permit().await?;
        let slot = B256::from(slot);
        let range: StorageRange = self
            .provider
            .raw_request(
                "debug_storageRangeAt".into(),
                (block_hash, tx_index, address, slot, 1u64),
            )
            .await?;
        let entry = range
            .storage
            .into_values()
            .next()
            .with_context(|| format!("storage slot {slot} of {address} has never been written"))?;
        // The node answers with the first *existing* slot at or after the
        // requested one; anything else means the requested slot holds no
        // attested value at this point in history.
        ensure!(
            entry.key == Some(slot),
            "storage slot {slot} of {address} is unavailable at block {block_hash}"
        );
        Ok(entry.value)
    }
}
