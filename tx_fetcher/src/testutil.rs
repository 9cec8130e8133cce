//! A scripted stand-in for a remote node.
//!
//! Each capability answers from a programmed response table, counts its
//! calls, and fails with a deterministic message when nothing is scripted.
//! Delays are opt-in so tests can hold a fetch in flight while more
//! waiters pile onto its key.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use anyhow::anyhow;
use tx_context::{BlockHeader, BlockRef, TraceFrame, TxData, TxReceipt};

use crate::adapter::DataSource;

/// Per-capability call counters.
#[derive(Debug, Default)]
pub struct Calls {
    pub trace: AtomicUsize,
    pub transaction: AtomicUsize,
    pub receipt: AtomicUsize,
    pub block: AtomicUsize,
    pub chain_id: AtomicUsize,
    pub code: AtomicUsize,
    pub storage: AtomicUsize,
}

impl Calls {
    /// Total calls of the four capabilities behind the tx-bundle fetch.
    pub fn ancillary(&self) -> usize {
        self.transaction.load(Ordering::SeqCst)
            + self.receipt.load(Ordering::SeqCst)
            + self.block.load(Ordering::SeqCst)
            + self.chain_id.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct ScriptedSource {
    calls: Arc<Calls>,
    delay: Duration,
    trace: Option<TraceFrame>,
    transaction: Option<TxData>,
    receipt: Option<TxReceipt>,
    block: Option<BlockHeader>,
    chain_id: Option<u64>,
    code: HashMap<Address, Bytes>,
    code_delays: HashMap<Address, Duration>,
    storage: HashMap<(Address, U256), B256>,
}

impl ScriptedSource {
    pub fn calls(&self) -> Arc<Calls> {
        self.calls.clone()
    }

    /// Delay applied before every response, scripted or failing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_trace(mut self, frame: TraceFrame) -> Self {
        self.trace = Some(frame);
        self
    }

    pub fn with_transaction(mut self, tx: TxData) -> Self {
        self.transaction = Some(tx);
        self
    }

    pub fn with_receipt(mut self, receipt: TxReceipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    pub fn with_block(mut self, block: BlockHeader) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn with_code(mut self, address: Address, code: Bytes) -> Self {
        self.code.insert(address, code);
        self
    }

    /// Extra delay for one address's code fetch, on top of the global one.
    pub fn with_code_delay(mut self, address: Address, delay: Duration) -> Self {
        self.code_delays.insert(address, delay);
        self
    }

    pub fn with_storage(mut self, address: Address, slot: U256, word: B256) -> Self {
        self.storage.insert((address, slot), word);
        self
    }

    fn respond<T: Send + 'static>(
        &self,
        counter: &AtomicUsize,
        response: Option<T>,
        missing: String,
    ) -> impl Future<Output = anyhow::Result<T>> + Send {
        counter.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response.ok_or_else(|| anyhow!(missing))
        }
    }
}

impl DataSource for ScriptedSource {
    fn get_trace(&self, tx_hash: B256) -> impl Future<Output = anyhow::Result<TraceFrame>> + Send {
        self.respond(
            &self.calls.trace,
            self.trace.clone(),
            format!("no trace scripted for {tx_hash}"),
        )
    }

    fn get_transaction(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = anyhow::Result<TxData>> + Send {
        self.respond(
            &self.calls.transaction,
            self.transaction.clone(),
            format!("no transaction scripted for {tx_hash}"),
        )
    }

    fn get_receipt(
        &self,
        tx_hash: B256,
    ) -> impl Future<Output = anyhow::Result<TxReceipt>> + Send {
        self.respond(
            &self.calls.receipt,
            self.receipt.clone(),
            format!("no receipt scripted for {tx_hash}"),
        )
    }

    fn get_block(&self, number: u64) -> impl Future<Output = anyhow::Result<BlockHeader>> + Send {
        self.respond(
            &self.calls.block,
            self.block.clone(),
            format!("no block scripted for number {number}"),
        )
    }

    fn get_chain_id(&self) -> impl Future<Output = anyhow::Result<u64>> + Send {
        self.respond(
            &self.calls.chain_id,
            self.chain_id,
            "no chain id scripted".to_owned(),
        )
    }

    fn get_deployed_code(
        &self,
        address: Address,
        _block: BlockRef,
    ) -> impl Future<Output = anyhow::Result<Bytes>> + Send {
        self.calls.code.fetch_add(1, Ordering::SeqCst);
        let response = self.code.get(&address).cloned();
        let delay = self.delay + self.code_delays.get(&address).copied().unwrap_or_default();
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response.ok_or_else(|| anyhow!("no code scripted for {address}"))
        }
    }

    fn get_existing_storage(
        &self,
        address: Address,
        slot: U256,
        _block_hash: B256,
        _tx_index: u64,
    ) -> impl Future<Output = anyhow::Result<B256>> + Send {
        self.respond(
            &self.calls.storage,
            self.storage.get(&(address, slot)).copied(),
            format!("no storage scripted for slot {slot} of {address}"),
        )
    }
}
