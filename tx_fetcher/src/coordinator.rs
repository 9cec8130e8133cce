//! The request coordinator: per-key single flight over the data source.
//!
//! Any number of logical callers may ask for the same [`FetchKey`] at the
//! same time; exactly one remote call goes out, and every caller gets the
//! same resolved value or the same failure. Completed values land in a
//! transaction-scoped store, so a later `acquire` of a finished key
//! answers immediately without touching the node again. Failed keys are
//! forgotten, so a later `acquire` re-issues the query.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt as _};
use futures::try_join;
use tokio::sync::{broadcast, Mutex};
use tracing::debug;
use tx_context::{FetchError, FetchKey, FetchResult, FetchValue, TxBundle};

use crate::adapter::DataSource;

/// The two tables of shared state: completed results and in-flight keys.
/// All mutation happens while holding the one mutex around this; the lock
/// is never held across a remote call.
#[derive(Default)]
struct Tables {
    store: HashMap<FetchKey, FetchValue>,
    pending: HashMap<FetchKey, broadcast::Sender<FetchResult<FetchValue>>>,
}

/// Deduplicating fan-out scheduler for one transaction inspection.
pub struct Coordinator<A> {
    adapter: Arc<A>,
    tables: Arc<Mutex<Tables>>,
}

impl<A> Coordinator<A>
where
    A: DataSource + Send + Sync + 'static,
{
    /// A fresh coordinator with empty tables.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter: Arc::new(adapter),
            tables: Arc::new(Mutex::new(Tables::default())),
        }
    }

    /// Resolves `key`, issuing at most one remote call no matter how many
    /// concurrent callers ask for it.
    ///
    /// Safe to call concurrently with identical or distinct keys. A key
    /// that already completed successfully answers from the store; a key
    /// currently in flight registers this caller as an additional waiter.
    pub async fn acquire(&self, key: FetchKey) -> FetchResult<FetchValue> {
        let mut waiter = {
            let mut tables = self.tables.lock().await;
            if let Some(done) = tables.store.get(&key) {
                return Ok(done.clone());
            }
            match tables.pending.entry(key.clone()) {
                Entry::Occupied(slot) => {
                    debug!(%key, "coalescing onto in-flight request");
                    slot.get().subscribe()
                }
                Entry::Vacant(vacant) => {
                    let (slot, waiter) = broadcast::channel(1);
                    vacant.insert(slot);
                    self.spawn_fetch(key.clone());
                    waiter
                }
            }
        };
        match waiter.recv().await {
            Ok(outcome) => outcome,
            // The fetch task resolves every waiter before dropping its
            // sender, so this is only reachable if the task died.
            Err(_) => Err(FetchError::transport(
                key,
                anyhow::anyhow!("acquisition task terminated abnormally"),
            )),
        }
    }

    /// Resolves every distinct key in `keys` concurrently.
    ///
    /// Fails as soon as any one key fails, wrapping that first failure.
    /// Sibling requests already issued are not cancelled; they run to
    /// completion and populate the store for later reuse, but this call
    /// does not wait for them once a failure is observed.
    pub async fn acquire_all(
        &self,
        keys: impl IntoIterator<Item = FetchKey>,
    ) -> FetchResult<HashMap<FetchKey, FetchValue>> {
        let keys: HashSet<FetchKey> = keys.into_iter().collect();
        let mut in_flight = keys
            .into_iter()
            .map(|key| async move {
                let value = self.acquire(key.clone()).await?;
                Ok::<_, FetchError>((key, value))
            })
            .collect::<FuturesUnordered<_>>();

        let mut values = HashMap::new();
        while let Some(outcome) = in_flight.next().await {
            match outcome {
                Ok((key, value)) => {
                    values.insert(key, value);
                }
                Err(first_failure) => return Err(FetchError::Batch(Box::new(first_failure))),
            }
        }
        Ok(values)
    }

    /// The completed result for `key`, when one is already in the store.
    pub async fn cached(&self, key: &FetchKey) -> Option<FetchValue> {
        self.tables.lock().await.store.get(key).cloned()
    }

    fn spawn_fetch(&self, key: FetchKey) {
        debug!(%key, "issuing remote fetch");
        let adapter = self.adapter.clone();
        let tables = self.tables.clone();
        tokio::spawn(async move {
            let outcome = fetch_value(&*adapter, &key).await;
            let mut tables = tables.lock().await;
            let Some(slot) = tables.pending.remove(&key) else {
                return;
            };
            if let Ok(value) = &outcome {
                tables.store.insert(key.clone(), value.clone());
            }
            // Waiters that gave up dropped their receivers; their absence
            // is not an error.
            let _ = slot.send(outcome);
        });
    }
}

/// One remote call, dispatched on the key's resource kind.
async fn fetch_value<A: DataSource>(adapter: &A, key: &FetchKey) -> FetchResult<FetchValue> {
    match key {
        FetchKey::Trace(tx_hash) => {
            let frame = adapter
                .get_trace(*tx_hash)
                .await
                .map_err(|cause| FetchError::transport(key.clone(), cause))?;
            Ok(FetchValue::Trace(Arc::new(frame)))
        }
        FetchKey::TxBundle(tx_hash) => {
            let (tx, receipt, chain_id) = try_join!(
                adapter.get_transaction(*tx_hash),
                adapter.get_receipt(*tx_hash),
                adapter.get_chain_id(),
            )
            .map_err(|cause| FetchError::transport(key.clone(), cause))?;
            let number = tx.block_number.ok_or_else(|| FetchError::UnsupportedFormat {
                what: "transaction",
                detail: format!("{tx_hash} carries no block number; is it still pending?"),
            })?;
            let block = adapter
                .get_block(number.to::<u64>())
                .await
                .map_err(|cause| FetchError::transport(key.clone(), cause))?;
            Ok(FetchValue::TxBundle(Arc::new(TxBundle {
                tx,
                receipt,
                block,
                chain_id,
            })))
        }
        FetchKey::Code(address, block) => {
            let code = adapter
                .get_deployed_code(*address, *block)
                .await
                .map_err(|cause| FetchError::transport(key.clone(), cause))?;
            Ok(FetchValue::Code(code))
        }
        FetchKey::Storage {
            address,
            slot,
            block_hash,
            tx_index,
        } => {
            let word = adapter
                .get_existing_storage(*address, *slot, *block_hash, *tx_index)
                .await
                .map_err(|cause| FetchError::transport(key.clone(), cause))?;
            Ok(FetchValue::Storage(word))
        }
    }
}
