use std::fmt;
use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256, U256};
use enum_as_inner::EnumAsInner;

use crate::context::TxBundle;
use crate::wire::TraceFrame;

/// A historical block to read state at: either a concrete block number or
/// the node's implicit "latest" sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockRef {
    /// A concrete historical block number.
    Number(u64),
    /// Whatever block the node currently considers the head of the chain.
    #[default]
    Latest,
}

impl From<u64> for BlockRef {
    fn from(number: u64) -> Self {
        BlockRef::Number(number)
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockRef::Number(number) => write!(f, "{number}"),
            BlockRef::Latest => f.write_str("latest"),
        }
    }
}

/// Identity of one acquirable resource.
///
/// The acquisition layer keys its in-flight table on this, so two
/// concurrent requests for the same key share a single remote call.
/// Equality is structural; storage slots compare as numbers because the
/// slot is a [`U256`], never a hex string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FetchKey {
    /// The instruction-level trace of a transaction.
    Trace(B256),
    /// The transaction itself plus its receipt, enclosing block header and
    /// the chain id, fetched as one unit.
    TxBundle(B256),
    /// The code deployed at an address, as of a block.
    Code(Address, BlockRef),
    /// One storage word of a contract, as of a transaction inside a block.
    Storage {
        /// The contract whose storage is read.
        address: Address,
        /// The slot number.
        slot: U256,
        /// Hash of the block the reading transaction belongs to.
        block_hash: B256,
        /// Index of the reading transaction inside that block.
        tx_index: u64,
    },
}

impl fmt::Display for FetchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKey::Trace(tx_hash) => write!(f, "trace of {tx_hash}"),
            FetchKey::TxBundle(tx_hash) => write!(f, "transaction data of {tx_hash}"),
            FetchKey::Code(address, block) => {
                write!(f, "code at {address} (block {block})")
            }
            FetchKey::Storage {
                address,
                slot,
                block_hash,
                tx_index,
            } => write!(
                f,
                "storage slot {slot} of {address} (block {block_hash}, tx #{tx_index})"
            ),
        }
    }
}

/// A completed fetch, addressable by the [`FetchKey`] that produced it.
///
/// Cloning is cheap; the payloads sit behind [`Arc`]s or are ref-counted
/// byte buffers.
#[derive(Clone, Debug, EnumAsInner)]
pub enum FetchValue {
    /// Payload of [`FetchKey::Trace`].
    Trace(Arc<TraceFrame>),
    /// Payload of [`FetchKey::TxBundle`].
    TxBundle(Arc<TxBundle>),
    /// Payload of [`FetchKey::Code`].
    Code(Bytes),
    /// Payload of [`FetchKey::Storage`].
    Storage(B256),
}
