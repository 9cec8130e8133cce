//! Shapes of the JSON-RPC payloads as the node emits them.
//!
//! These types are deliberately stringly-typed exactly where node
//! implementations disagree: trace stack/memory words keep their raw hex
//! spelling so the normalizer can observe it, and a receipt's
//! `contractAddress` stays a raw string because some nodes have been seen
//! emitting values that do not parse as an address at all.

use alloy::primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// A `debug_traceTransaction` response.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceFrame {
    /// Total gas consumed by the transaction.
    pub gas: u64,
    /// Whether execution ended in a revert or error.
    pub failed: bool,
    /// Return data of the outermost call, unprefixed hex.
    pub return_value: String,
    /// One entry per executed instruction, in execution order.
    pub struct_logs: Vec<TraceStep>,
}

/// One executed instruction inside a [`TraceFrame`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceStep {
    /// Program counter.
    pub pc: u64,
    /// Opcode mnemonic, e.g. `SSTORE`.
    pub op: String,
    /// Gas remaining before this instruction.
    pub gas: u64,
    /// Gas consumed by this instruction.
    pub gas_cost: u64,
    /// Call depth, 1 for the outermost frame on Geth-like nodes.
    pub depth: u64,
    /// Stack words, bottom first. Raw hex; width and `0x` prefix vary by
    /// node until [`crate::normalize_trace`] has run.
    pub stack: Vec<String>,
    /// Memory words. Same caveat as `stack`.
    pub memory: Vec<String>,
    /// Error raised by this instruction, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An `eth_getTransactionByHash` response.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxData {
    /// Transaction hash.
    pub hash: B256,
    /// Sender address.
    pub from: Address,
    /// Callee address; `None` for contract creations.
    #[serde(default)]
    pub to: Option<Address>,
    /// Call data, or init code for contract creations.
    pub input: Bytes,
    /// Transferred wei.
    #[serde(default)]
    pub value: U256,
    /// Effective gas price in wei.
    #[serde(default)]
    pub gas_price: U256,
    /// Number of the enclosing block; `None` while pending.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// Position inside the enclosing block; `None` while pending.
    #[serde(default)]
    pub transaction_index: Option<U64>,
}

/// An `eth_getTransactionReceipt` response, reduced to the fields the
/// inspection context needs.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TxReceipt {
    /// Post-Byzantium status flag; `None` on chains that predate it.
    pub status: Option<U64>,
    /// Address of the created contract, raw. Validate through
    /// [`TxReceipt::created_contract`] before trusting it.
    pub contract_address: Option<String>,
}

impl TxReceipt {
    /// Whether the transaction succeeded, when the node reports it.
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|status| status == U64::from(1))
    }

    /// The created contract's address, if the receipt carries one that
    /// actually parses as an address.
    pub fn created_contract(&self) -> Option<Address> {
        self.contract_address
            .as_deref()
            .and_then(|raw| raw.parse().ok())
    }
}

/// An `eth_getBlockByNumber` response, header fields only.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Block number.
    pub number: U256,
    /// Block hash.
    pub hash: B256,
    /// Beneficiary of the block reward.
    pub miner: Address,
    /// Difficulty; zero after the merge.
    #[serde(default)]
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: U256,
    /// Timestamp in seconds since the epoch.
    pub timestamp: U256,
    /// EIP-1559 base fee; `None` on blocks that predate London.
    #[serde(default)]
    pub base_fee_per_gas: Option<U256>,
}
