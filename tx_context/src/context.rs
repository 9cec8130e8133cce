//! The call context: everything about a transaction's surroundings that an
//! EVM needs in order to replay it, assembled from the ancillary fetches.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::Serialize;

use crate::wire::{BlockHeader, TxData, TxReceipt};

/// The ancillary data of one transaction, fetched as a unit: the
/// transaction itself, its receipt, the enclosing block header and the
/// chain id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TxBundle {
    /// The transaction.
    pub tx: TxData,
    /// Its receipt.
    pub receipt: TxReceipt,
    /// The block it was mined in.
    pub block: BlockHeader,
    /// The chain it was mined on.
    pub chain_id: u64,
}

/// Block-level environment visible to the replayed transaction, i.e. what
/// the `COINBASE`/`DIFFICULTY`/`GASLIMIT`/`NUMBER`/`TIMESTAMP`/`CHAINID`/
/// `BASEFEE` opcodes would answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockEnv {
    /// Beneficiary of the block reward.
    pub coinbase: Address,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: U256,
    /// Block number.
    pub number: U256,
    /// Block timestamp.
    pub timestamp: U256,
    /// Chain id.
    pub chain_id: U256,
    /// EIP-1559 base fee; zero when the block predates London.
    pub base_fee: U256,
}

/// What the transaction targets.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CallTarget {
    /// An ordinary message call.
    Call {
        /// Callee address.
        address: Address,
        /// Call data.
        data: Bytes,
    },
    /// A contract creation (`to` unset in the transaction).
    Create {
        /// Init code.
        init_code: Bytes,
    },
}

/// The full execution context of one mined transaction.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CallContext {
    /// Message call or contract creation.
    pub target: CallTarget,
    /// The address whose storage the outermost frame reads and writes.
    pub storage_address: Address,
    /// Receipt status, when the chain reports one.
    pub status: Option<bool>,
    /// Sender address.
    pub sender: Address,
    /// Transferred wei.
    pub value: U256,
    /// Effective gas price in wei.
    pub gas_price: U256,
    /// Block-level environment.
    pub block: BlockEnv,
    /// Hash of the enclosing block.
    pub block_hash: B256,
    /// Index of the transaction inside the enclosing block.
    pub tx_index: u64,
}

impl CallContext {
    /// Derives the execution context from a fetched [`TxBundle`].
    ///
    /// For contract creations the storage address comes from the receipt;
    /// a receipt whose `contractAddress` is absent or does not parse falls
    /// back to the zero address rather than failing the inspection.
    pub fn derive(bundle: &TxBundle) -> Self {
        let TxBundle {
            tx,
            receipt,
            block,
            chain_id,
        } = bundle;

        let (target, storage_address) = match tx.to {
            Some(to) => (
                CallTarget::Call {
                    address: to,
                    data: tx.input.clone(),
                },
                to,
            ),
            None => (
                CallTarget::Create {
                    init_code: tx.input.clone(),
                },
                receipt.created_contract().unwrap_or(Address::ZERO),
            ),
        };

        CallContext {
            target,
            storage_address,
            status: receipt.succeeded(),
            sender: tx.from,
            value: tx.value,
            gas_price: tx.gas_price,
            block: BlockEnv {
                coinbase: block.miner,
                difficulty: block.difficulty,
                gas_limit: block.gas_limit,
                number: block.number,
                timestamp: block.timestamp,
                chain_id: U256::from(*chain_id),
                base_fee: block.base_fee_per_gas.unwrap_or_default(),
            },
            block_hash: block.hash,
            tx_index: tx
                .transaction_index
                .map(|index| index.to::<u64>())
                .unwrap_or_default(),
        }
    }

    /// The init code, for contract creations.
    pub fn init_code(&self) -> Option<&Bytes> {
        match &self.target {
            CallTarget::Create { init_code } => Some(init_code),
            CallTarget::Call { .. } => None,
        }
    }
}
