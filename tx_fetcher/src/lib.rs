//! Acquisition layer for inspecting mined Ethereum transactions.
//!
//! Reconstructing the execution context of a past transaction means many
//! independent, potentially slow JSON-RPC queries: the trace, the
//! transaction/receipt/block/chain-id bundle, deployed code for every
//! contract the trace touches, and storage slots discovered one at a time
//! while stepping. The [`coordinator`] issues at most one remote call per
//! [`tx_context::FetchKey`] no matter how many logical callers ask, and the
//! [`inspect`] orchestrator sequences the per-transaction workflow on top
//! of it.
//!
//! Everything here is transaction-scoped: build one [`inspect::Inspector`]
//! per inspected transaction and drop it when the interpreter is done.

pub mod adapter;
pub mod coordinator;
pub mod env;
pub mod inspect;
pub mod retry;
pub mod tracing;

#[cfg(test)]
pub(crate) mod testutil;
