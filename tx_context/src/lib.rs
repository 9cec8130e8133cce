//! Your debugger wants to replay a transaction that was mined last year.
//!
//! The node it talks to can hand over everything needed for that: the
//! instruction-level trace, the transaction itself, its receipt, the
//! enclosing block header, deployed bytecode and individual storage slots.
//! But it hands them over as loosely-shaped JSON whose details differ
//! between node implementations.
//!
//! This library defines the canonical in-memory shapes of all of those
//! payloads, the [`FetchKey`]/[`FetchValue`] identity scheme used by the
//! acquisition layer (`tx_fetcher`) to coalesce duplicate requests, and the
//! normalization pass that erases node-specific formatting from traces.
//! There is no I/O here.
//!
//! # Non-Goals
//! - Executing the trace - that is the stepping interpreter's job.
//! - Decoding ABI data or source mappings.

#![deny(rustdoc::broken_intra_doc_links)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]

mod context;
mod error;
mod key;
mod normalize;
mod wire;

pub use context::{BlockEnv, CallContext, CallTarget, TxBundle};
pub use error::{FetchError, FetchResult};
pub use key::{BlockRef, FetchKey, FetchValue};
pub use normalize::{normalize_trace, pad_word};
pub use wire::{BlockHeader, TraceFrame, TraceStep, TxData, TxReceipt};
