//! Makes traces from different node implementations look the same.
//!
//! Besu emits stack and memory words as `0x`-prefixed hex of whatever width
//! the value happens to need (including odd digit counts); Geth and Ganache
//! emit unprefixed, fixed 64-digit words. Everything downstream assumes the
//! latter, so prefixed words are stripped and left-padded here. Nothing
//! else about the trace is touched.

use crate::wire::{TraceFrame, TraceStep};

/// Hex digits in one 32-byte EVM word.
const WORD_HEX_DIGITS: usize = 64;

/// Rewrites every stack and memory word of `frame` into canonical form.
///
/// Idempotent: a frame that is already canonical comes back unchanged.
pub fn normalize_trace(frame: TraceFrame) -> TraceFrame {
    TraceFrame {
        struct_logs: frame.struct_logs.into_iter().map(normalize_step).collect(),
        ..frame
    }
}

fn normalize_step(step: TraceStep) -> TraceStep {
    TraceStep {
        stack: step.stack.into_iter().map(pad_word).collect(),
        memory: step.memory.into_iter().map(pad_word).collect(),
        ..step
    }
}

/// Converts one word to canonical form: strip the `0x` prefix and left-pad
/// with zero nibbles to 64 hex digits. Unprefixed words are assumed
/// canonical already and pass through untouched.
pub fn pad_word(word: String) -> String {
    match word.strip_prefix("0x") {
        Some(digits) => format!("{digits:0>width$}", width = WORD_HEX_DIGITS),
        None => word,
    }
}
