#![allow(clippy::arithmetic_side_effects)]
#![cfg_attr(not(test), no_std)]

//! Accounting core of a pooled lending ledger for the casper blockchain.
//!
//! Tracks supplied and borrowed balances per token, accrues interest through
//! per-side exchange prices driven by a utilization based rate curve, and
//! bounds every position with a time gated withdrawal floor or debt ceiling.

extern crate alloc;

pub mod error;
pub mod math;
pub mod processor;
pub mod resolver;
pub mod state;

pub use error::{ErrorKind, LiquidityError};
pub use processor::{accrue_and_apply, Action, LiquidityLayer, OperateOutcome, ParticipantId, TokenId, MAX_AMOUNT};
