//! Math for the ledger: checked arithmetic, the compact codec and rate curves.

pub mod common;
pub mod compact;
pub mod rate_curve;

pub use common::*;
pub use compact::{PackedLayout, DEFAULT_LAYOUT, SMALL_LAYOUT};
pub use rate_curve::{RateCurve, RateDataV1, RateDataV2, MAX_RATE};
