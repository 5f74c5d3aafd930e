use crate::error::LiquidityError;
use serde::{Deserialize, Serialize};

/// Timestamp of the last persisted update of a ledger record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastUpdate {
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

impl LastUpdate {
    /// Create new last update
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }

    /// Return seconds elapsed since the last update. The host clock must be
    /// non-decreasing, so an earlier `now` is rejected.
    pub fn seconds_elapsed(&self, now: u64) -> Result<u64, LiquidityError> {
        now.checked_sub(self.timestamp)
            .ok_or(LiquidityError::InvalidTimestamp)
    }

    /// Set last update timestamp
    pub fn update(&mut self, now: u64) {
        self.timestamp = now;
    }
}
