//! Ratcheted per-position exposure limits.
//!
//! A supply position carries a withdrawal floor (the balance that must stay
//! behind), a borrow position a debt ceiling. Both are the same ratchet with
//! the direction flipped: a move that restricts the position applies
//! instantly, a move that relaxes it is released linearly over
//! `expand_duration_seconds`. Depositing and withdrawing in a loop therefore
//! never frees more than one expansion step per window.

use crate::error::LiquidityError;
use crate::math::common::{mul_div_floor, TryAdd, TrySub, FOUR_DECIMALS};
use crate::state::last_update::LastUpdate;
use serde::{Deserialize, Serialize};

/// Which way a limit restricts the position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitDirection {
    /// Minimum balance to keep, raising it restricts
    Floor,
    /// Maximum balance allowed, lowering it restricts
    Ceiling,
}

/// Admin configured limit parameters of a position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Share of the balance released per expansion, in basis points
    pub expand_percent_bps: u16,
    /// Seconds for a relaxing move to complete
    pub expand_duration_seconds: u64,
    /// Balances below this are exempt: floor 0, or this ceiling
    pub base_limit: u128,
    /// Absolute cap of a debt ceiling, unused for floors
    pub max_ceiling: u128,
}

impl LimitConfig {
    pub fn validate(&self, direction: LimitDirection) -> Result<(), LiquidityError> {
        if u128::from(self.expand_percent_bps) > FOUR_DECIMALS {
            return Err(LiquidityError::InvalidConfig);
        }
        if direction == LimitDirection::Ceiling && self.max_ceiling < self.base_limit {
            return Err(LiquidityError::InvalidConfig);
        }
        Ok(())
    }
}

/// Ratchet state of one position limit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicLimit {
    pub direction: LimitDirection,
    pub config: LimitConfig,
    /// Limit as of `last_update`, in absolute token amounts
    pub stored_limit: u128,
    pub last_update: LastUpdate,
}

impl DynamicLimit {
    /// Limit of an empty position
    pub fn new(direction: LimitDirection, config: LimitConfig, now: u64) -> Result<Self, LiquidityError> {
        config.validate(direction)?;
        let mut limit = Self {
            direction,
            config,
            stored_limit: 0,
            last_update: LastUpdate::new(now),
        };
        limit.stored_limit = limit.target(0)?;
        Ok(limit)
    }

    /// Limit the ratchet converges to for `balance`.
    pub fn target(&self, balance: u128) -> Result<u128, LiquidityError> {
        let expand = u128::from(self.config.expand_percent_bps);
        match self.direction {
            LimitDirection::Floor => {
                if balance < self.config.base_limit {
                    return Ok(0);
                }
                mul_div_floor(balance, FOUR_DECIMALS.try_sub(expand)?, FOUR_DECIMALS)
            }
            LimitDirection::Ceiling => {
                if balance < self.config.base_limit {
                    return Ok(self.config.base_limit);
                }
                let expanded = mul_div_floor(balance, FOUR_DECIMALS.try_add(expand)?, FOUR_DECIMALS)?;
                Ok(expanded.min(self.config.max_ceiling))
            }
        }
    }

    fn restricts(&self, target: u128) -> bool {
        match self.direction {
            LimitDirection::Floor => target >= self.stored_limit,
            LimitDirection::Ceiling => target <= self.stored_limit,
        }
    }

    /// Limit in force at `now` for `balance`, without persisting it.
    pub fn effective(&self, balance: u128, now: u64) -> Result<u128, LiquidityError> {
        let target = self.target(balance)?;
        if self.restricts(target) {
            return Ok(target);
        }

        let elapsed = u128::from(self.last_update.seconds_elapsed(now)?);
        let duration = u128::from(self.config.expand_duration_seconds);
        let gap = self.stored_limit.abs_diff(target);
        let released = if duration == 0 || elapsed >= duration {
            gap
        } else {
            mul_div_floor(gap, elapsed, duration)?
        };

        match self.direction {
            LimitDirection::Floor => self.stored_limit.try_sub(released),
            LimitDirection::Ceiling => self.stored_limit.try_add(released),
        }
    }

    /// Persists the effective limit for `balance` at `now`.
    pub fn advance(&mut self, balance: u128, now: u64) -> Result<u128, LiquidityError> {
        let effective = self.effective(balance, now)?;
        log::trace!(
            "{:?} limit {} -> {} (balance {}, target {})",
            self.direction,
            self.stored_limit,
            effective,
            balance,
            self.target(balance)?
        );
        self.stored_limit = effective;
        self.last_update.update(now);
        Ok(effective)
    }

    /// Amount the position can move in its relaxing direction right now:
    /// withdrawable for a floor, borrowable for a ceiling.
    pub fn headroom(&self, balance: u128, now: u64) -> Result<u128, LiquidityError> {
        let effective = self.effective(balance, now)?;
        Ok(match self.direction {
            LimitDirection::Floor => balance.saturating_sub(effective),
            LimitDirection::Ceiling => effective.saturating_sub(balance),
        })
    }

    /// Fails when moving `amount` from `balance` would cross the limit in
    /// force before the move.
    pub fn check(&self, balance: u128, amount: u128, now: u64) -> Result<(), LiquidityError> {
        if amount > self.headroom(balance, now)? {
            return Err(match self.direction {
                LimitDirection::Floor => LiquidityError::WithdrawalLimitReached,
                LimitDirection::Ceiling => LiquidityError::BorrowLimitReached,
            });
        }
        Ok(())
    }

    /// Swaps in a new configuration. Progress under the old configuration is
    /// banked first, then the ratchet runs again against the new target.
    pub fn reconfigure(&mut self, config: LimitConfig, balance: u128, now: u64) -> Result<(), LiquidityError> {
        config.validate(self.direction)?;
        self.advance(balance, now)?;
        self.config = config;
        self.advance(balance, now)?;
        Ok(())
    }
}
