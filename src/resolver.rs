//! Read-only views of the ledger projected to a timestamp.
//!
//! Nothing here persists: prices and limits are computed as they would be if
//! an operation ran at `now`.

use serde::{Deserialize, Serialize};

use crate::error::LiquidityError;
use crate::math::common::TryAdd;
use crate::math::rate_curve::RateCurve;
use crate::processor::{borrowable, withdrawable};
use crate::state::{InterestMode, ParticipantPosition, Side, TokenLedgerState};

/// Token wide view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallTokenData {
    pub supply_exchange_price: u128,
    pub borrow_exchange_price: u128,
    pub total_supply: u128,
    pub total_borrow: u128,
    pub supply_raw_with_interest: u128,
    pub supply_interest_free: u128,
    pub borrow_raw_with_interest: u128,
    pub borrow_interest_free: u128,
    pub available_liquidity: u128,
    pub accrued_revenue: u128,
    /// Basis points
    pub utilization: u128,
    pub borrow_rate: u16,
    pub supply_rate: u128,
    pub revenue_fee_bps: u16,
    pub max_utilization_bps: u16,
    pub last_update_timestamp: u64,
    pub rate_curve: RateCurve,
}

/// Supply position view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSupplyData {
    pub mode: InterestMode,
    /// Raw units or plain amount, by mode
    pub raw_balance: u128,
    pub supply: u128,
    pub withdrawal_limit: u128,
    pub withdrawable: u128,
    pub last_limit_update: u64,
    pub expand_percent_bps: u16,
    pub expand_duration_seconds: u64,
    pub base_withdrawal_limit: u128,
}

/// Borrow position view
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBorrowData {
    pub mode: InterestMode,
    /// Raw units or plain amount, by mode
    pub raw_balance: u128,
    pub borrow: u128,
    pub borrow_limit: u128,
    pub borrowable: u128,
    pub last_limit_update: u64,
    pub expand_percent_bps: u16,
    pub expand_duration_seconds: u64,
    pub base_borrow_limit: u128,
    pub max_borrow_limit: u128,
}

/// The token as it would look after accruing to `now`
fn project(token: &TokenLedgerState, curve: &RateCurve, now: u64) -> Result<TokenLedgerState, LiquidityError> {
    let accrual = token.calculate_exchange_prices(curve, now)?;
    let mut projected = token.clone();
    projected.supply_exchange_price = accrual.supply_exchange_price;
    projected.borrow_exchange_price = accrual.borrow_exchange_price;
    projected.accrued_revenue = projected.accrued_revenue.try_add(accrual.revenue)?;
    projected.last_update.update(now);
    projected.refresh_rates(curve)?;
    Ok(projected)
}

pub fn get_overall_token_data(
    token: &TokenLedgerState,
    curve: &RateCurve,
    now: u64,
) -> Result<OverallTokenData, LiquidityError> {
    let token = project(token, curve, now)?;
    Ok(OverallTokenData {
        supply_exchange_price: token.supply_exchange_price,
        borrow_exchange_price: token.borrow_exchange_price,
        total_supply: token.total_supply()?,
        total_borrow: token.total_borrow()?,
        supply_raw_with_interest: token.supply_raw_with_interest,
        supply_interest_free: token.supply_interest_free,
        borrow_raw_with_interest: token.borrow_raw_with_interest,
        borrow_interest_free: token.borrow_interest_free,
        available_liquidity: token.available_liquidity,
        accrued_revenue: token.accrued_revenue,
        utilization: u128::from(token.last_utilization),
        borrow_rate: token.last_borrow_rate,
        supply_rate: token.supply_rate(token.last_borrow_rate)?,
        revenue_fee_bps: token.config.revenue_fee_bps,
        max_utilization_bps: token.config.max_utilization_bps,
        last_update_timestamp: token.last_update.timestamp,
        rate_curve: *curve,
    })
}

pub fn get_user_supply_data(
    token: &TokenLedgerState,
    curve: &RateCurve,
    position: &ParticipantPosition,
    now: u64,
) -> Result<UserSupplyData, LiquidityError> {
    if position.side != Side::Supply {
        return Err(LiquidityError::InvalidPositionSide);
    }
    let token = project(token, curve, now)?;
    let supply = position.amount(&token)?;
    let limit = &position.limit;
    Ok(UserSupplyData {
        mode: position.mode(),
        raw_balance: position.balance.raw(),
        supply,
        withdrawal_limit: limit.effective(supply, now)?,
        withdrawable: withdrawable(&token, position, now)?,
        last_limit_update: limit.last_update.timestamp,
        expand_percent_bps: limit.config.expand_percent_bps,
        expand_duration_seconds: limit.config.expand_duration_seconds,
        base_withdrawal_limit: limit.config.base_limit,
    })
}

pub fn get_user_borrow_data(
    token: &TokenLedgerState,
    curve: &RateCurve,
    position: &ParticipantPosition,
    now: u64,
) -> Result<UserBorrowData, LiquidityError> {
    if position.side != Side::Borrow {
        return Err(LiquidityError::InvalidPositionSide);
    }
    let token = project(token, curve, now)?;
    let borrow = position.amount(&token)?;
    let limit = &position.limit;
    Ok(UserBorrowData {
        mode: position.mode(),
        raw_balance: position.balance.raw(),
        borrow,
        borrow_limit: limit.effective(borrow, now)?,
        borrowable: borrowable(&token, position, now)?,
        last_limit_update: limit.last_update.timestamp,
        expand_percent_bps: limit.config.expand_percent_bps,
        expand_duration_seconds: limit.config.expand_duration_seconds,
        base_borrow_limit: limit.config.base_limit,
        max_borrow_limit: limit.config.max_ceiling,
    })
}
