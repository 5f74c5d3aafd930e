//! Operation processor of the liquidity layer.
//!
//! Every operation accrues the token first, then applies the balance change
//! and finally moves the position's limit. [`accrue_and_apply`] works on
//! copies, so a failed operation leaves the stored state untouched.

use alloc::collections::BTreeMap;
use serde::{Deserialize, Serialize};

use crate::error::LiquidityError;
use crate::math::common::{TryAdd, TrySub};
use crate::math::rate_curve::RateCurve;
use crate::resolver::{self, OverallTokenData, UserBorrowData, UserSupplyData};
use crate::state::{
    Accrual, Balance, InterestMode, LimitConfig, ParticipantPosition, PositionRecord, Side, TokenConfig,
    TokenLedgerState, TokenRecord,
};

/// Identifier of a token
pub type TokenId = [u8; 32];
/// Identifier of a participant
pub type ParticipantId = [u8; 32];

/// Amount passed to withdraw or payback everything allowed
pub const MAX_AMOUNT: u128 = u128::MAX;

/// A balance changing operation, amounts in token units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Deposit(u128),
    /// [`MAX_AMOUNT`] withdraws everything the limit and liquidity allow
    Withdraw(u128),
    /// [`MAX_AMOUNT`] borrows everything the limits and liquidity allow
    Borrow(u128),
    /// [`MAX_AMOUNT`] repays the whole debt
    Payback(u128),
}

impl Action {
    pub fn side(&self) -> Side {
        match self {
            Action::Deposit(_) | Action::Withdraw(_) => Side::Supply,
            Action::Borrow(_) | Action::Payback(_) => Side::Borrow,
        }
    }
}

/// Updated state after a successful operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperateOutcome {
    pub token: TokenLedgerState,
    pub position: ParticipantPosition,
    /// Token amount actually moved
    pub amount: u128,
    pub accrual: Accrual,
}

/// Runs `action` against copies of `token` and `position` at `now`.
pub fn accrue_and_apply(
    token: &TokenLedgerState,
    curve: &RateCurve,
    position: &ParticipantPosition,
    action: Action,
    now: u64,
) -> Result<OperateOutcome, LiquidityError> {
    if position.side != action.side() {
        return Err(LiquidityError::InvalidPositionSide);
    }

    let mut token = token.clone();
    let mut position = *position;
    let accrual = token.update_exchange_prices(curve, now)?;

    let amount = match action {
        Action::Deposit(amount) => deposit(&mut token, &mut position, amount, now)?,
        Action::Withdraw(amount) => withdraw(&mut token, &mut position, amount, now)?,
        Action::Borrow(amount) => borrow(&mut token, &mut position, amount, now)?,
        Action::Payback(amount) => payback(&mut token, &mut position, amount, now)?,
    };

    token.refresh_rates(curve)?;

    Ok(OperateOutcome {
        token,
        position,
        amount,
        accrual,
    })
}

/// Largest amount `position` can withdraw at `now`
pub fn withdrawable(
    token: &TokenLedgerState,
    position: &ParticipantPosition,
    now: u64,
) -> Result<u128, LiquidityError> {
    let balance = position.amount(token)?;
    let headroom = position.limit.headroom(balance, now)?;
    Ok(headroom.min(token.available_liquidity))
}

/// Largest amount `position` can borrow at `now`
pub fn borrowable(
    token: &TokenLedgerState,
    position: &ParticipantPosition,
    now: u64,
) -> Result<u128, LiquidityError> {
    let balance = position.amount(token)?;
    let headroom = position.limit.headroom(balance, now)?;
    Ok(headroom
        .min(token.available_liquidity)
        .min(token.max_utilization_headroom()?))
}

fn deposit(
    token: &mut TokenLedgerState,
    position: &mut ParticipantPosition,
    amount: u128,
    now: u64,
) -> Result<u128, LiquidityError> {
    if amount == 0 || amount == MAX_AMOUNT {
        return Err(LiquidityError::InvalidAmount);
    }
    let mode = position.mode();
    // the participant is credited rounded down
    let raw = token.supply_raw(mode, amount, false)?;
    if raw == 0 {
        return Err(LiquidityError::InvalidAmount);
    }

    token.add_supply(mode, raw)?;
    position.balance = position.balance.with_raw(position.balance.raw().try_add(raw)?);
    token.available_liquidity = token.available_liquidity.try_add(amount)?;

    position.limit.advance(position.amount(token)?, now)?;
    Ok(amount)
}

fn withdraw(
    token: &mut TokenLedgerState,
    position: &mut ParticipantPosition,
    amount: u128,
    now: u64,
) -> Result<u128, LiquidityError> {
    let balance = position.amount(token)?;
    let amount = if amount == MAX_AMOUNT {
        withdrawable(token, position, now)?
    } else {
        amount
    };
    if amount == 0 {
        return Err(LiquidityError::InvalidAmount);
    }
    if amount > balance {
        return Err(LiquidityError::WithdrawTooLarge);
    }
    position.limit.check(balance, amount, now)?;
    if amount > token.available_liquidity {
        return Err(LiquidityError::InsufficientLiquidity);
    }

    let mode = position.mode();
    // the participant gives up raw units rounded up, all of them on a full exit
    let raw = if amount == balance {
        position.balance.raw()
    } else {
        token.supply_raw(mode, amount, true)?
    };

    token.remove_supply(mode, raw)?;
    position.balance = position.balance.with_raw(
        position
            .balance
            .raw()
            .checked_sub(raw)
            .ok_or(LiquidityError::WithdrawTooLarge)?,
    );
    token.available_liquidity = token.available_liquidity.try_sub(amount)?;

    position.limit.advance(position.amount(token)?, now)?;
    Ok(amount)
}

fn borrow(
    token: &mut TokenLedgerState,
    position: &mut ParticipantPosition,
    amount: u128,
    now: u64,
) -> Result<u128, LiquidityError> {
    let balance = position.amount(token)?;
    let amount = if amount == MAX_AMOUNT {
        borrowable(token, position, now)?
    } else {
        amount
    };
    if amount == 0 {
        return Err(LiquidityError::InvalidAmount);
    }
    position.limit.check(balance, amount, now)?;
    if amount > token.available_liquidity {
        return Err(LiquidityError::InsufficientLiquidity);
    }

    let mode = position.mode();
    // debt is booked rounded up
    let raw = token.borrow_raw(mode, amount, true)?;
    token.add_borrow(mode, raw)?;
    position.balance = position.balance.with_raw(position.balance.raw().try_add(raw)?);

    if token.utilization()? > u128::from(token.config.max_utilization_bps) {
        return Err(LiquidityError::MaxUtilizationReached);
    }
    token.available_liquidity = token.available_liquidity.try_sub(amount)?;

    position.limit.advance(position.amount(token)?, now)?;
    Ok(amount)
}

fn payback(
    token: &mut TokenLedgerState,
    position: &mut ParticipantPosition,
    amount: u128,
    now: u64,
) -> Result<u128, LiquidityError> {
    let balance = position.amount(token)?;
    let amount = if amount == MAX_AMOUNT { balance } else { amount };
    if amount == 0 {
        return Err(LiquidityError::InvalidAmount);
    }
    if amount > balance {
        return Err(LiquidityError::RepayTooLarge);
    }

    let mode = position.mode();
    // repaid debt is cleared rounded down, fully on a full repay
    let raw = if amount == balance {
        position.balance.raw()
    } else {
        token.borrow_raw(mode, amount, false)?
    };
    if raw == 0 {
        return Err(LiquidityError::InvalidAmount);
    }

    token.remove_borrow(mode, raw)?;
    position.balance = position.balance.with_raw(
        position
            .balance
            .raw()
            .checked_sub(raw)
            .ok_or(LiquidityError::RepayTooLarge)?,
    );
    token.available_liquidity = token.available_liquidity.try_add(amount)?;

    position.limit.advance(position.amount(token)?, now)?;
    Ok(amount)
}

/// Ledger and rate curve of one token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub state: TokenLedgerState,
    pub curve: RateCurve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct PositionKey {
    participant: ParticipantId,
    token: TokenId,
    side: Side,
}

impl PositionKey {
    fn new(participant: ParticipantId, token: TokenId, side: Side) -> Self {
        Self {
            participant,
            token,
            side,
        }
    }
}

/// All token ledgers and participant positions.
///
/// The host supplies `now` with every call; token transfers happen outside
/// and follow the returned amounts.
#[derive(Clone, Debug, Default)]
pub struct LiquidityLayer {
    tokens: BTreeMap<TokenId, TokenEntry>,
    positions: BTreeMap<PositionKey, ParticipantPosition>,
}

impl LiquidityLayer {
    pub fn new() -> Self {
        Self::default()
    }

    // ===========================================================================
    // TOKEN ADMINISTRATION
    // ===========================================================================

    pub fn init_token(
        &mut self,
        token: TokenId,
        config: TokenConfig,
        curve: RateCurve,
        now: u64,
    ) -> Result<(), LiquidityError> {
        if self.tokens.contains_key(&token) {
            return Err(LiquidityError::TokenAlreadyInitialized);
        }
        curve.validate()?;
        let mut state = TokenLedgerState::new(config, now)?;
        state.refresh_rates(&curve)?;
        self.tokens.insert(token, TokenEntry { state, curve });
        Ok(())
    }

    /// Replaces the rate curve. Interest up to `now` accrues on the old one.
    pub fn set_rate_curve(&mut self, token: TokenId, curve: RateCurve, now: u64) -> Result<(), LiquidityError> {
        curve.validate()?;
        let entry = self.tokens.get_mut(&token).ok_or(LiquidityError::TokenNotFound)?;
        let mut state = entry.state.clone();
        state.update_exchange_prices(&entry.curve, now)?;
        state.refresh_rates(&curve)?;
        entry.state = state;
        entry.curve = curve;
        Ok(())
    }

    /// Replaces the token configuration. Interest up to `now` accrues under
    /// the old revenue fee.
    pub fn set_token_config(&mut self, token: TokenId, config: TokenConfig, now: u64) -> Result<(), LiquidityError> {
        config.validate()?;
        let entry = self.tokens.get_mut(&token).ok_or(LiquidityError::TokenNotFound)?;
        let mut state = entry.state.clone();
        state.update_exchange_prices(&entry.curve, now)?;
        state.config = config;
        state.refresh_rates(&entry.curve)?;
        entry.state = state;
        Ok(())
    }

    /// Creates a position or updates its limit configuration.
    ///
    /// The interest mode can only change while the position is empty.
    pub fn configure_position(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        side: Side,
        mode: InterestMode,
        config: LimitConfig,
        now: u64,
    ) -> Result<(), LiquidityError> {
        let entry = self.tokens.get_mut(&token).ok_or(LiquidityError::TokenNotFound)?;
        let key = PositionKey::new(participant, token, side);

        let Some(mut position) = self.positions.get(&key).copied() else {
            let position = ParticipantPosition::new(side, mode, config, now)?;
            self.positions.insert(key, position);
            return Ok(());
        };

        let mut state = entry.state.clone();
        state.update_exchange_prices(&entry.curve, now)?;

        if position.mode() != mode {
            if !position.is_empty() {
                return Err(LiquidityError::InvalidConfig);
            }
            position.balance = Balance::empty(mode);
        }
        position.limit.reconfigure(config, position.amount(&state)?, now)?;

        entry.state = state;
        self.positions.insert(key, position);
        Ok(())
    }

    /// Moves accrued revenue out of the ledger, bounded by liquidity.
    pub fn collect_revenue(&mut self, token: TokenId, now: u64) -> Result<u128, LiquidityError> {
        let entry = self.tokens.get_mut(&token).ok_or(LiquidityError::TokenNotFound)?;
        let mut state = entry.state.clone();
        state.update_exchange_prices(&entry.curve, now)?;

        let amount = state.accrued_revenue.min(state.available_liquidity);
        state.accrued_revenue = state.accrued_revenue.try_sub(amount)?;
        state.available_liquidity = state.available_liquidity.try_sub(amount)?;
        entry.state = state;

        log::debug!("collected {} revenue", amount);
        Ok(amount)
    }

    // ===========================================================================
    // POSITION OPERATIONS
    // ===========================================================================

    pub fn deposit(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        amount: u128,
        now: u64,
    ) -> Result<u128, LiquidityError> {
        self.operate(participant, token, Action::Deposit(amount), now)
    }

    pub fn withdraw(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        amount: u128,
        now: u64,
    ) -> Result<u128, LiquidityError> {
        self.operate(participant, token, Action::Withdraw(amount), now)
    }

    pub fn borrow(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        amount: u128,
        now: u64,
    ) -> Result<u128, LiquidityError> {
        self.operate(participant, token, Action::Borrow(amount), now)
    }

    pub fn payback(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        amount: u128,
        now: u64,
    ) -> Result<u128, LiquidityError> {
        self.operate(participant, token, Action::Payback(amount), now)
    }

    /// Applies `action` and stores the result. Returns the amount moved.
    pub fn operate(
        &mut self,
        participant: ParticipantId,
        token: TokenId,
        action: Action,
        now: u64,
    ) -> Result<u128, LiquidityError> {
        let entry = self.tokens.get_mut(&token).ok_or(LiquidityError::TokenNotFound)?;
        let key = PositionKey::new(participant, token, action.side());
        let position = self.positions.get_mut(&key).ok_or(LiquidityError::PositionNotFound)?;

        let outcome = accrue_and_apply(&entry.state, &entry.curve, position, action, now)?;
        entry.state = outcome.token;
        *position = outcome.position;

        log::trace!("{:?} settled {}", action, outcome.amount);
        Ok(outcome.amount)
    }

    // ===========================================================================
    // QUERY FUNCTIONS
    // ===========================================================================

    pub fn get_token(&self, token: TokenId) -> Option<&TokenEntry> {
        self.tokens.get(&token)
    }

    pub fn get_position(&self, participant: ParticipantId, token: TokenId, side: Side) -> Option<&ParticipantPosition> {
        self.positions.get(&PositionKey::new(participant, token, side))
    }

    pub fn get_token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn overall_token_data(&self, token: TokenId, now: u64) -> Result<OverallTokenData, LiquidityError> {
        let entry = self.tokens.get(&token).ok_or(LiquidityError::TokenNotFound)?;
        resolver::get_overall_token_data(&entry.state, &entry.curve, now)
    }

    pub fn user_supply_data(
        &self,
        participant: ParticipantId,
        token: TokenId,
        now: u64,
    ) -> Result<UserSupplyData, LiquidityError> {
        let entry = self.tokens.get(&token).ok_or(LiquidityError::TokenNotFound)?;
        let position = self
            .get_position(participant, token, Side::Supply)
            .ok_or(LiquidityError::PositionNotFound)?;
        resolver::get_user_supply_data(&entry.state, &entry.curve, position, now)
    }

    pub fn user_borrow_data(
        &self,
        participant: ParticipantId,
        token: TokenId,
        now: u64,
    ) -> Result<UserBorrowData, LiquidityError> {
        let entry = self.tokens.get(&token).ok_or(LiquidityError::TokenNotFound)?;
        let position = self
            .get_position(participant, token, Side::Borrow)
            .ok_or(LiquidityError::PositionNotFound)?;
        resolver::get_user_borrow_data(&entry.state, &entry.curve, position, now)
    }

    /// Storage record of a token ledger
    pub fn token_record(&self, token: TokenId) -> Result<TokenRecord, LiquidityError> {
        let entry = self.tokens.get(&token).ok_or(LiquidityError::TokenNotFound)?;
        TokenRecord::pack(&entry.state)
    }

    /// Storage record of a position
    pub fn position_record(
        &self,
        participant: ParticipantId,
        token: TokenId,
        side: Side,
    ) -> Result<PositionRecord, LiquidityError> {
        let position = self
            .get_position(participant, token, side)
            .ok_or(LiquidityError::PositionNotFound)?;
        PositionRecord::pack(position)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::common::{EXCHANGE_PRICES_PRECISION, SECONDS_PER_YEAR};
    use crate::math::rate_curve::RateDataV1;

    const E18: u128 = 1_000_000_000_000_000_000;
    const TOKEN: TokenId = [1; 32];
    const ALICE: ParticipantId = [0xa; 32];
    const BOB: ParticipantId = [0xb; 32];

    fn curve() -> RateCurve {
        RateCurve::V1(RateDataV1 {
            kink: 8000,
            rate_at_zero: 400,
            rate_at_kink: 1000,
            rate_at_max: 15000,
        })
    }

    fn open_limits() -> LimitConfig {
        LimitConfig {
            expand_percent_bps: 10_000,
            expand_duration_seconds: 0,
            base_limit: u128::MAX / 2,
            max_ceiling: u128::MAX / 2,
        }
    }

    fn layer() -> LiquidityLayer {
        let mut layer = LiquidityLayer::new();
        layer.init_token(TOKEN, TokenConfig::default(), curve(), 0).unwrap();
        layer
            .configure_position(ALICE, TOKEN, Side::Supply, InterestMode::WithInterest, open_limits(), 0)
            .unwrap();
        layer
            .configure_position(BOB, TOKEN, Side::Borrow, InterestMode::WithInterest, open_limits(), 0)
            .unwrap();
        layer
    }

    #[test]
    fn one_year_of_interest() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 100 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, E18, 0).unwrap();

        let data = layer.overall_token_data(TOKEN, 0).unwrap();
        assert_eq!(data.utilization, 100);
        assert_eq!(data.borrow_rate, 407);
        assert_eq!(data.supply_rate, 4);

        let year = SECONDS_PER_YEAR as u64;
        layer.deposit(ALICE, TOKEN, E18, year).unwrap();
        let state = &layer.get_token(TOKEN).unwrap().state;
        assert_eq!(state.borrow_exchange_price, 1_040_700_000_000);
        assert_eq!(state.supply_exchange_price, 1_000_407_000_000);
    }

    #[test]
    fn full_exit_leaves_the_ledger_solvent() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 100 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, 10 * E18, 0).unwrap();

        let year = SECONDS_PER_YEAR as u64;
        let repaid = layer.payback(BOB, TOKEN, MAX_AMOUNT, year).unwrap();
        assert!(repaid > 10 * E18);
        let withdrawn = layer.withdraw(ALICE, TOKEN, MAX_AMOUNT, year).unwrap();
        assert!(withdrawn > 100 * E18);

        let state = &layer.get_token(TOKEN).unwrap().state;
        assert_eq!(state.borrow_raw_with_interest, 0);
        assert_eq!(state.supply_raw_with_interest, 0);
        assert!(state.available_liquidity >= state.accrued_revenue);
    }

    #[test]
    fn failed_operation_changes_nothing() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, E18, 0).unwrap();
        let before = layer.get_token(TOKEN).unwrap().clone();

        assert_eq!(
            layer.borrow(BOB, TOKEN, 2 * E18, 10),
            Err(LiquidityError::InsufficientLiquidity)
        );
        assert_eq!(layer.get_token(TOKEN).unwrap(), &before);
        assert!(layer.get_position(BOB, TOKEN, Side::Borrow).unwrap().is_empty());
    }

    #[test]
    fn max_utilization_rejects_borrows() {
        let mut layer = layer();
        let config = TokenConfig {
            revenue_fee_bps: 0,
            max_utilization_bps: 5000,
        };
        layer.set_token_config(TOKEN, config, 0).unwrap();
        layer.deposit(ALICE, TOKEN, 10 * E18, 0).unwrap();

        assert_eq!(
            layer.borrow(BOB, TOKEN, 6 * E18, 0),
            Err(LiquidityError::MaxUtilizationReached)
        );
        assert_eq!(layer.borrow(BOB, TOKEN, MAX_AMOUNT, 0).unwrap(), 5 * E18);
    }

    #[test]
    fn side_and_existence_checks() {
        let mut layer = layer();
        assert_eq!(
            layer.deposit(BOB, TOKEN, E18, 0),
            Err(LiquidityError::PositionNotFound)
        );
        assert_eq!(
            layer.deposit(ALICE, [9; 32], E18, 0),
            Err(LiquidityError::TokenNotFound)
        );
        assert_eq!(
            layer.init_token(TOKEN, TokenConfig::default(), curve(), 0),
            Err(LiquidityError::TokenAlreadyInitialized)
        );
        assert_eq!(layer.deposit(ALICE, TOKEN, 0, 0), Err(LiquidityError::InvalidAmount));

        let token = layer.get_token(TOKEN).unwrap().state.clone();
        let supply = *layer.get_position(ALICE, TOKEN, Side::Supply).unwrap();
        assert_eq!(
            accrue_and_apply(&token, &curve(), &supply, Action::Borrow(1), 0),
            Err(LiquidityError::InvalidPositionSide)
        );
    }

    #[test]
    fn overdraw_errors() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 10 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, E18, 0).unwrap();
        assert_eq!(
            layer.withdraw(ALICE, TOKEN, 11 * E18, 0),
            Err(LiquidityError::WithdrawTooLarge)
        );
        assert_eq!(
            layer.payback(BOB, TOKEN, 2 * E18, 0),
            Err(LiquidityError::RepayTooLarge)
        );
    }

    #[test]
    fn payback_below_one_raw_unit_is_rejected() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 100 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, E18, 0).unwrap();

        // at a price of 1.0407 one token clears less than one raw unit
        let year = SECONDS_PER_YEAR as u64;
        assert_eq!(layer.payback(BOB, TOKEN, 1, year), Err(LiquidityError::InvalidAmount));
        let position = layer.get_position(BOB, TOKEN, Side::Borrow).unwrap();
        assert_eq!(position.balance.raw(), E18);
        assert_eq!(layer.get_token(TOKEN).unwrap().state.available_liquidity, 99 * E18);

        assert_eq!(layer.payback(BOB, TOKEN, 2, year).unwrap(), 2);
        let position = layer.get_position(BOB, TOKEN, Side::Borrow).unwrap();
        assert_eq!(position.balance.raw(), E18 - 1);
    }

    #[test]
    fn interest_free_positions_hold_plain_amounts() {
        let mut layer = layer();
        layer
            .configure_position(BOB, TOKEN, Side::Supply, InterestMode::InterestFree, open_limits(), 0)
            .unwrap();
        layer.deposit(BOB, TOKEN, 5 * E18, 0).unwrap();
        let position = layer.get_position(BOB, TOKEN, Side::Supply).unwrap();
        assert_eq!(position.balance, Balance::InterestFree(5 * E18));
        let state = &layer.get_token(TOKEN).unwrap().state;
        assert_eq!(state.supply_interest_free, 5 * E18);
        assert_eq!(state.supply_exchange_price, EXCHANGE_PRICES_PRECISION);
    }

    #[test]
    fn mode_switch_needs_an_empty_position() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, E18, 0).unwrap();
        assert_eq!(
            layer.configure_position(ALICE, TOKEN, Side::Supply, InterestMode::InterestFree, open_limits(), 0),
            Err(LiquidityError::InvalidConfig)
        );
    }

    #[test]
    fn revenue_is_collected() {
        let mut layer = layer();
        let config = TokenConfig {
            revenue_fee_bps: 1000,
            max_utilization_bps: 10_000,
        };
        layer.set_token_config(TOKEN, config, 0).unwrap();
        layer.deposit(ALICE, TOKEN, 100 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, E18, 0).unwrap();

        let collected = layer.collect_revenue(TOKEN, SECONDS_PER_YEAR as u64).unwrap();
        assert_eq!(collected, 4_070_000_000_000_000);
        let state = &layer.get_token(TOKEN).unwrap().state;
        assert_eq!(state.accrued_revenue, 0);
        assert_eq!(state.available_liquidity, 99 * E18 - collected);
    }

    #[test]
    fn curve_change_accrues_on_the_old_curve() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 100 * E18, 0).unwrap();
        layer.borrow(BOB, TOKEN, E18, 0).unwrap();

        let steep = RateCurve::V1(RateDataV1 {
            kink: 8000,
            rate_at_zero: 5000,
            rate_at_kink: 6000,
            rate_at_max: 15000,
        });
        layer.set_rate_curve(TOKEN, steep, SECONDS_PER_YEAR as u64).unwrap();
        let state = &layer.get_token(TOKEN).unwrap().state;
        assert_eq!(state.borrow_exchange_price, 1_040_700_000_000);
        assert!(state.last_borrow_rate >= 5000);

        let invalid = RateCurve::V1(RateDataV1::default());
        assert_eq!(
            layer.set_rate_curve(TOKEN, invalid, SECONDS_PER_YEAR as u64),
            Err(LiquidityError::InvalidRateCurve)
        );
    }

    #[test]
    fn records_are_exposed() {
        let mut layer = layer();
        layer.deposit(ALICE, TOKEN, 1_000_000, 7).unwrap();
        let record = layer.token_record(TOKEN).unwrap();
        assert_eq!(record.unpack().unwrap(), layer.get_token(TOKEN).unwrap().state);
        assert!(layer.position_record(ALICE, TOKEN, Side::Supply).is_ok());
        assert_eq!(
            layer.position_record(ALICE, TOKEN, Side::Borrow),
            Err(LiquidityError::PositionNotFound)
        );
    }
}
