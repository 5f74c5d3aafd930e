//! Per-token ledger totals and exchange price accrual.

use crate::error::LiquidityError;
use crate::math::common::{
    mul_div_ceil, mul_div_floor, TryAdd, TryMul, TrySub, EXCHANGE_PRICES_PRECISION, FOUR_DECIMALS,
    SECONDS_PER_YEAR,
};
use crate::math::rate_curve::RateCurve;
use crate::state::last_update::LastUpdate;
use crate::state::position::InterestMode;
use serde::{Deserialize, Serialize};

/// Largest utilization value tracked, the width of its storage field
pub const MAX_UTILIZATION: u128 = u16::MAX as u128;

/// Admin configured parameters of a token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Share of borrower interest kept by the protocol, in basis points
    pub revenue_fee_bps: u16,
    /// Borrows pushing utilization above this fail, in basis points
    pub max_utilization_bps: u16,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            revenue_fee_bps: 0,
            max_utilization_bps: FOUR_DECIMALS as u16,
        }
    }
}

impl TokenConfig {
    pub fn validate(&self) -> Result<(), LiquidityError> {
        if u128::from(self.revenue_fee_bps) > FOUR_DECIMALS
            || self.max_utilization_bps == 0
            || u128::from(self.max_utilization_bps) > FOUR_DECIMALS
        {
            return Err(LiquidityError::InvalidConfig);
        }
        Ok(())
    }
}

/// Result of bringing a token's exchange prices up to a timestamp
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accrual {
    pub supply_exchange_price: u128,
    pub borrow_exchange_price: u128,
    /// Utilization the accrued period was priced at, in basis points
    pub utilization: u128,
    pub borrow_rate: u16,
    pub seconds_elapsed: u64,
    /// Interest added to with-interest borrows
    pub borrow_increase: u128,
    /// Part of the interest passed on to with-interest suppliers
    pub supplier_earnings: u128,
    /// Part of the interest booked as protocol revenue
    pub revenue: u128,
    /// No with-interest supply existed, so the whole increase went to revenue
    pub undistributed: bool,
}

/// Aggregated ledger of one token
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedgerState {
    /// Raw (price-scaled) supply earning interest
    pub supply_raw_with_interest: u128,
    /// Supply excluded from interest, in token amounts
    pub supply_interest_free: u128,
    /// Raw (price-scaled) borrow paying interest
    pub borrow_raw_with_interest: u128,
    /// Borrow excluded from interest, in token amounts
    pub borrow_interest_free: u128,
    /// Token amount per raw supply unit, scaled by 1e12
    pub supply_exchange_price: u128,
    /// Token amount per raw borrow unit, scaled by 1e12
    pub borrow_exchange_price: u128,
    pub last_update: LastUpdate,
    pub config: TokenConfig,
    /// Tokens held by the ledger and not lent out
    pub available_liquidity: u128,
    /// Protocol revenue not yet collected
    pub accrued_revenue: u128,
    pub last_borrow_rate: u16,
    pub last_utilization: u16,
}

impl TokenLedgerState {
    pub fn new(config: TokenConfig, now: u64) -> Result<Self, LiquidityError> {
        config.validate()?;
        Ok(Self {
            supply_raw_with_interest: 0,
            supply_interest_free: 0,
            borrow_raw_with_interest: 0,
            borrow_interest_free: 0,
            supply_exchange_price: EXCHANGE_PRICES_PRECISION,
            borrow_exchange_price: EXCHANGE_PRICES_PRECISION,
            last_update: LastUpdate::new(now),
            config,
            available_liquidity: 0,
            accrued_revenue: 0,
            last_borrow_rate: 0,
            last_utilization: 0,
        })
    }

    /// Total supply in token amounts at the current supply price
    pub fn total_supply(&self) -> Result<u128, LiquidityError> {
        raw_to_amount(self.supply_raw_with_interest, self.supply_exchange_price, false)?
            .try_add(self.supply_interest_free)
    }

    /// Total borrow in token amounts at the current borrow price
    pub fn total_borrow(&self) -> Result<u128, LiquidityError> {
        raw_to_amount(self.borrow_raw_with_interest, self.borrow_exchange_price, false)?
            .try_add(self.borrow_interest_free)
    }

    /// Total borrow over total supply in basis points, capped at
    /// [`MAX_UTILIZATION`]. An empty supply side reports 0.
    pub fn utilization(&self) -> Result<u128, LiquidityError> {
        let supply = self.total_supply()?;
        if supply == 0 {
            return Ok(0);
        }
        let utilization = mul_div_floor(self.total_borrow()?, FOUR_DECIMALS, supply)?;
        Ok(utilization.min(MAX_UTILIZATION))
    }

    /// Computes the exchange prices at `now` without touching the ledger.
    pub fn calculate_exchange_prices(&self, curve: &RateCurve, now: u64) -> Result<Accrual, LiquidityError> {
        if self.supply_exchange_price == 0 || self.borrow_exchange_price == 0 {
            return Err(LiquidityError::ExchangePriceZero);
        }
        let seconds_elapsed = self.last_update.seconds_elapsed(now)?;
        let utilization = self.utilization()?;
        let borrow_rate = curve.borrow_rate(utilization)?;

        let mut accrual = Accrual {
            supply_exchange_price: self.supply_exchange_price,
            borrow_exchange_price: self.borrow_exchange_price,
            utilization,
            borrow_rate,
            seconds_elapsed,
            ..Accrual::default()
        };

        // interest-free only ledgers keep both prices at their initial value
        if seconds_elapsed == 0 || borrow_rate == 0 || self.borrow_raw_with_interest == 0 {
            return Ok(accrual);
        }

        // borrowers are charged rounded up
        let price_increase = mul_div_ceil(
            self.borrow_exchange_price,
            u128::from(borrow_rate).try_mul(u128::from(seconds_elapsed))?,
            SECONDS_PER_YEAR.try_mul(FOUR_DECIMALS)?,
        )?;
        accrual.borrow_exchange_price = self.borrow_exchange_price.try_add(price_increase)?;

        accrual.borrow_increase =
            mul_div_floor(self.borrow_raw_with_interest, price_increase, EXCHANGE_PRICES_PRECISION)?;
        let revenue_cut = mul_div_floor(
            accrual.borrow_increase,
            u128::from(self.config.revenue_fee_bps),
            FOUR_DECIMALS,
        )?;
        let earnings = accrual.borrow_increase.try_sub(revenue_cut)?;

        if self.supply_raw_with_interest == 0 {
            // nobody to pay, the whole increase is revenue
            accrual.revenue = accrual.borrow_increase;
            accrual.undistributed = accrual.borrow_increase > 0;
        } else {
            // suppliers are credited rounded down
            let supply_increase =
                mul_div_floor(earnings, EXCHANGE_PRICES_PRECISION, self.supply_raw_with_interest)?;
            accrual.supply_exchange_price = self.supply_exchange_price.try_add(supply_increase)?;
            accrual.supplier_earnings = earnings;
            accrual.revenue = revenue_cut;
        }

        Ok(accrual)
    }

    /// Applies the accrual up to `now` and records the rate and utilization
    /// that will price the next period.
    pub fn update_exchange_prices(&mut self, curve: &RateCurve, now: u64) -> Result<Accrual, LiquidityError> {
        let accrual = self.calculate_exchange_prices(curve, now)?;

        if accrual.undistributed {
            log::warn!("no with-interest supply, {} interest booked as revenue", accrual.revenue);
        }

        self.supply_exchange_price = accrual.supply_exchange_price;
        self.borrow_exchange_price = accrual.borrow_exchange_price;
        self.accrued_revenue = self.accrued_revenue.try_add(accrual.revenue)?;
        self.last_update.update(now);
        self.refresh_rates(curve)?;

        log::debug!(
            "accrued {}s at rate {}: supply price {}, borrow price {}, revenue {}",
            accrual.seconds_elapsed,
            accrual.borrow_rate,
            accrual.supply_exchange_price,
            accrual.borrow_exchange_price,
            accrual.revenue
        );

        Ok(accrual)
    }

    /// Re-reads utilization and the borrow rate from the current totals.
    pub fn refresh_rates(&mut self, curve: &RateCurve) -> Result<(), LiquidityError> {
        let utilization = self.utilization()?;
        self.last_borrow_rate = curve.borrow_rate(utilization)?;
        // capped at MAX_UTILIZATION
        self.last_utilization = utilization as u16;
        Ok(())
    }

    /// Annualized supply rate implied by `borrow_rate` and the current
    /// totals, in basis points.
    pub fn supply_rate(&self, borrow_rate: u16) -> Result<u128, LiquidityError> {
        let supply = raw_to_amount(self.supply_raw_with_interest, self.supply_exchange_price, false)?;
        if supply == 0 {
            return Ok(0);
        }
        let borrow = raw_to_amount(self.borrow_raw_with_interest, self.borrow_exchange_price, false)?;
        let kept = FOUR_DECIMALS.try_sub(u128::from(self.config.revenue_fee_bps))?;
        let paid = mul_div_floor(u128::from(borrow_rate), borrow, supply)?;
        mul_div_floor(paid, kept, FOUR_DECIMALS)
    }

    /// Raw units to book for `amount` on the supply side
    pub fn supply_raw(&self, mode: InterestMode, amount: u128, round_up: bool) -> Result<u128, LiquidityError> {
        match mode {
            InterestMode::InterestFree => Ok(amount),
            InterestMode::WithInterest => amount_to_raw(amount, self.supply_exchange_price, round_up),
        }
    }

    /// Raw units to book for `amount` on the borrow side
    pub fn borrow_raw(&self, mode: InterestMode, amount: u128, round_up: bool) -> Result<u128, LiquidityError> {
        match mode {
            InterestMode::InterestFree => Ok(amount),
            InterestMode::WithInterest => amount_to_raw(amount, self.borrow_exchange_price, round_up),
        }
    }

    pub fn add_supply(&mut self, mode: InterestMode, raw: u128) -> Result<(), LiquidityError> {
        match mode {
            InterestMode::InterestFree => self.supply_interest_free = self.supply_interest_free.try_add(raw)?,
            InterestMode::WithInterest => {
                self.supply_raw_with_interest = self.supply_raw_with_interest.try_add(raw)?
            }
        }
        Ok(())
    }

    pub fn remove_supply(&mut self, mode: InterestMode, raw: u128) -> Result<(), LiquidityError> {
        match mode {
            InterestMode::InterestFree => self.supply_interest_free = self.supply_interest_free.try_sub(raw)?,
            InterestMode::WithInterest => {
                self.supply_raw_with_interest = self.supply_raw_with_interest.try_sub(raw)?
            }
        }
        Ok(())
    }

    pub fn add_borrow(&mut self, mode: InterestMode, raw: u128) -> Result<(), LiquidityError> {
        match mode {
            InterestMode::InterestFree => self.borrow_interest_free = self.borrow_interest_free.try_add(raw)?,
            InterestMode::WithInterest => {
                self.borrow_raw_with_interest = self.borrow_raw_with_interest.try_add(raw)?
            }
        }
        Ok(())
    }

    pub fn remove_borrow(&mut self, mode: InterestMode, raw: u128) -> Result<(), LiquidityError> {
        match mode {
            InterestMode::InterestFree => self.borrow_interest_free = self.borrow_interest_free.try_sub(raw)?,
            InterestMode::WithInterest => {
                self.borrow_raw_with_interest = self.borrow_raw_with_interest.try_sub(raw)?
            }
        }
        Ok(())
    }

    /// Largest amount that can still be borrowed without crossing the
    /// maximum utilization.
    pub fn max_utilization_headroom(&self) -> Result<u128, LiquidityError> {
        let ceiling = mul_div_floor(
            self.total_supply()?,
            u128::from(self.config.max_utilization_bps),
            FOUR_DECIMALS,
        )?;
        Ok(ceiling.saturating_sub(self.total_borrow()?))
    }
}

/// `raw * price / 1e12`
pub fn raw_to_amount(raw: u128, exchange_price: u128, round_up: bool) -> Result<u128, LiquidityError> {
    if round_up {
        mul_div_ceil(raw, exchange_price, EXCHANGE_PRICES_PRECISION)
    } else {
        mul_div_floor(raw, exchange_price, EXCHANGE_PRICES_PRECISION)
    }
}

/// `amount * 1e12 / price`
pub fn amount_to_raw(amount: u128, exchange_price: u128, round_up: bool) -> Result<u128, LiquidityError> {
    if exchange_price == 0 {
        return Err(LiquidityError::ExchangePriceZero);
    }
    if round_up {
        mul_div_ceil(amount, EXCHANGE_PRICES_PRECISION, exchange_price)
    } else {
        mul_div_floor(amount, EXCHANGE_PRICES_PRECISION, exchange_price)
    }
}
