//! Shared scalers and checked arithmetic for the ledger math.
//!
//! Amounts and exchange prices are `u128`; products that can exceed 128 bits
//! go through `U256` before being narrowed back.

use crate::error::LiquidityError;
use odra::casper_types::U256;

/// Exchange price precision, also the initial exchange price
pub const EXCHANGE_PRICES_PRECISION: u128 = 1_000_000_000_000;
/// 100% in basis points
pub const FOUR_DECIMALS: u128 = 10_000;
/// Seconds per year used to annualize borrow rates
pub const SECONDS_PER_YEAR: u128 = 31_536_000;

/// Try to subtract, return an error on underflow
pub trait TrySub: Sized {
    /// Subtract
    fn try_sub(self, rhs: Self) -> Result<Self, LiquidityError>;
}

/// Try to add, return an error on overflow
pub trait TryAdd: Sized {
    /// Add
    fn try_add(self, rhs: Self) -> Result<Self, LiquidityError>;
}

/// Try to divide, return an error on divide by zero
pub trait TryDiv<RHS = Self>: Sized {
    /// Divide
    fn try_div(self, rhs: RHS) -> Result<Self, LiquidityError>;
}

/// Try to multiply, return an error on overflow
pub trait TryMul<RHS = Self>: Sized {
    /// Multiply
    fn try_mul(self, rhs: RHS) -> Result<Self, LiquidityError>;
}

impl TryAdd for u128 {
    fn try_add(self, rhs: Self) -> Result<Self, LiquidityError> {
        self.checked_add(rhs).ok_or(LiquidityError::MathOverflow)
    }
}

impl TrySub for u128 {
    fn try_sub(self, rhs: Self) -> Result<Self, LiquidityError> {
        self.checked_sub(rhs).ok_or(LiquidityError::MathOverflow)
    }
}

impl TryMul for u128 {
    fn try_mul(self, rhs: Self) -> Result<Self, LiquidityError> {
        self.checked_mul(rhs).ok_or(LiquidityError::MathOverflow)
    }
}

impl TryDiv for u128 {
    fn try_div(self, rhs: Self) -> Result<Self, LiquidityError> {
        self.checked_div(rhs).ok_or(LiquidityError::DivisionByZero)
    }
}

fn narrow(value: U256) -> Result<u128, LiquidityError> {
    if value > U256::from(u128::MAX) {
        return Err(LiquidityError::MathOverflow);
    }
    Ok(value.low_u128())
}

/// `a * b / c`, rounded down, with a 256-bit intermediate product
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, LiquidityError> {
    if c == 0 {
        return Err(LiquidityError::DivisionByZero);
    }
    // two u128 factors never overflow 256 bits
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(c))
}

/// `a * b / c`, rounded up, with a 256-bit intermediate product
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> Result<u128, LiquidityError> {
    if c == 0 {
        return Err(LiquidityError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let divisor = U256::from(c);
    let mut quotient = product / divisor;
    if !(product % divisor).is_zero() {
        quotient = quotient
            .checked_add(U256::one())
            .ok_or(LiquidityError::MathOverflow)?;
    }
    narrow(quotient)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mul_div_rounding() {
        assert_eq!(mul_div_floor(10, 10, 3).unwrap(), 33);
        assert_eq!(mul_div_ceil(10, 10, 3).unwrap(), 34);
        assert_eq!(mul_div_ceil(10, 9, 3).unwrap(), 30);
    }

    #[test]
    fn mul_div_wide_intermediate() {
        // u128::MAX * 1e12 overflows u128 but the quotient fits
        let value = mul_div_floor(u128::MAX, EXCHANGE_PRICES_PRECISION, EXCHANGE_PRICES_PRECISION);
        assert_eq!(value.unwrap(), u128::MAX);
    }

    #[test]
    fn mul_div_errors() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(LiquidityError::DivisionByZero));
        assert_eq!(mul_div_floor(u128::MAX, 2, 1), Err(LiquidityError::MathOverflow));
        assert_eq!(u128::MAX.try_add(1), Err(LiquidityError::MathOverflow));
        assert_eq!(0u128.try_sub(1), Err(LiquidityError::MathOverflow));
        assert_eq!(5u128.try_div(0), Err(LiquidityError::DivisionByZero));
    }
}
