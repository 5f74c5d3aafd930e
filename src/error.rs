//! Error types returned by every ledger operation.

use core::fmt;

/// Coarse classification of a [`LiquidityError`], used by callers to decide
/// whether a resubmission with different input can succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Overflow, division by zero, codec exponent overflow or an overdrawn
    /// balance. Fatal for the operation.
    Arithmetic,
    /// A limit would be exceeded. The caller may retry with a smaller amount.
    Limit,
    /// Invalid input or configuration.
    Config,
}

/// Errors that may occur while accruing or applying an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiquidityError {
    // 0
    MathOverflow = 0,
    DivisionByZero = 1,
    ExponentOverflow = 2,
    WithdrawTooLarge = 3,
    RepayTooLarge = 4,

    // 10
    WithdrawalLimitReached = 10,
    BorrowLimitReached = 11,
    MaxUtilizationReached = 12,
    InsufficientLiquidity = 13,

    // 20
    InvalidAmount = 20,
    InvalidConfig = 21,
    InvalidRateCurve = 22,
    InvalidPositionSide = 23,
    InvalidTimestamp = 24,

    // 25
    TokenNotFound = 25,
    TokenAlreadyInitialized = 26,
    PositionNotFound = 27,
    ExchangePriceZero = 28,
}

impl LiquidityError {
    /// Stable numeric code, suitable for a host revert reason.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LiquidityError::MathOverflow
            | LiquidityError::DivisionByZero
            | LiquidityError::ExponentOverflow
            | LiquidityError::WithdrawTooLarge
            | LiquidityError::RepayTooLarge => ErrorKind::Arithmetic,
            LiquidityError::WithdrawalLimitReached
            | LiquidityError::BorrowLimitReached
            | LiquidityError::MaxUtilizationReached
            | LiquidityError::InsufficientLiquidity => ErrorKind::Limit,
            LiquidityError::InvalidAmount
            | LiquidityError::InvalidConfig
            | LiquidityError::InvalidRateCurve
            | LiquidityError::InvalidPositionSide
            | LiquidityError::InvalidTimestamp
            | LiquidityError::TokenNotFound
            | LiquidityError::TokenAlreadyInitialized
            | LiquidityError::PositionNotFound
            | LiquidityError::ExchangePriceZero => ErrorKind::Config,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            LiquidityError::MathOverflow => "Math operation overflow",
            LiquidityError::DivisionByZero => "Division by zero",
            LiquidityError::ExponentOverflow => "Exponent does not fit the packed exponent width",
            LiquidityError::WithdrawTooLarge => "Withdraw amount exceeds the position balance",
            LiquidityError::RepayTooLarge => "Payback amount exceeds the recorded borrow",
            LiquidityError::WithdrawalLimitReached => "Withdrawal limit reached",
            LiquidityError::BorrowLimitReached => "Borrow limit reached",
            LiquidityError::MaxUtilizationReached => "Borrow would exceed the maximum utilization",
            LiquidityError::InsufficientLiquidity => "Insufficient liquidity available",
            LiquidityError::InvalidAmount => "Input amount is invalid",
            LiquidityError::InvalidConfig => "Input config value is invalid",
            LiquidityError::InvalidRateCurve => "Rate curve breakpoints are invalid",
            LiquidityError::InvalidPositionSide => "Operation does not match the position side",
            LiquidityError::InvalidTimestamp => "Timestamp is earlier than the last update",
            LiquidityError::TokenNotFound => "Token is not initialized",
            LiquidityError::TokenAlreadyInitialized => "Token is already initialized",
            LiquidityError::PositionNotFound => "Position does not exist",
            LiquidityError::ExchangePriceZero => "Exchange price is zero",
        }
    }
}

impl fmt::Display for LiquidityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(LiquidityError::MathOverflow.code(), 0);
        assert_eq!(LiquidityError::WithdrawalLimitReached.code(), 10);
        assert_eq!(LiquidityError::ExchangePriceZero.code(), 28);
    }

    #[test]
    fn overdraw_is_arithmetic() {
        assert_eq!(LiquidityError::RepayTooLarge.kind(), ErrorKind::Arithmetic);
        assert_eq!(LiquidityError::BorrowLimitReached.kind(), ErrorKind::Limit);
        assert_eq!(LiquidityError::InvalidTimestamp.kind(), ErrorKind::Config);
    }

    #[test]
    fn display_uses_message() {
        assert_eq!(
            format!("{}", LiquidityError::InsufficientLiquidity),
            "Insufficient liquidity available"
        );
    }
}
