use crate::error::LiquidityError;
use crate::state::limit::{DynamicLimit, LimitConfig, LimitDirection};
use crate::state::token::{raw_to_amount, TokenLedgerState};
use serde::{Deserialize, Serialize};

/// Side of the ledger a position sits on
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Supply,
    Borrow,
}

impl Side {
    pub fn limit_direction(&self) -> LimitDirection {
        match self {
            Side::Supply => LimitDirection::Floor,
            Side::Borrow => LimitDirection::Ceiling,
        }
    }
}

/// Whether a position takes part in interest
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterestMode {
    WithInterest,
    InterestFree,
}

/// Balance of a position in the units of its interest mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Balance {
    /// Raw units, multiplied by the side's exchange price to get an amount
    WithInterest(u128),
    /// Plain token amount
    InterestFree(u128),
}

impl Balance {
    pub fn empty(mode: InterestMode) -> Self {
        match mode {
            InterestMode::WithInterest => Balance::WithInterest(0),
            InterestMode::InterestFree => Balance::InterestFree(0),
        }
    }

    pub fn mode(&self) -> InterestMode {
        match self {
            Balance::WithInterest(_) => InterestMode::WithInterest,
            Balance::InterestFree(_) => InterestMode::InterestFree,
        }
    }

    /// Stored value, raw or plain
    pub fn raw(&self) -> u128 {
        match self {
            Balance::WithInterest(raw) | Balance::InterestFree(raw) => *raw,
        }
    }

    pub fn with_raw(&self, raw: u128) -> Self {
        match self {
            Balance::WithInterest(_) => Balance::WithInterest(raw),
            Balance::InterestFree(_) => Balance::InterestFree(raw),
        }
    }

    pub fn to_amount(&self, exchange_price: u128, round_up: bool) -> Result<u128, LiquidityError> {
        match self {
            Balance::WithInterest(raw) => raw_to_amount(*raw, exchange_price, round_up),
            Balance::InterestFree(amount) => Ok(*amount),
        }
    }
}

/// One participant's position on one side of one token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPosition {
    pub side: Side,
    pub balance: Balance,
    /// Withdrawal floor on the supply side, debt ceiling on the borrow side
    pub limit: DynamicLimit,
}

impl ParticipantPosition {
    pub fn new(side: Side, mode: InterestMode, config: LimitConfig, now: u64) -> Result<Self, LiquidityError> {
        Ok(Self {
            side,
            balance: Balance::empty(mode),
            limit: DynamicLimit::new(side.limit_direction(), config, now)?,
        })
    }

    pub fn mode(&self) -> InterestMode {
        self.balance.mode()
    }

    pub fn is_empty(&self) -> bool {
        self.balance.raw() == 0
    }

    /// Balance in token amounts. Supply rounds down and debt rounds up so
    /// that the ledger never owes more than it holds.
    pub fn amount(&self, token: &TokenLedgerState) -> Result<u128, LiquidityError> {
        match self.side {
            Side::Supply => self.balance.to_amount(token.supply_exchange_price, false),
            Side::Borrow => self.balance.to_amount(token.borrow_exchange_price, true),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::token::TokenConfig;

    #[test]
    fn amounts_round_against_the_participant() {
        let mut token = TokenLedgerState::new(TokenConfig::default(), 0).unwrap();
        token.supply_exchange_price = 1_040_700_000_000;
        token.borrow_exchange_price = 1_040_700_000_000;

        let mut supply = ParticipantPosition::new(Side::Supply, InterestMode::WithInterest, LimitConfig::default(), 0)
            .unwrap();
        supply.balance = supply.balance.with_raw(961);
        assert_eq!(supply.amount(&token).unwrap(), 1_000);

        let mut borrow = ParticipantPosition::new(Side::Borrow, InterestMode::WithInterest, LimitConfig::default(), 0)
            .unwrap();
        borrow.balance = borrow.balance.with_raw(961);
        assert_eq!(borrow.amount(&token).unwrap(), 1_001);
    }

    #[test]
    fn interest_free_ignores_prices() {
        let mut token = TokenLedgerState::new(TokenConfig::default(), 0).unwrap();
        token.borrow_exchange_price = 2_000_000_000_000;
        let position = ParticipantPosition {
            balance: Balance::InterestFree(500),
            ..ParticipantPosition::new(Side::Borrow, InterestMode::InterestFree, LimitConfig::default(), 0).unwrap()
        };
        assert_eq!(position.amount(&token).unwrap(), 500);
        assert_eq!(position.mode(), InterestMode::InterestFree);
    }

    #[test]
    fn limit_direction_follows_side() {
        let supply = ParticipantPosition::new(Side::Supply, InterestMode::WithInterest, LimitConfig::default(), 0)
            .unwrap();
        assert_eq!(supply.limit.direction, LimitDirection::Floor);
        assert!(supply.is_empty());
        assert_eq!(Side::Borrow.limit_direction(), LimitDirection::Ceiling);
    }
}
