//! Fixed-width storage records.
//!
//! Large amounts are packed with the compact codec. Every packed field
//! rounds in the direction that favors the ledger when the record is read
//! back: the supply price and borrow totals down, the borrow price and
//! supply totals up, withdrawal floors up and debt ceilings down.

use crate::error::LiquidityError;
use crate::math::compact::{DEFAULT_LAYOUT, SMALL_LAYOUT};
use crate::state::last_update::LastUpdate;
use crate::state::limit::{DynamicLimit, LimitConfig};
use crate::state::position::{Balance, InterestMode, ParticipantPosition, Side};
use crate::state::token::{TokenConfig, TokenLedgerState};
use alloc::vec::Vec;
use odra::casper_types::bytesrepr::{self, FromBytes, ToBytes};
use odra::casper_types::{CLType, CLTyped, U128};

fn pack_word(normal: u128, round_up: bool) -> Result<u64, LiquidityError> {
    let packed = DEFAULT_LAYOUT.pack(normal, round_up)?;
    u64::try_from(packed).map_err(|_| LiquidityError::MathOverflow)
}

fn unpack_word(word: u64) -> Result<u128, LiquidityError> {
    DEFAULT_LAYOUT.unpack(u128::from(word))
}

/// Four 16-bit lanes in one word
fn lanes(values: [u16; 4]) -> u64 {
    values
        .iter()
        .enumerate()
        .fold(0u64, |word, (i, lane)| word | (u64::from(*lane) << (16 * i)))
}

fn lane(word: u64, i: usize) -> u16 {
    (word >> (16 * i)) as u16
}

/// Storage form of [`TokenLedgerState`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    pub supply_exchange_price: u64,
    pub borrow_exchange_price: u64,
    pub supply_raw_with_interest: u64,
    pub supply_interest_free: u64,
    pub borrow_raw_with_interest: u64,
    pub borrow_interest_free: u64,
    pub last_update_timestamp: u64,
    /// Revenue fee, max utilization, last borrow rate and last utilization
    pub config_word: u64,
    pub available_liquidity: U128,
    pub accrued_revenue: U128,
}

impl TokenRecord {
    pub fn pack(state: &TokenLedgerState) -> Result<Self, LiquidityError> {
        Ok(Self {
            supply_exchange_price: pack_word(state.supply_exchange_price, false)?,
            borrow_exchange_price: pack_word(state.borrow_exchange_price, true)?,
            supply_raw_with_interest: pack_word(state.supply_raw_with_interest, true)?,
            supply_interest_free: pack_word(state.supply_interest_free, true)?,
            borrow_raw_with_interest: pack_word(state.borrow_raw_with_interest, false)?,
            borrow_interest_free: pack_word(state.borrow_interest_free, false)?,
            last_update_timestamp: state.last_update.timestamp,
            config_word: lanes([
                state.config.revenue_fee_bps,
                state.config.max_utilization_bps,
                state.last_borrow_rate,
                state.last_utilization,
            ]),
            available_liquidity: U128::from(state.available_liquidity),
            accrued_revenue: U128::from(state.accrued_revenue),
        })
    }

    pub fn unpack(&self) -> Result<TokenLedgerState, LiquidityError> {
        Ok(TokenLedgerState {
            supply_raw_with_interest: unpack_word(self.supply_raw_with_interest)?,
            supply_interest_free: unpack_word(self.supply_interest_free)?,
            borrow_raw_with_interest: unpack_word(self.borrow_raw_with_interest)?,
            borrow_interest_free: unpack_word(self.borrow_interest_free)?,
            supply_exchange_price: unpack_word(self.supply_exchange_price)?,
            borrow_exchange_price: unpack_word(self.borrow_exchange_price)?,
            last_update: LastUpdate::new(self.last_update_timestamp),
            config: TokenConfig {
                revenue_fee_bps: lane(self.config_word, 0),
                max_utilization_bps: lane(self.config_word, 1),
            },
            available_liquidity: self.available_liquidity.as_u128(),
            accrued_revenue: self.accrued_revenue.as_u128(),
            last_borrow_rate: lane(self.config_word, 2),
            last_utilization: lane(self.config_word, 3),
        })
    }

    fn words(&self) -> [u64; 8] {
        [
            self.supply_exchange_price,
            self.borrow_exchange_price,
            self.supply_raw_with_interest,
            self.supply_interest_free,
            self.borrow_raw_with_interest,
            self.borrow_interest_free,
            self.last_update_timestamp,
            self.config_word,
        ]
    }
}

impl ToBytes for TokenRecord {
    fn to_bytes(&self) -> Result<Vec<u8>, bytesrepr::Error> {
        let mut buffer = Vec::with_capacity(self.serialized_length());
        for word in self.words() {
            buffer.extend(word.to_bytes()?);
        }
        buffer.extend(self.available_liquidity.to_bytes()?);
        buffer.extend(self.accrued_revenue.to_bytes()?);
        Ok(buffer)
    }

    fn serialized_length(&self) -> usize {
        8 * 0u64.serialized_length()
            + self.available_liquidity.serialized_length()
            + self.accrued_revenue.serialized_length()
    }
}

impl FromBytes for TokenRecord {
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8]), bytesrepr::Error> {
        let mut words = [0u64; 8];
        let mut remainder = bytes;
        for word in words.iter_mut() {
            let (value, rest) = u64::from_bytes(remainder)?;
            *word = value;
            remainder = rest;
        }
        let (available_liquidity, remainder) = U128::from_bytes(remainder)?;
        let (accrued_revenue, remainder) = U128::from_bytes(remainder)?;
        Ok((
            Self {
                supply_exchange_price: words[0],
                borrow_exchange_price: words[1],
                supply_raw_with_interest: words[2],
                supply_interest_free: words[3],
                borrow_raw_with_interest: words[4],
                borrow_interest_free: words[5],
                last_update_timestamp: words[6],
                config_word: words[7],
                available_liquidity,
                accrued_revenue,
            },
            remainder,
        ))
    }
}

impl CLTyped for TokenRecord {
    fn cl_type() -> CLType {
        CLType::Any
    }
}

const FLAG_BORROW: u8 = 1;
const FLAG_INTEREST_FREE: u8 = 1 << 1;

/// Storage form of [`ParticipantPosition`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionRecord {
    /// Side and interest mode bits
    pub flags: u8,
    pub balance: u64,
    pub stored_limit: u64,
    pub last_limit_update: u64,
    /// Expand percent and expand duration
    pub expand_word: u64,
    /// Small layout packed base limit
    pub base_limit: u32,
    pub max_ceiling: u64,
}

impl PositionRecord {
    pub fn pack(position: &ParticipantPosition) -> Result<Self, LiquidityError> {
        let is_borrow = position.side == Side::Borrow;
        let mut flags = 0;
        if is_borrow {
            flags |= FLAG_BORROW;
        }
        if position.mode() == InterestMode::InterestFree {
            flags |= FLAG_INTEREST_FREE;
        }

        let config = &position.limit.config;
        let duration =
            u32::try_from(config.expand_duration_seconds).map_err(|_| LiquidityError::InvalidConfig)?;
        let base_limit = SMALL_LAYOUT.pack(config.base_limit, false)?;

        Ok(Self {
            flags,
            // debt up, supply down
            balance: pack_word(position.balance.raw(), is_borrow)?,
            // floors up, ceilings down
            stored_limit: pack_word(position.limit.stored_limit, !is_borrow)?,
            last_limit_update: position.limit.last_update.timestamp,
            expand_word: u64::from(config.expand_percent_bps) | (u64::from(duration) << 16),
            base_limit: u32::try_from(base_limit).map_err(|_| LiquidityError::MathOverflow)?,
            max_ceiling: pack_word(config.max_ceiling, false)?,
        })
    }

    pub fn unpack(&self) -> Result<ParticipantPosition, LiquidityError> {
        let side = if self.flags & FLAG_BORROW != 0 {
            Side::Borrow
        } else {
            Side::Supply
        };
        let raw = unpack_word(self.balance)?;
        let balance = if self.flags & FLAG_INTEREST_FREE != 0 {
            Balance::InterestFree(raw)
        } else {
            Balance::WithInterest(raw)
        };

        Ok(ParticipantPosition {
            side,
            balance,
            limit: DynamicLimit {
                direction: side.limit_direction(),
                config: LimitConfig {
                    expand_percent_bps: self.expand_word as u16,
                    expand_duration_seconds: (self.expand_word >> 16) & u64::from(u32::MAX),
                    base_limit: SMALL_LAYOUT.unpack(u128::from(self.base_limit))?,
                    max_ceiling: unpack_word(self.max_ceiling)?,
                },
                stored_limit: unpack_word(self.stored_limit)?,
                last_update: LastUpdate::new(self.last_limit_update),
            },
        })
    }
}

impl ToBytes for PositionRecord {
    fn to_bytes(&self) -> Result<Vec<u8>, bytesrepr::Error> {
        let mut buffer = Vec::with_capacity(self.serialized_length());
        buffer.extend(self.flags.to_bytes()?);
        buffer.extend(self.balance.to_bytes()?);
        buffer.extend(self.stored_limit.to_bytes()?);
        buffer.extend(self.last_limit_update.to_bytes()?);
        buffer.extend(self.expand_word.to_bytes()?);
        buffer.extend(self.base_limit.to_bytes()?);
        buffer.extend(self.max_ceiling.to_bytes()?);
        Ok(buffer)
    }

    fn serialized_length(&self) -> usize {
        self.flags.serialized_length()
            + 5 * 0u64.serialized_length()
            + self.base_limit.serialized_length()
    }
}

impl FromBytes for PositionRecord {
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8]), bytesrepr::Error> {
        let (flags, remainder) = u8::from_bytes(bytes)?;
        let (balance, remainder) = u64::from_bytes(remainder)?;
        let (stored_limit, remainder) = u64::from_bytes(remainder)?;
        let (last_limit_update, remainder) = u64::from_bytes(remainder)?;
        let (expand_word, remainder) = u64::from_bytes(remainder)?;
        let (base_limit, remainder) = u32::from_bytes(remainder)?;
        let (max_ceiling, remainder) = u64::from_bytes(remainder)?;
        Ok((
            Self {
                flags,
                balance,
                stored_limit,
                last_limit_update,
                expand_word,
                base_limit,
                max_ceiling,
            },
            remainder,
        ))
    }
}

impl CLTyped for PositionRecord {
    fn cl_type() -> CLType {
        CLType::Any
    }
}
