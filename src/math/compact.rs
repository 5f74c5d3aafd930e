//! Compact numeric codec.
//!
//! Stores an unsigned integer as `coefficient << exponent_bits | exponent`,
//! representing `coefficient << exponent`. The encoding is lossy; the
//! rounding direction is chosen by the caller so that the loss always falls
//! on the side the caller can tolerate.

use crate::error::LiquidityError;
use odra::casper_types::U256;

/// Width of a packed number: coefficient and exponent field sizes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedLayout {
    pub coefficient_bits: u32,
    pub exponent_bits: u32,
}

impl PackedLayout {
    /// Mask selecting the exponent field of a packed number
    pub const fn exponent_mask(&self) -> u128 {
        (1u128 << self.exponent_bits) - 1
    }

    pub fn pack(&self, normal: u128, round_up: bool) -> Result<u128, LiquidityError> {
        pack(normal, self.coefficient_bits, self.exponent_bits, round_up)
    }

    pub fn unpack(&self, packed: u128) -> Result<u128, LiquidityError> {
        unpack(packed, self.exponent_bits, self.exponent_mask())
    }
}

/// 56-bit coefficient and 8-bit exponent, one u64 storage word
pub const DEFAULT_LAYOUT: PackedLayout = PackedLayout {
    coefficient_bits: 56,
    exponent_bits: 8,
};

/// 10-bit coefficient and 8-bit exponent for coarse configuration amounts
pub const SMALL_LAYOUT: PackedLayout = PackedLayout {
    coefficient_bits: 10,
    exponent_bits: 8,
};

/// Bit length of `x`: 0 for 0, 1 for 1, 128 for `u128::MAX`.
pub fn most_significant_bit(x: u128) -> u32 {
    let mut normal = x;
    let mut last_bit = 0;
    if normal > 0xffff_ffff_ffff_ffff {
        normal >>= 64;
        last_bit += 64;
    }
    if normal > 0xffff_ffff {
        normal >>= 32;
        last_bit += 32;
    }
    if normal > 0xffff {
        normal >>= 16;
        last_bit += 16;
    }
    if normal > 0xff {
        normal >>= 8;
        last_bit += 8;
    }
    if normal > 0xf {
        normal >>= 4;
        last_bit += 4;
    }
    if normal > 0x3 {
        normal >>= 2;
        last_bit += 2;
    }
    if normal > 0x1 {
        normal >>= 1;
        last_bit += 1;
    }
    if normal == 1 {
        last_bit += 1;
    }
    last_bit
}

/// Packs `normal` into a `coefficient_bits + exponent_bits` wide number.
pub fn pack(
    normal: u128,
    coefficient_bits: u32,
    exponent_bits: u32,
    round_up: bool,
) -> Result<u128, LiquidityError> {
    if coefficient_bits == 0
        || exponent_bits == 0
        || exponent_bits > 8
        || coefficient_bits + exponent_bits > 128
    {
        return Err(LiquidityError::InvalidConfig);
    }

    let mut exponent = most_significant_bit(normal).saturating_sub(coefficient_bits);
    let mut coefficient = normal >> exponent;

    if round_up && exponent > 0 {
        coefficient += 1;
        if coefficient == 1u128 << coefficient_bits {
            // carry into the exponent
            coefficient >>= 1;
            exponent += 1;
        }
    }

    if exponent >= 1u32 << exponent_bits {
        return Err(LiquidityError::ExponentOverflow);
    }

    Ok((coefficient << exponent_bits) | exponent as u128)
}

/// Expands a packed number back to `coefficient << exponent`.
pub fn unpack(packed: u128, exponent_bits: u32, exponent_mask: u128) -> Result<u128, LiquidityError> {
    let exponent = (packed & exponent_mask) as u32;
    let coefficient = packed >> exponent_bits;
    if coefficient == 0 {
        return Ok(0);
    }
    if exponent >= 128 || coefficient.leading_zeros() < exponent {
        return Err(LiquidityError::MathOverflow);
    }
    Ok(coefficient << exponent)
}

/// Approximates `unpack(a) * unpack(b) / c` without expanding the packed
/// operands.
///
/// The coefficient of the operand with the larger exponent is shifted left
/// by the exponent difference so both share the smaller exponent `e`; the
/// shared scale `2^(2e)` is then removed from the divisor instead of applied
/// to the product. The result is exact when `c` is a multiple of `2^(2e)`.
pub fn scaled_mul_div(
    a: u128,
    b: u128,
    c: u128,
    layout: PackedLayout,
) -> Result<u128, LiquidityError> {
    let mask = layout.exponent_mask();
    let exponent_a = (a & mask) as u32;
    let exponent_b = (b & mask) as u32;
    let mut coefficient_a = U256::from(a >> layout.exponent_bits);
    let mut coefficient_b = U256::from(b >> layout.exponent_bits);

    let shared = exponent_a.min(exponent_b);
    if exponent_a > exponent_b {
        coefficient_a = shift_left(coefficient_a, exponent_a - exponent_b)?;
    } else {
        coefficient_b = shift_left(coefficient_b, exponent_b - exponent_a)?;
    }

    let scale = 2 * shared as usize;
    let divisor = if scale >= 256 { U256::zero() } else { U256::from(c) >> scale };
    if divisor.is_zero() {
        return Err(LiquidityError::DivisionByZero);
    }

    let product = coefficient_a
        .checked_mul(coefficient_b)
        .ok_or(LiquidityError::MathOverflow)?;
    let quotient = product / divisor;
    if quotient > U256::from(u128::MAX) {
        return Err(LiquidityError::MathOverflow);
    }
    Ok(quotient.low_u128())
}

fn shift_left(value: U256, shift: u32) -> Result<U256, LiquidityError> {
    if value.is_zero() {
        return Ok(value);
    }
    if value.bits() + shift as usize > 256 {
        return Err(LiquidityError::MathOverflow);
    }
    Ok(value << shift as usize)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn msb_matches_bit_length() {
        assert_eq!(most_significant_bit(0), 0);
        assert_eq!(most_significant_bit(1), 1);
        assert_eq!(most_significant_bit(2), 2);
        assert_eq!(most_significant_bit(255), 8);
        assert_eq!(most_significant_bit(256), 9);
        assert_eq!(most_significant_bit(1u128 << 100), 101);
        assert_eq!(most_significant_bit(u128::MAX), 128);
        for shift in 0..128 {
            assert_eq!(most_significant_bit(1u128 << shift), shift + 1);
        }
    }

    #[test]
    fn small_values_are_exact() {
        let packed = DEFAULT_LAYOUT.pack(1_000_000_000_000, true).unwrap();
        assert_eq!(packed & DEFAULT_LAYOUT.exponent_mask(), 0);
        assert_eq!(DEFAULT_LAYOUT.unpack(packed).unwrap(), 1_000_000_000_000);
        assert_eq!(DEFAULT_LAYOUT.pack(0, true).unwrap(), 0);
        assert_eq!(DEFAULT_LAYOUT.unpack(0).unwrap(), 0);
    }

    #[test]
    fn rounding_brackets_the_value() {
        // 1023 * 2 + 1 needs 11 bits; small layout keeps 10
        let normal = 2047u128;
        let down = SMALL_LAYOUT.unpack(SMALL_LAYOUT.pack(normal, false).unwrap()).unwrap();
        let up = SMALL_LAYOUT.unpack(SMALL_LAYOUT.pack(normal, true).unwrap()).unwrap();
        assert_eq!(down, 2046);
        assert_eq!(up, 2048);
    }

    #[test]
    fn round_up_carries_into_exponent() {
        // coefficient 1023 + 1 reaches 2^10 and is halved
        let packed = pack(2047, 10, 8, true).unwrap();
        assert_eq!(packed & 0xff, 2);
        assert_eq!(packed >> 8, 512);
    }

    #[test]
    fn exponent_overflow() {
        // 2 exponent bits allow exponents up to 3
        assert_eq!(pack(1 << 20, 10, 2, false), Err(LiquidityError::ExponentOverflow));
        assert!(pack(1 << 12, 10, 2, false).is_ok());
    }

    #[test]
    fn unpack_rejects_overflowing_exponent() {
        let packed = (u128::from(u64::MAX) << 8) | 127;
        assert_eq!(DEFAULT_LAYOUT.unpack(packed), Err(LiquidityError::MathOverflow));
    }

    #[test]
    fn scaled_mul_div_matches_unpacked_math() {
        let a = DEFAULT_LAYOUT.pack(3_000_000, false).unwrap();
        let b = DEFAULT_LAYOUT.pack(1_040_700_000_000, false).unwrap();
        let result = scaled_mul_div(a, b, 1_000_000_000_000, DEFAULT_LAYOUT).unwrap();
        assert_eq!(result, 3_122_100);
    }

    #[test]
    fn scaled_mul_div_with_exponents() {
        let a = SMALL_LAYOUT.pack(1 << 20, false).unwrap();
        let b = SMALL_LAYOUT.pack(1 << 12, false).unwrap();
        // exponents 11 and 3, divisor 2^6 aligned to 1
        let result = scaled_mul_div(a, b, 1 << 6, SMALL_LAYOUT).unwrap();
        assert_eq!(result, 1 << 26);
    }

    #[test]
    fn scaled_mul_div_zero_divisor() {
        let a = SMALL_LAYOUT.pack(1 << 20, false).unwrap();
        let b = SMALL_LAYOUT.pack(1 << 20, false).unwrap();
        // both exponents 11: divisor shifted by 22 bits vanishes
        assert_eq!(
            scaled_mul_div(a, b, 1_000, SMALL_LAYOUT),
            Err(LiquidityError::DivisionByZero)
        );
    }
}
