//! Utilization based borrow rate curves.
//!
//! Utilization and rates are both expressed in basis points
//! (`10_000` = 100%). Rates are annualized.

use crate::error::LiquidityError;
use crate::math::common::{TryAdd, TryDiv, TryMul, TrySub, FOUR_DECIMALS};
use alloc::vec::Vec;
use odra::casper_types::bytesrepr::{self, FromBytes, ToBytes};
use odra::casper_types::{CLType, CLTyped};
use serde::{Deserialize, Serialize};

/// Hard cap of a computed borrow rate, the width of its storage field
pub const MAX_RATE: u16 = u16::MAX;

const VERSION_V1: u8 = 1;
const VERSION_V2: u8 = 2;

/// Single kink curve: `0 -> kink -> 100%`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDataV1 {
    pub kink: u16,
    pub rate_at_zero: u16,
    pub rate_at_kink: u16,
    pub rate_at_max: u16,
}

/// Dual kink curve: `0 -> kink1 -> kink2 -> 100%`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateDataV2 {
    pub kink1: u16,
    pub kink2: u16,
    pub rate_at_zero: u16,
    pub rate_at_kink1: u16,
    pub rate_at_kink2: u16,
    pub rate_at_max: u16,
}

/// Versioned borrow rate curve of a token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "lowercase")]
pub enum RateCurve {
    V1(RateDataV1),
    V2(RateDataV2),
}

impl RateCurve {
    /// Rejects kinks at 0% or at/after 100%, unordered kinks and decreasing
    /// segments.
    pub fn validate(&self) -> Result<(), LiquidityError> {
        let max = FOUR_DECIMALS as u16;
        match self {
            RateCurve::V1(data) => {
                if data.kink == 0
                    || data.kink >= max
                    || data.rate_at_zero > data.rate_at_kink
                    || data.rate_at_kink > data.rate_at_max
                {
                    return Err(LiquidityError::InvalidRateCurve);
                }
            }
            RateCurve::V2(data) => {
                if data.kink1 == 0
                    || data.kink1 >= data.kink2
                    || data.kink2 >= max
                    || data.rate_at_zero > data.rate_at_kink1
                    || data.rate_at_kink1 > data.rate_at_kink2
                    || data.rate_at_kink2 > data.rate_at_max
                {
                    return Err(LiquidityError::InvalidRateCurve);
                }
            }
        }
        Ok(())
    }

    /// Annualized borrow rate at `utilization`, capped at [`MAX_RATE`].
    ///
    /// Utilization above 100% extrapolates the last segment.
    pub fn borrow_rate(&self, utilization: u128) -> Result<u16, LiquidityError> {
        let rate = match self {
            RateCurve::V1(data) => interpolate(
                &[
                    (0, data.rate_at_zero.into()),
                    (data.kink.into(), data.rate_at_kink.into()),
                    (FOUR_DECIMALS, data.rate_at_max.into()),
                ],
                utilization,
            )?,
            RateCurve::V2(data) => interpolate(
                &[
                    (0, data.rate_at_zero.into()),
                    (data.kink1.into(), data.rate_at_kink1.into()),
                    (data.kink2.into(), data.rate_at_kink2.into()),
                    (FOUR_DECIMALS, data.rate_at_max.into()),
                ],
                utilization,
            )?,
        };

        if rate > u128::from(MAX_RATE) {
            log::warn!("borrow rate {} capped at {} (utilization {})", rate, MAX_RATE, utilization);
            return Ok(MAX_RATE);
        }
        Ok(rate as u16)
    }

    fn version(&self) -> u8 {
        match self {
            RateCurve::V1(_) => VERSION_V1,
            RateCurve::V2(_) => VERSION_V2,
        }
    }

    fn lanes(&self) -> [u16; 6] {
        match self {
            RateCurve::V1(data) => [data.kink, data.rate_at_zero, data.rate_at_kink, data.rate_at_max, 0, 0],
            RateCurve::V2(data) => [
                data.kink1,
                data.kink2,
                data.rate_at_zero,
                data.rate_at_kink1,
                data.rate_at_kink2,
                data.rate_at_max,
            ],
        }
    }
}

/// `y_i + (x - x_i) * (y_{i+1} - y_i) / (x_{i+1} - x_i)` on the segment
/// holding `x`, the last segment for anything past the final breakpoint.
fn interpolate(points: &[(u128, u128)], x: u128) -> Result<u128, LiquidityError> {
    let last = points.len() - 2;
    let index = points
        .windows(2)
        .position(|segment| x < segment[1].0)
        .unwrap_or(last);

    let (x1, y1) = points[index];
    let (x2, y2) = points[index + 1];

    let rise = y2.try_sub(y1)?;
    let run = x2.try_sub(x1)?;
    x.try_sub(x1)?.try_mul(rise)?.try_div(run)?.try_add(y1)
}

fn pack_lanes(lanes: &[u16]) -> u64 {
    lanes
        .iter()
        .enumerate()
        .fold(0u64, |word, (i, lane)| word | (u64::from(*lane) << (16 * i)))
}

fn unpack_lane(word: u64, i: usize) -> u16 {
    (word >> (16 * i)) as u16
}

// Stored as a version tag and two words of 16-bit lanes
impl ToBytes for RateCurve {
    fn to_bytes(&self) -> Result<Vec<u8>, bytesrepr::Error> {
        let lanes = self.lanes();
        let mut buffer = Vec::with_capacity(self.serialized_length());
        buffer.extend(self.version().to_bytes()?);
        buffer.extend(pack_lanes(&lanes[..4]).to_bytes()?);
        buffer.extend(pack_lanes(&lanes[4..]).to_bytes()?);
        Ok(buffer)
    }

    fn serialized_length(&self) -> usize {
        self.version().serialized_length() + 2 * 0u64.serialized_length()
    }
}

impl FromBytes for RateCurve {
    fn from_bytes(bytes: &[u8]) -> Result<(Self, &[u8]), bytesrepr::Error> {
        let (version, remainder) = u8::from_bytes(bytes)?;
        let (low, remainder) = u64::from_bytes(remainder)?;
        let (high, remainder) = u64::from_bytes(remainder)?;
        let curve = match version {
            VERSION_V1 => RateCurve::V1(RateDataV1 {
                kink: unpack_lane(low, 0),
                rate_at_zero: unpack_lane(low, 1),
                rate_at_kink: unpack_lane(low, 2),
                rate_at_max: unpack_lane(low, 3),
            }),
            VERSION_V2 => RateCurve::V2(RateDataV2 {
                kink1: unpack_lane(low, 0),
                kink2: unpack_lane(low, 1),
                rate_at_zero: unpack_lane(low, 2),
                rate_at_kink1: unpack_lane(low, 3),
                rate_at_kink2: unpack_lane(high, 0),
                rate_at_max: unpack_lane(high, 1),
            }),
            _ => return Err(bytesrepr::Error::Formatting),
        };
        Ok((curve, remainder))
    }
}

impl CLTyped for RateCurve {
    fn cl_type() -> CLType {
        CLType::Any
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn curve_v1() -> RateCurve {
        RateCurve::V1(RateDataV1 {
            kink: 8000,
            rate_at_zero: 400,
            rate_at_kink: 1000,
            rate_at_max: 15000,
        })
    }

    fn curve_v2() -> RateCurve {
        RateCurve::V2(RateDataV2 {
            kink1: 5000,
            kink2: 8000,
            rate_at_zero: 0,
            rate_at_kink1: 1000,
            rate_at_kink2: 2000,
            rate_at_max: 10000,
        })
    }

    #[test]
    fn v1_breakpoints() {
        let curve = curve_v1();
        assert_eq!(curve.borrow_rate(0).unwrap(), 400);
        assert_eq!(curve.borrow_rate(8000).unwrap(), 1000);
        assert_eq!(curve.borrow_rate(10000).unwrap(), 15000);
    }

    #[test]
    fn v1_interpolation_floors() {
        // 400 + 100 * 600 / 8000 = 407.5
        assert_eq!(curve_v1().borrow_rate(100).unwrap(), 407);
        // 1000 + 1000 * 14000 / 2000
        assert_eq!(curve_v1().borrow_rate(9000).unwrap(), 8000);
    }

    #[test]
    fn v2_segments() {
        let curve = curve_v2();
        assert_eq!(curve.borrow_rate(2500).unwrap(), 500);
        assert_eq!(curve.borrow_rate(5000).unwrap(), 1000);
        assert_eq!(curve.borrow_rate(6500).unwrap(), 1500);
        assert_eq!(curve.borrow_rate(9000).unwrap(), 6000);
    }

    #[test]
    fn extrapolates_past_full_utilization() {
        // slope after kink2 is 4 rate points per utilization point
        assert_eq!(curve_v2().borrow_rate(11000).unwrap(), 14000);
        assert_eq!(curve_v1().borrow_rate(12000).unwrap(), 29000);
    }

    #[test]
    fn rate_is_capped() {
        assert_eq!(curve_v1().borrow_rate(65_535).unwrap(), MAX_RATE);
    }

    #[test]
    fn validate_rejects_bad_curves() {
        assert!(curve_v1().validate().is_ok());
        assert!(curve_v2().validate().is_ok());

        let zero_kink = RateCurve::V1(RateDataV1 { kink: 0, ..Default::default() });
        assert_eq!(zero_kink.validate(), Err(LiquidityError::InvalidRateCurve));

        let decreasing = RateCurve::V1(RateDataV1 {
            kink: 5000,
            rate_at_zero: 500,
            rate_at_kink: 400,
            rate_at_max: 1000,
        });
        assert_eq!(decreasing.validate(), Err(LiquidityError::InvalidRateCurve));

        let unordered = RateCurve::V2(RateDataV2 {
            kink1: 8000,
            kink2: 5000,
            ..Default::default()
        });
        assert_eq!(unordered.validate(), Err(LiquidityError::InvalidRateCurve));
    }

    #[test]
    fn bytes_roundtrip() {
        for curve in [curve_v1(), curve_v2()] {
            let bytes = curve.to_bytes().unwrap();
            assert_eq!(bytes.len(), curve.serialized_length());
            let (decoded, rest) = RateCurve::from_bytes(&bytes).unwrap();
            assert_eq!(decoded, curve);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut bytes = curve_v1().to_bytes().unwrap();
        bytes[0] = 9;
        assert!(RateCurve::from_bytes(&bytes).is_err());
    }
}
