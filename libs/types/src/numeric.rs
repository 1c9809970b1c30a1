//! Integer amount arithmetic
//!
//! All values are unsigned integers in the asset's smallest unit. Scaling is
//! done as `a * b / c` (floor) with the product held in 256 bits, so results
//! are identical on every execution substrate and only a quotient that does
//! not fit an [`Amount`] fails.

use alloy_primitives::U256;

use crate::errors::ExchangeError;

/// Asset amount in smallest units.
pub type Amount = u128;

/// 10,000 basis points = 100%.
pub const BPS_DENOMINATOR: Amount = 10_000;

/// Resolved royalties above this many basis points abort the match.
pub const MAX_ROYALTY_BPS: Amount = 5_000;

/// Protocol fee rates must stay strictly below this many basis points.
pub const MAX_PROTOCOL_FEE_BPS: Amount = 5_000;

/// Fill ledger value marking an order as cancelled.
pub const CANCELLED: Amount = Amount::MAX;

/// Exact product of two amounts. Never overflows.
pub fn wide_mul(a: Amount, b: Amount) -> U256 {
    U256::from(a) * U256::from(b)
}

/// Narrow a 256-bit intermediate back to an [`Amount`].
pub fn narrow(value: U256) -> Result<Amount, ExchangeError> {
    Amount::try_from(value).map_err(|_| ExchangeError::Overflow)
}

/// `value * numerator / denominator`, rounding down.
pub fn mul_div(value: Amount, numerator: Amount, denominator: Amount) -> Result<Amount, ExchangeError> {
    if denominator == 0 {
        return Err(ExchangeError::DivisionByZero);
    }
    narrow(wide_mul(value, numerator) / U256::from(denominator))
}

/// `value * bps / 10000`, rounding down.
pub fn bps_of(value: Amount, bps: Amount) -> Result<Amount, ExchangeError> {
    mul_div(value, bps, BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(10_000_000_000, 250).unwrap(), 250_000_000);
        assert_eq!(bps_of(99, 100).unwrap(), 0); // floors
        assert_eq!(bps_of(0, 5_000).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0), Err(ExchangeError::DivisionByZero));
        assert_eq!(mul_div(Amount::MAX, 2, 1), Err(ExchangeError::Overflow));
    }

    #[test]
    fn test_mul_div_wide_product() {
        // 1e21 * 1e21 overflows u128 but the quotient fits
        let e21: Amount = 1_000_000_000_000_000_000_000;
        assert_eq!(mul_div(e21, e21, e21).unwrap(), e21);
        assert_eq!(mul_div(Amount::MAX, Amount::MAX, Amount::MAX).unwrap(), Amount::MAX);
        assert_eq!(mul_div(Amount::MAX, 3, 4).unwrap(), Amount::MAX / 4 * 3 + 2);
        assert_eq!(bps_of(Amount::MAX, 250).unwrap(), Amount::MAX / 40);
    }

    #[test]
    fn test_narrow() {
        assert_eq!(narrow(wide_mul(Amount::MAX, 1)).unwrap(), Amount::MAX);
        assert_eq!(narrow(wide_mul(Amount::MAX, 2)), Err(ExchangeError::Overflow));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// A basis-point share never exceeds the value it is taken from.
            #[test]
            fn bps_share_bounded_by_value(
                value in 0u128..=(u64::MAX as u128),
                bps in 0u128..=BPS_DENOMINATOR,
            ) {
                let share = bps_of(value, bps).unwrap();
                prop_assert!(share <= value);
            }
        }
    }
}
