//! Fill computation
//!
//! Integer-only proportional fill of a matched pair. Prices are compared by
//! cross-multiplication, never by division, and every scaling step is
//! rejected when floor truncation loses too much relative precision.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use exchange_types::errors::ExchangeError;
use exchange_types::numeric::{narrow, wide_mul, Amount};
use exchange_types::order::Order;

/// Amounts moved by one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResult {
    /// Units of the left make asset given by the left maker
    pub left_value: Amount,
    /// Units of the right make asset given by the right maker
    pub right_value: Amount,
}

/// Whether `numerator * target / denominator` truncates by a relative error
/// of `1 / tolerance` or more.
///
/// A zero target or numerator never errs. A zero tolerance disables the check.
pub fn is_rounding_error(
    numerator: Amount,
    denominator: Amount,
    target: Amount,
    tolerance: Amount,
) -> Result<bool, ExchangeError> {
    if denominator == 0 {
        return Err(ExchangeError::DivisionByZero);
    }
    if target == 0 || numerator == 0 {
        return Ok(false);
    }
    let product = wide_mul(numerator, target);
    let remainder = product % U256::from(denominator);
    // remainder < denominator, so the scaled remainder stays within 256 bits
    Ok(remainder * U256::from(tolerance) >= product)
}

/// `floor(numerator * target / denominator)`, rejecting rounding errors.
///
/// The product is exact; `Overflow` only when the quotient exceeds [`Amount`].
pub fn partial_amount_floor(
    numerator: Amount,
    denominator: Amount,
    target: Amount,
    tolerance: Amount,
) -> Result<Amount, ExchangeError> {
    if is_rounding_error(numerator, denominator, target, tolerance)? {
        return Err(ExchangeError::RoundingError);
    }
    narrow(wide_mul(numerator, target) / U256::from(denominator))
}

/// Remaining `(make, take)` of an order given its cumulative take-side fill.
pub fn calculate_remaining(
    order: &Order,
    fill: Amount,
    tolerance: Amount,
) -> Result<(Amount, Amount), ExchangeError> {
    let take = order.take_asset.value.saturating_sub(fill);
    let make = partial_amount_floor(order.make_asset.value, order.take_asset.value, take, tolerance)?;
    Ok((make, take))
}

/// Maximal fill of `left` against `right` given their prior fills.
pub fn fill_order(
    left: &Order,
    right: &Order,
    left_fill: Amount,
    right_fill: Amount,
    tolerance: Amount,
) -> Result<FillResult, ExchangeError> {
    let (left_make, left_take) = calculate_remaining(left, left_fill, tolerance)?;
    let (right_make, right_take) = calculate_remaining(right, right_fill, tolerance)?;

    let result = if right_take > left_make {
        fill_left(left_make, left_take, right.make_asset.value, right.take_asset.value, tolerance)?
    } else {
        fill_right(left.make_asset.value, left.take_asset.value, right_make, right_take, tolerance)?
    };

    match (result.left_value, result.right_value) {
        (0, 0) => Err(ExchangeError::NothingToFill),
        (0, _) | (_, 0) => Err(ExchangeError::ZeroFill),
        _ => Ok(result),
    }
}

/// The left order is exhausted: it gives all its remaining make.
fn fill_left(
    left_make: Amount,
    left_take: Amount,
    right_make: Amount,
    right_take: Amount,
    tolerance: Amount,
) -> Result<FillResult, ExchangeError> {
    let right_take_needed = partial_amount_floor(left_take, right_make, right_take, tolerance)?;
    if right_take_needed > left_make {
        return Err(ExchangeError::UnableToFillLeft);
    }
    Ok(FillResult {
        left_value: left_make,
        right_value: left_take,
    })
}

/// The right order is exhausted: it receives all its remaining take.
fn fill_right(
    left_make: Amount,
    left_take: Amount,
    right_make: Amount,
    right_take: Amount,
    tolerance: Amount,
) -> Result<FillResult, ExchangeError> {
    let maker_value = partial_amount_floor(right_take, left_make, left_take, tolerance)?;
    if maker_value > right_make {
        return Err(ExchangeError::UnableToFillRight);
    }
    Ok(FillResult {
        left_value: right_take,
        right_value: maker_value,
    })
}
