// =============================================================================
// Numeric primitive — checked decimal ratios
// =============================================================================
//
// Every price, ratio and percentage in the engine is a `rust_decimal::Decimal`
// so threshold comparisons never drift the way binary floats do.
//
// Division by a zero or negative reference price is "no signal" rather than
// an error: the helpers below return `None` and callers skip the bar.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Serialize, Serializer};

/// `(value - reference) / reference`, or `None` when `reference <= 0` or the
/// arithmetic overflows.
pub fn relative_change(value: Decimal, reference: Decimal) -> Option<Decimal> {
    if reference <= Decimal::ZERO {
        return None;
    }
    value.checked_sub(reference)?.checked_div(reference)
}

/// Signed percentage change from `reference` to `value`.
pub fn percent_change(value: Decimal, reference: Decimal) -> Option<Decimal> {
    relative_change(value, reference)?.checked_mul(dec!(100))
}

/// Bar range as a fraction of its low: `(high - low) / low`.
pub fn range_fraction(high: Decimal, low: Decimal) -> Option<Decimal> {
    if low <= Decimal::ZERO {
        return None;
    }
    high.checked_sub(low)?.checked_div(low)
}

/// Percent (e.g. `5.0`) to fraction (`0.05`).
pub fn percent_to_fraction(pct: Decimal) -> Decimal {
    pct / dec!(100)
}

/// Serialise a decimal without trailing zeros, so `5` and `5.0` compare equal
/// once a config has been turned into JSON.
pub fn serialize_normalized<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    Serialize::serialize(&value.normalize(), serializer)
}
