//! Money helpers. Amounts are persisted as integer cents and exposed as
//! two-decimal [`Decimal`] values.

use rust_decimal::Decimal;

/// Convert a persisted cent amount into a two-decimal value.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Convert a price into cents, rejecting negatives and sub-cent precision.
pub fn to_cents(amount: Decimal) -> Result<i64, String> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(format!("amount must not be negative: {amount}"));
    }
    if amount.normalize().scale() > 2 {
        return Err(format!("amount has more than two fractional digits: {amount}"));
    }
    let mut scaled = amount;
    scaled.rescale(2);
    i64::try_from(scaled.mantissa()).map_err(|_| format!("amount out of range: {amount}"))
}
