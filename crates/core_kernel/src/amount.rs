//! Monetary amount helpers
//!
//! Credit amounts are plain `Decimal` values in the agency's settlement
//! currency. They are normalised to two decimal places on entry so that the
//! ledger never stores sub-cent fractions.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::CoreError;

/// Number of decimal places kept for every stored amount
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds an amount to the ledger scale using banker's rounding
pub fn normalize_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Normalises an amount and rejects zero or negative values
///
/// # Errors
///
/// Returns `CoreError::NonPositiveAmount` naming `field` when the normalised amount
/// is not strictly positive.
pub fn require_positive(field: &str, amount: Decimal) -> Result<Decimal, CoreError> {
    let amount = normalize_amount(amount);
    if amount <= Decimal::ZERO {
        return Err(CoreError::NonPositiveAmount {
            field: field.to_string(),
            value: amount,
        });
    }
    Ok(amount)
}
