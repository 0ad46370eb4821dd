//! Per-medication remaining-units counter.
//!
//! Stock changes only on confirmation ([`decrement`]) and [`refill`]. Ledger
//! edits and deletions never adjust it.

use super::types::Medication;
use crate::error::{DoseError, Result};
use crate::store::Store;

/// Subtract `units`, floored at zero, and persist immediately.
///
/// Returns the new stock, or `None` if the medication does not track stock.
pub fn decrement(store: &dyn Store, medication_id: &str, units: u32) -> Result<Option<u32>> {
    let mut medication = store
        .medication(medication_id)?
        .ok_or_else(|| DoseError::medication_not_found(medication_id))?;

    let Some(stock) = medication.stock else {
        return Ok(None);
    };
    let remaining = stock.saturating_sub(units);
    medication.stock = Some(remaining);
    store.save_medication(&medication)?;

    tracing::debug!(medication_id = %medication_id, units, remaining, "stock decremented");
    Ok(Some(remaining))
}

/// Add `added_units` to the stock. Negative or overflowing amounts are
/// rejected without touching the store. An untracked medication starts
/// tracking from zero.
pub fn refill(store: &dyn Store, medication_id: &str, added_units: i64) -> Result<u32> {
    let added = u32::try_from(added_units).map_err(|_| {
        DoseError::validation(format!(
            "refill amount must be a non-negative integer, got {added_units}"
        ))
    })?;

    let mut medication = store
        .medication(medication_id)?
        .ok_or_else(|| DoseError::medication_not_found(medication_id))?;

    let stock = medication
        .stock
        .unwrap_or(0)
        .checked_add(added)
        .ok_or_else(|| DoseError::validation("refill would overflow the stock counter"))?;
    medication.stock = Some(stock);
    store.save_medication(&medication)?;

    tracing::info!(medication_id = %medication_id, added, stock, "stock refilled");
    Ok(stock)
}

/// Parse a refill amount typed by a user.
pub fn parse_units(input: &str) -> Result<i64> {
    input
        .trim()
        .parse::<i64>()
        .map_err(|_| DoseError::validation(format!("not an integer: {input:?}")))
}

/// `true` if stock is tracked and at or below the effective threshold.
pub fn is_low(medication: &Medication) -> bool {
    medication
        .stock
        .is_some_and(|s| s <= medication.effective_low_stock_threshold())
}
