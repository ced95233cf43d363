use chrono::{DateTime, Utc};

use crate::entry::{EntryId, EntryOrigin, LedgerEntry, PaymentKind, ADMIN_ADJUSTMENT_REF};

/// Build the correction that moves an account from `current_total` to `new_total`.
///
/// A debit is born delivered and a credit is born pending, matching how the
/// reconciler treats each. The entry is not appended anywhere.
pub fn build_adjustment(
    current_total: f64,
    new_total: f64,
    kind: PaymentKind,
    id: EntryId,
    occurred_at: DateTime<Utc>,
) -> LedgerEntry {
    let tokens_moved = new_total - current_total;
    LedgerEntry {
        id,
        kind,
        origin: EntryOrigin::Adjustment,
        paid_amount: 0.0,
        rate: 0.0,
        tokens_moved,
        occurred_at,
        external_ref: ADMIN_ADJUSTMENT_REF.to_string(),
        is_delivered: tokens_moved < 0.0,
        is_settled: true,
    }
}

/// [`build_adjustment`] stamped now with a fresh id.
#[cfg(feature = "std")]
pub fn new_adjustment(current_total: f64, new_total: f64, kind: PaymentKind) -> LedgerEntry {
    let now = Utc::now();
    build_adjustment(current_total, new_total, kind, EntryId::generate(now), now)
}
