use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::{LedgerEntry, PaymentKind};
use crate::reconcile::pending_balance;

/// Aggregate view of one account's ledger, as rendered to holders and admins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// Amount paid per currency. Every known kind is present.
    pub spent: BTreeMap<PaymentKind, f64>,
    pub total_purchased: f64,
    pub total_received: f64,
    pub pending: f64,
}

impl LedgerStats {
    pub fn spent_in(&self, kind: PaymentKind) -> f64 {
        self.spent.get(&kind).copied().unwrap_or(0.0)
    }
}

/// Net tokens over settled entries, adjustments included.
pub fn total_purchased(entries: &[LedgerEntry]) -> f64 {
    entries
        .iter()
        .filter(|e| e.is_settled)
        .fold(0.0, |acc, e| acc + e.tokens_moved)
}

/// Amount paid in `kind` over settled entries.
pub fn total_spent(entries: &[LedgerEntry], kind: PaymentKind) -> f64 {
    entries
        .iter()
        .filter(|e| e.is_settled && e.kind == kind)
        .fold(0.0, |acc, e| acc + e.paid_amount)
}

/// Tokens already delivered to the holder.
pub fn total_received(entries: &[LedgerEntry]) -> f64 {
    entries
        .iter()
        .filter(|e| e.is_settled && e.is_delivered)
        .fold(0.0, |acc, e| acc + e.tokens_moved)
}

pub fn compute_stats(entries: &[LedgerEntry]) -> LedgerStats {
    let spent = PaymentKind::all()
        .iter()
        .map(|&kind| (kind, total_spent(entries, kind)))
        .collect();
    LedgerStats {
        spent,
        total_purchased: total_purchased(entries),
        total_received: total_received(entries),
        pending: pending_balance(entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryId, EntryOrigin};
    use chrono::{TimeZone, Utc};

    fn entry(id: &str, kind: PaymentKind, paid: f64, tokens: f64) -> LedgerEntry {
        LedgerEntry {
            id: EntryId(id.into()),
            kind,
            origin: EntryOrigin::Purchase,
            paid_amount: paid,
            rate: tokens / paid,
            tokens_moved: tokens,
            occurred_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            external_ref: String::new(),
            is_delivered: false,
            is_settled: true,
        }
    }

    #[test]
    fn empty_ledger_is_all_zero() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_purchased, 0.0);
        assert_eq!(stats.total_received, 0.0);
        assert_eq!(stats.pending, 0.0);
        assert_eq!(stats.spent.len(), PaymentKind::all().len());
        assert_eq!(stats.spent_in(PaymentKind::Sol), 0.0);
    }

    #[test]
    fn spent_is_split_by_kind() {
        let entries = [
            entry("a", PaymentKind::Sol, 2.0, 200.0),
            entry("b", PaymentKind::Usdt, 50.0, 100.0),
            entry("c", PaymentKind::Sol, 1.0, 100.0),
        ];
        assert_eq!(total_spent(&entries, PaymentKind::Sol), 3.0);
        assert_eq!(total_spent(&entries, PaymentKind::Usdt), 50.0);
        assert_eq!(total_purchased(&entries), 400.0);
    }

    #[test]
    fn received_counts_delivered_only() {
        let mut delivered = entry("a", PaymentKind::Sol, 1.0, 10.0);
        delivered.is_delivered = true;
        let entries = [delivered, entry("b", PaymentKind::Sol, 1.0, 7.0)];
        let stats = compute_stats(&entries);
        assert_eq!(stats.total_received, 10.0);
        assert_eq!(stats.pending, 7.0);
        assert_eq!(stats.total_purchased, 17.0);
    }

    #[test]
    fn unsettled_contributes_nothing() {
        let mut failed = entry("a", PaymentKind::Usdt, 500.0, 1000.0);
        failed.is_settled = false;
        failed.is_delivered = true;
        let stats = compute_stats(&[failed]);
        assert_eq!(stats.total_purchased, 0.0);
        assert_eq!(stats.total_received, 0.0);
        assert_eq!(stats.pending, 0.0);
        assert_eq!(stats.spent_in(PaymentKind::Usdt), 0.0);
    }

    #[test]
    fn stats_serialize_kind_keys() {
        let stats = compute_stats(&[entry("a", PaymentKind::Usdt, 5.0, 10.0)]);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["spent"]["USDT"], 5.0);
        assert_eq!(json["spent"]["SOL"], 0.0);
        assert_eq!(json["totalPurchased"], 10.0);
    }
}
