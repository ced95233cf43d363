use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// `externalRef` carried by administrator corrections. Older blobs only mark
/// adjustments this way, so it is lifted to [`EntryOrigin::Adjustment`] on read.
pub const ADMIN_ADJUSTMENT_REF: &str = "ADMIN_ADJUSTMENT";

/// Entry identifier, unique within one account's ledger.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    /// Fresh id for a synthetic entry.
    /// Format: "adj:{timestamp_millis}:{random}"
    #[cfg(feature = "std")]
    pub fn generate(at: DateTime<Utc>) -> Self {
        EntryId(format!(
            "adj:{}:{:08x}",
            at.timestamp_millis(),
            rand::random::<u32>()
        ))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Currency a presale purchase was paid in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    #[serde(rename = "SOL")]
    Sol,
    #[serde(rename = "USDT")]
    Usdt,
}

impl PaymentKind {
    pub fn all() -> &'static [PaymentKind] {
        &[PaymentKind::Sol, PaymentKind::Usdt]
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PaymentKind::Sol => "SOL",
            PaymentKind::Usdt => "USDT",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PaymentKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentKind::all()
            .iter()
            .copied()
            .find(|kind| kind.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| LedgerError::UnknownKind(s.to_string()))
    }
}

/// Whether an entry records a real payment or an administrator correction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    #[default]
    Purchase,
    Adjustment,
}

/// One immutable movement of value for one account.
///
/// Corrections are new entries, never edits. The only order of record is
/// `occurred_at`; position in the stored sequence means nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub kind: PaymentKind,
    #[serde(default)]
    pub origin: EntryOrigin,
    /// Amount of `kind` paid. Zero for adjustments.
    pub paid_amount: f64,
    /// Tokens per unit of `kind` at creation. Zero for adjustments.
    pub rate: f64,
    /// Positive for a purchase or credit, negative for an administrative debit.
    pub tokens_moved: f64,
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub external_ref: String,
    /// Tokens have left the pending pool for the holder's realized balance.
    pub is_delivered: bool,
    /// The originating payment was confirmed successful.
    pub is_settled: bool,
}

impl LedgerEntry {
    /// Explicit origin, or the `externalRef` marker on entries that never
    /// went through the normalizer.
    pub fn is_adjustment(&self) -> bool {
        self.origin == EntryOrigin::Adjustment || self.external_ref == ADMIN_ADJUSTMENT_REF
    }

    /// Settled but not yet delivered.
    pub fn is_outstanding(&self) -> bool {
        self.is_settled && !self.is_delivered
    }

    /// Copy of this entry flagged delivered.
    pub fn delivered(&self) -> LedgerEntry {
        LedgerEntry {
            is_delivered: true,
            ..self.clone()
        }
    }

    /// Total replay order: `occurred_at`, then `id` to break ties.
    pub fn cmp_occurrence(&self, other: &LedgerEntry) -> Ordering {
        self.occurred_at
            .cmp(&other.occurred_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn purchase(id: &str, secs: i64) -> LedgerEntry {
        LedgerEntry {
            id: EntryId(id.into()),
            kind: PaymentKind::Sol,
            origin: EntryOrigin::Purchase,
            paid_amount: 1.5,
            rate: 2.0,
            tokens_moved: 3.0,
            occurred_at: Utc.timestamp_opt(secs, 0).unwrap(),
            external_ref: "sig-1".into(),
            is_delivered: false,
            is_settled: true,
        }
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(purchase("a", 0)).unwrap();
        assert_eq!(json["kind"], "SOL");
        assert_eq!(json["tokensMoved"], 3.0);
        assert_eq!(json["isSettled"], true);
        assert_eq!(json["origin"], "purchase");
        assert_eq!(json["occurredAt"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn origin_defaults_to_purchase() {
        let json = r#"{
            "id": "tx-1", "kind": "USDT", "paidAmount": 10, "rate": 0.5,
            "tokensMoved": 5, "occurredAt": "2025-03-01T10:00:00Z",
            "externalRef": "abc", "isDelivered": false, "isSettled": true
        }"#;
        let entry: LedgerEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.origin, EntryOrigin::Purchase);
        assert_eq!(entry.kind, PaymentKind::Usdt);
    }

    #[test]
    fn payment_kind_from_str() {
        assert_eq!("SOL".parse::<PaymentKind>().unwrap(), PaymentKind::Sol);
        assert_eq!("usdt".parse::<PaymentKind>().unwrap(), PaymentKind::Usdt);
        assert!("BTC".parse::<PaymentKind>().is_err());
    }

    #[test]
    fn delivered_copy_leaves_original_untouched() {
        let entry = purchase("a", 0);
        let copy = entry.delivered();
        assert!(copy.is_delivered);
        assert!(!entry.is_delivered);
        assert_eq!(copy.id, entry.id);
    }

    #[test]
    fn occurrence_ties_break_on_id() {
        let a = purchase("a", 5);
        let b = purchase("b", 5);
        let early = purchase("z", 1);
        assert_eq!(a.cmp_occurrence(&b), Ordering::Less);
        assert_eq!(early.cmp_occurrence(&a), Ordering::Less);
    }

    #[test]
    fn marker_alone_makes_an_adjustment() {
        let mut entry = purchase("adj", 0);
        assert!(!entry.is_adjustment());
        entry.external_ref = ADMIN_ADJUSTMENT_REF.into();
        assert_eq!(entry.origin, EntryOrigin::Purchase);
        assert!(entry.is_adjustment());
    }

    #[test]
    fn generated_ids_carry_timestamp() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let id = EntryId::generate(at);
        assert!(id.0.starts_with("adj:1700000000000:"), "got {id}");
    }
}
