use tracing::debug;

use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::normalize::serialize_ledger;

/// New snapshot with every settled, undelivered entry replaced by a delivered
/// copy. Order and length are unchanged.
pub fn mark_delivered(entries: &[LedgerEntry]) -> Vec<LedgerEntry> {
    let mut marked = 0usize;
    let out: Vec<LedgerEntry> = entries
        .iter()
        .map(|entry| {
            if entry.is_outstanding() {
                marked += 1;
                entry.delivered()
            } else {
                entry.clone()
            }
        })
        .collect();
    debug!(marked, total = entries.len(), "marked ledger entries delivered");
    out
}

/// [`mark_delivered`] in the serialized form written back to storage.
pub fn mark_delivered_blob(entries: &[LedgerEntry]) -> Result<String, LedgerError> {
    serialize_ledger(&mark_delivered(entries))
}

/// Number of entries [`mark_delivered`] would flip.
pub fn outstanding_count(entries: &[LedgerEntry]) -> usize {
    entries.iter().filter(|e| e.is_outstanding()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryId, EntryOrigin, PaymentKind};
    use crate::normalize::{parse_ledger, RawLedger};
    use chrono::{Duration, TimeZone, Utc};

    fn entry(id: &str, settled: bool, delivered: bool) -> LedgerEntry {
        LedgerEntry {
            id: EntryId(id.into()),
            kind: PaymentKind::Sol,
            origin: EntryOrigin::Purchase,
            paid_amount: 1.0,
            rate: 100.0,
            tokens_moved: 100.0,
            occurred_at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
                + Duration::minutes(id.len() as i64),
            external_ref: "sig".into(),
            is_delivered: delivered,
            is_settled: settled,
        }
    }

    #[test]
    fn only_outstanding_entries_flip() {
        let entries = vec![
            entry("a", true, false),
            entry("bb", false, false),
            entry("ccc", true, true),
        ];
        assert_eq!(outstanding_count(&entries), 1);
        let marked = mark_delivered(&entries);
        assert_eq!(marked.len(), 3);
        assert!(marked[0].is_delivered);
        assert!(!marked[1].is_delivered, "unsettled entries stay undelivered");
        assert_eq!(marked[1], entries[1]);
        assert_eq!(marked[2], entries[2]);
    }

    #[test]
    fn order_is_preserved() {
        let entries = vec![entry("ccc", true, false), entry("a", true, false)];
        let marked = mark_delivered(&entries);
        assert_eq!(marked[0].id, EntryId("ccc".into()));
        assert_eq!(marked[1].id, EntryId("a".into()));
    }

    #[test]
    fn blob_reads_back_delivered() {
        let entries = vec![entry("a", true, false), entry("bb", true, false)];
        let blob = mark_delivered_blob(&entries).unwrap();
        let read = parse_ledger(RawLedger::Serialized(blob)).unwrap();
        assert!(read.iter().all(|e| e.is_delivered));
        assert_eq!(outstanding_count(&read), 0);
    }
}
