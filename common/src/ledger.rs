use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::adjustment::build_adjustment;
use crate::delivery::mark_delivered;
use crate::entry::{EntryId, LedgerEntry, PaymentKind};
use crate::error::{LedgerError, ParseError};
use crate::normalize::{normalize, parse_ledger, serialize_ledger, RawLedger};
use crate::reconcile::{pending_balance, replay, PendingReplay};
use crate::stats::{compute_stats, LedgerStats};

/// One account's ledger snapshot.
///
/// Every operation returns a new snapshot; the caller persists it as a whole
/// and must serialize read-modify-write per account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountLedger {
    entries: Vec<LedgerEntry>,
}

impl AccountLedger {
    pub fn new(entries: Vec<LedgerEntry>) -> Self {
        Self { entries }
    }

    /// Fail-soft read of a stored blob.
    pub fn from_raw(raw: RawLedger) -> Self {
        Self::new(normalize(raw))
    }

    /// Strict read of a stored blob.
    pub fn parse(raw: RawLedger) -> Result<Self, ParseError> {
        parse_ledger(raw).map(Self::new)
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LedgerEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> LedgerStats {
        compute_stats(&self.entries)
    }

    pub fn pending(&self) -> f64 {
        pending_balance(&self.entries)
    }

    pub fn replay(&self) -> PendingReplay {
        replay(&self.entries)
    }

    /// Append an entry. Ids must stay unique.
    pub fn with_entry(&self, entry: LedgerEntry) -> Result<Self, LedgerError> {
        if self.entries.iter().any(|e| e.id == entry.id) {
            return Err(ParseError::DuplicateId { id: entry.id }.into());
        }
        let mut entries = self.entries.clone();
        entries.push(entry);
        Ok(Self::new(entries))
    }

    /// Append the adjustment that brings the pending balance to `new_total`.
    /// Returns the new snapshot and the entry that was added.
    pub fn correct_pending_to(
        &self,
        new_total: f64,
        kind: PaymentKind,
        id: EntryId,
        occurred_at: DateTime<Utc>,
    ) -> Result<(Self, LedgerEntry), LedgerError> {
        let adjustment = build_adjustment(self.pending(), new_total, kind, id, occurred_at);
        let ledger = self.with_entry(adjustment.clone())?;
        Ok((ledger, adjustment))
    }

    #[cfg(feature = "std")]
    pub fn correct_pending_now(
        &self,
        new_total: f64,
        kind: PaymentKind,
    ) -> Result<(Self, LedgerEntry), LedgerError> {
        let now = Utc::now();
        self.correct_pending_to(new_total, kind, EntryId::generate(now), now)
    }

    pub fn mark_delivered(&self) -> Self {
        Self::new(mark_delivered(&self.entries))
    }

    pub fn to_blob(&self) -> Result<String, LedgerError> {
        serialize_ledger(&self.entries)
    }

    /// Merge a divergent snapshot of the same account with this one.
    ///
    /// - entries: append-only union keyed by id
    /// - same id, same movement: the delivered copy wins (delivery is monotonic)
    /// - same id, different movement: our copy is kept
    /// - result sorted by `(occurred_at, id)`
    pub fn merge(&self, other: &AccountLedger) -> Self {
        let mut entries = self.entries.clone();
        let mut index: HashMap<EntryId, usize> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        for entry in &other.entries {
            match index.get(&entry.id) {
                Some(&i) => {
                    let ours = &entries[i];
                    if ours.delivered() != entry.delivered() {
                        warn!(id = %entry.id, "conflicting copies of ledger entry, keeping ours");
                    } else if entry.is_delivered && !ours.is_delivered {
                        entries[i] = entry.clone();
                    }
                }
                None => {
                    index.insert(entry.id.clone(), entries.len());
                    entries.push(entry.clone());
                }
            }
        }
        entries.sort_by(|a, b| a.cmp_occurrence(b));
        Self::new(entries)
    }
}
