//! Pending balance: tokens settled for an account but not yet delivered.
//!
//! Settled entries are replayed in `(occurred_at, id)` order. Undelivered
//! positive entries accrue. A negative adjustment (delivered by convention)
//! is subtracted and the running balance is clamped at zero on the spot, so a
//! correction only erases what was outstanding when it happened and never
//! cancels purchases made after it. Every other shape is a no-op.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::{EntryId, LedgerEntry};

/// What one settled entry did to the running balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum StepEffect {
    Accrued,
    /// `clamped` is set when the correction exceeded what was outstanding.
    Corrected { clamped: bool },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayStep {
    pub id: EntryId,
    pub occurred_at: DateTime<Utc>,
    pub tokens_moved: f64,
    #[serde(flatten)]
    pub effect: StepEffect,
    pub pending_after: f64,
}

/// Step-by-step account of how a pending balance was reached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReplay {
    pub steps: Vec<ReplayStep>,
    pub pending: f64,
}

/// Tokens owed to the account but not yet delivered. Never negative.
pub fn pending_balance(entries: &[LedgerEntry]) -> f64 {
    let pending = settled_in_order(entries)
        .into_iter()
        .fold(0.0, |mut pending, entry| {
            apply(&mut pending, entry);
            pending
        });
    pending.max(0.0)
}

/// Same computation as [`pending_balance`], keeping every step.
/// Unsettled entries are not part of the replay.
pub fn replay(entries: &[LedgerEntry]) -> PendingReplay {
    let ordered = settled_in_order(entries);
    let mut pending = 0.0;
    let mut steps = Vec::with_capacity(ordered.len());
    for entry in ordered {
        let effect = apply(&mut pending, entry);
        steps.push(ReplayStep {
            id: entry.id.clone(),
            occurred_at: entry.occurred_at,
            tokens_moved: entry.tokens_moved,
            effect,
            pending_after: pending,
        });
    }
    PendingReplay {
        steps,
        pending: pending.max(0.0),
    }
}

fn settled_in_order(entries: &[LedgerEntry]) -> Vec<&LedgerEntry> {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().filter(|e| e.is_settled).collect();
    ordered.sort_by(|a, b| a.cmp_occurrence(b));
    ordered
}

fn apply(pending: &mut f64, entry: &LedgerEntry) -> StepEffect {
    if !entry.is_delivered && entry.tokens_moved > 0.0 {
        *pending += entry.tokens_moved;
        StepEffect::Accrued
    } else if entry.is_adjustment() && entry.is_delivered && entry.tokens_moved < 0.0 {
        let corrected = *pending + entry.tokens_moved;
        let clamped = corrected.is_nan() || corrected < 0.0;
        *pending = corrected.max(0.0);
        StepEffect::Corrected { clamped }
    } else {
        StepEffect::Ignored
    }
}
