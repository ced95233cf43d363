//! Turns whatever storage hands back for an account into ledger entries.
//!
//! [`parse_ledger`] is strict and reports the first problem. [`normalize`] is
//! fail-soft: a corrupt blob degrades to an empty ledger and a bad element is
//! dropped on its own, so aggregate views stay available for the account.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::entry::{EntryOrigin, LedgerEntry, ADMIN_ADJUSTMENT_REF};
use crate::error::{LedgerError, ParseError};

/// Stored form of one account's ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum RawLedger {
    /// No blob stored yet.
    Missing,
    /// Serialized text as persisted.
    Serialized(String),
    /// Already-decoded sequence whose elements are not yet validated.
    Structured(Vec<Value>),
    /// Typed entries, trusted as-is.
    Entries(Vec<LedgerEntry>),
    /// Any other decoded shape.
    Other(Value),
}

impl RawLedger {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => RawLedger::Missing,
            Value::String(text) => RawLedger::Serialized(text),
            Value::Array(values) => RawLedger::Structured(values),
            other => RawLedger::Other(other),
        }
    }
}

impl From<Option<String>> for RawLedger {
    fn from(blob: Option<String>) -> Self {
        match blob {
            Some(text) => RawLedger::Serialized(text),
            None => RawLedger::Missing,
        }
    }
}

impl From<Vec<LedgerEntry>> for RawLedger {
    fn from(entries: Vec<LedgerEntry>) -> Self {
        RawLedger::Entries(entries)
    }
}

enum Elements {
    Typed(Vec<LedgerEntry>),
    Raw(Vec<Value>),
}

/// Strictly decode a stored ledger.
pub fn parse_ledger(raw: RawLedger) -> Result<Vec<LedgerEntry>, ParseError> {
    let values = match elements(raw)? {
        Elements::Typed(entries) => return Ok(entries),
        Elements::Raw(values) => values,
    };
    let mut seen = HashSet::with_capacity(values.len());
    let mut entries = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let entry = decode_entry(index, value)?;
        if !seen.insert(entry.id.clone()) {
            return Err(ParseError::DuplicateId { id: entry.id });
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Decode a stored ledger, never failing.
pub fn normalize(raw: RawLedger) -> Vec<LedgerEntry> {
    let values = match elements(raw) {
        Ok(Elements::Typed(entries)) => return entries,
        Ok(Elements::Raw(values)) => values,
        Err(e) => {
            warn!(error = %e, "discarding unreadable ledger blob");
            return Vec::new();
        }
    };
    let mut seen = HashSet::with_capacity(values.len());
    let mut entries = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match decode_entry(index, value) {
            Ok(entry) if seen.insert(entry.id.clone()) => entries.push(entry),
            Ok(entry) => {
                warn!(index, id = %entry.id, "dropping ledger entry with duplicate id");
            }
            Err(e) => warn!(error = %e, "dropping invalid ledger entry"),
        }
    }
    entries
}

/// Serialized form written back to storage.
pub fn serialize_ledger(entries: &[LedgerEntry]) -> Result<String, LedgerError> {
    serde_json::to_string(entries).map_err(LedgerError::Serialize)
}

fn elements(raw: RawLedger) -> Result<Elements, ParseError> {
    match raw {
        RawLedger::Missing => Ok(Elements::Raw(Vec::new())),
        RawLedger::Entries(entries) => Ok(Elements::Typed(entries)),
        RawLedger::Structured(values) => Ok(Elements::Raw(values)),
        RawLedger::Serialized(text) => {
            if text.trim().is_empty() {
                return Ok(Elements::Raw(Vec::new()));
            }
            sequence(serde_json::from_str(&text)?)
        }
        RawLedger::Other(value) => sequence(value),
    }
}

fn sequence(value: Value) -> Result<Elements, ParseError> {
    match value {
        Value::Null => Ok(Elements::Raw(Vec::new())),
        Value::Array(values) => Ok(Elements::Raw(values)),
        other => Err(ParseError::UnexpectedShape {
            found: shape_name(&other),
        }),
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn decode_entry(index: usize, value: Value) -> Result<LedgerEntry, ParseError> {
    let mut entry: LedgerEntry =
        serde_json::from_value(value).map_err(|e| ParseError::InvalidEntry {
            index,
            reason: e.to_string(),
        })?;
    let finite = [entry.paid_amount, entry.rate, entry.tokens_moved]
        .iter()
        .all(|n| n.is_finite());
    if !finite {
        return Err(ParseError::InvalidEntry {
            index,
            reason: "amounts must be finite".into(),
        });
    }
    if entry.paid_amount < 0.0 {
        return Err(ParseError::InvalidEntry {
            index,
            reason: format!("negative paid amount {}", entry.paid_amount),
        });
    }
    if entry.external_ref == ADMIN_ADJUSTMENT_REF {
        entry.origin = EntryOrigin::Adjustment;
    }
    Ok(entry)
}
