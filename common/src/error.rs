use thiserror::Error;

use crate::entry::EntryId;

/// Why a stored ledger blob could not be read strictly.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("ledger blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a sequence of ledger entries, found {found}")]
    UnexpectedShape { found: &'static str },
    #[error("entry {index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },
    #[error("duplicate entry id `{id}`")]
    DuplicateId { id: EntryId },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to serialize ledger: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("unknown payment kind `{0}`")]
    UnknownKind(String),
}
