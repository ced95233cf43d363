//! File-backed ledger storage: one JSON blob per account.
//!
//! Writes are whole-blob replacements guarded by an optimistic check against
//! the snapshot that was read, then written to a temp file and renamed into
//! place. The check is not a lock: a writer landing between it and the rename
//! still wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use presale_common::normalize::RawLedger;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid account id `{0}`")]
    InvalidAccount(String),
    #[error("ledger for `{account}` changed since it was read")]
    Conflict { account: String },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An account's blob as it was when loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    account: String,
    contents: Option<String>,
}

impl Snapshot {
    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn raw(&self) -> RawLedger {
        RawLedger::from(self.contents.clone())
    }
}

pub struct FileLedgerStore {
    dir: PathBuf,
}

impl FileLedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self, account: &str) -> Result<Snapshot, StoreError> {
        let path = self.path_for(account)?;
        let contents = read_optional(&path)?;
        debug!(account, found = contents.is_some(), "loaded ledger blob");
        Ok(Snapshot {
            account: account.to_string(),
            contents,
        })
    }

    /// Replace the account's blob, failing if it moved on since `snapshot`.
    pub fn replace(&self, snapshot: &Snapshot, blob: &str) -> Result<(), StoreError> {
        let path = self.path_for(&snapshot.account)?;
        if read_optional(&path)? != snapshot.contents {
            return Err(StoreError::Conflict {
                account: snapshot.account.clone(),
            });
        }
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, blob).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(account = snapshot.account.as_str(), bytes = blob.len(), "replaced ledger blob");
        Ok(())
    }

    fn path_for(&self, account: &str) -> Result<PathBuf, StoreError> {
        let valid = !account.is_empty()
            && !account.starts_with('.')
            && account
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidAccount(account.to_string()));
        }
        Ok(self.dir.join(format!("{account}.json")))
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
