use std::fs;
use std::path::Path;

use anyhow::{ensure, Context};
use presale_common::adjustment::new_adjustment;
use presale_common::delivery::outstanding_count;
use presale_common::entry::PaymentKind;
use presale_common::ledger::AccountLedger;
use presale_common::normalize::RawLedger;
use serde_json::{json, Value};
use tracing::info;

use crate::store::{FileLedgerStore, Snapshot};

/// Aggregate view of the account.
pub fn stats(store: &FileLedgerStore, account: &str) -> anyhow::Result<Value> {
    let ledger = AccountLedger::from_raw(store.load(account)?.raw());
    Ok(serde_json::to_value(ledger.stats())?)
}

/// Step-by-step pending balance.
pub fn replay(store: &FileLedgerStore, account: &str) -> anyhow::Result<Value> {
    let ledger = AccountLedger::from_raw(store.load(account)?.raw());
    Ok(serde_json::to_value(ledger.replay())?)
}

/// Strict read; errors if any entry would be dropped by the fail-soft path.
pub fn validate(store: &FileLedgerStore, account: &str) -> anyhow::Result<Value> {
    let ledger = AccountLedger::parse(store.load(account)?.raw())
        .with_context(|| format!("ledger for `{account}` is invalid"))?;
    Ok(json!({ "account": account, "entries": ledger.len(), "valid": true }))
}

/// Append an adjustment bringing the pending balance (or `current_total`
/// when given) to `new_total`.
pub fn adjust(
    store: &FileLedgerStore,
    account: &str,
    new_total: f64,
    current_total: Option<f64>,
    kind: PaymentKind,
) -> anyhow::Result<Value> {
    ensure!(new_total.is_finite(), "--new-total must be finite");
    let snapshot = store.load(account)?;
    let ledger = load_for_write(&snapshot)?;
    let (updated, entry) = match current_total {
        Some(current) => {
            ensure!(current.is_finite(), "--current-total must be finite");
            let entry = new_adjustment(current, new_total, kind);
            (ledger.with_entry(entry.clone())?, entry)
        }
        None => ledger.correct_pending_now(new_total, kind)?,
    };
    store.replace(&snapshot, &updated.to_blob()?)?;
    info!(
        account,
        id = %entry.id,
        tokens_moved = entry.tokens_moved,
        "recorded ledger adjustment"
    );
    Ok(json!({ "adjustment": entry, "stats": updated.stats() }))
}

/// Flag every outstanding entry delivered.
pub fn deliver(store: &FileLedgerStore, account: &str) -> anyhow::Result<Value> {
    let snapshot = store.load(account)?;
    let ledger = load_for_write(&snapshot)?;
    let delivered = outstanding_count(ledger.entries());
    let updated = ledger.mark_delivered();
    store.replace(&snapshot, &updated.to_blob()?)?;
    info!(account, delivered, "marked outstanding entries delivered");
    Ok(json!({ "delivered": delivered, "stats": updated.stats() }))
}

/// Strict read before a write-back: anything the fail-soft reader would drop
/// must stop the write instead of being erased from storage.
fn load_for_write(snapshot: &Snapshot) -> anyhow::Result<AccountLedger> {
    AccountLedger::parse(snapshot.raw()).with_context(|| {
        format!(
            "ledger for `{}` is invalid, refusing to rewrite it",
            snapshot.account()
        )
    })
}

/// Fold a divergent copy of the account's blob into the stored one.
pub fn merge(store: &FileLedgerStore, account: &str, from: &Path) -> anyhow::Result<Value> {
    let text = fs::read_to_string(from)
        .with_context(|| format!("failed to read {}", from.display()))?;
    let other = AccountLedger::parse(RawLedger::Serialized(text))
        .with_context(|| format!("{} is not a valid ledger", from.display()))?;
    let snapshot = store.load(account)?;
    let ours = load_for_write(&snapshot)?;
    let before = ours.len();
    let ledger = ours.merge(&other);
    let added = ledger.len() - before;
    store.replace(&snapshot, &ledger.to_blob()?)?;
    info!(account, added, "merged ledger snapshot");
    Ok(json!({ "added": added, "stats": ledger.stats() }))
}
