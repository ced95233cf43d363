//! Operator tool for presale token ledgers.
//!
//! Stands in for the persistence layer: each account's ledger is one JSON
//! blob under `--store`. Read commands print JSON on stdout; logs go to stderr
//! and are filtered by `RUST_LOG`.

mod commands;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use presale_common::entry::PaymentKind;
use tracing_subscriber::EnvFilter;

use crate::store::FileLedgerStore;

#[derive(Parser)]
#[command(name = "presale-ledger", about = "Inspect and correct presale token ledgers")]
struct Cli {
    /// Directory holding one ledger blob per account
    /// (default: <data dir>/presale-ledger).
    #[arg(long, env = "PRESALE_LEDGER_STORE", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Spent per currency, purchased, received and pending totals.
    Stats { account: String },
    /// How the pending balance was reached, entry by entry.
    Replay { account: String },
    /// Strictly parse the stored blob.
    Validate { account: String },
    /// Record an administrative correction.
    Adjust {
        account: String,
        /// Corrected total owed.
        #[arg(long)]
        new_total: f64,
        /// Total the correction is relative to (default: current pending balance).
        #[arg(long)]
        current_total: Option<f64>,
        /// Currency of the original payment.
        #[arg(long, default_value = "SOL")]
        kind: PaymentKind,
    },
    /// Mark every settled, undelivered entry delivered.
    Deliver { account: String },
    /// Merge a divergent copy of the account's ledger.
    Merge {
        account: String,
        #[arg(long)]
        from: PathBuf,
    },
}

fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("presale-ledger")
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = FileLedgerStore::new(cli.store.unwrap_or_else(default_store_dir));

    let output = match cli.command {
        Command::Stats { account } => commands::stats(&store, &account)?,
        Command::Replay { account } => commands::replay(&store, &account)?,
        Command::Validate { account } => commands::validate(&store, &account)?,
        Command::Adjust {
            account,
            new_total,
            current_total,
            kind,
        } => commands::adjust(&store, &account, new_total, current_total, kind)?,
        Command::Deliver { account } => commands::deliver(&store, &account)?,
        Command::Merge { account, from } => commands::merge(&store, &account, &from)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
