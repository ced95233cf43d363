pub mod adjustment;
pub mod delivery;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod normalize;
pub mod reconcile;
pub mod stats;
