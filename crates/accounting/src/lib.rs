//! Accounting domain module: the registry ledger and transfer records.
//!
//! Ledger entries are point-in-time journal records per party and asset. They
//! carry balance snapshots taken at write time and are never re-derived.

pub mod ledger;
pub mod transfer;

pub use ledger::{AssetType, EntryFilter, EntryStatus, EntryType, LedgerEntry, NewEntry, Side};
pub use transfer::{FundTransfer, ReceivingParty, SendingParty};
