//! Persistence seam: a transactional store of parties, stocks, drafts,
//! ledger entries, inventory logs and fund transfers.
//!
//! Every engine operation runs inside one [`UnitOfWork`]. Writes become
//! visible only on [`UnitOfWork::commit`]; dropping a unit of work without
//! committing discards all of its writes.

mod in_memory;

pub use in_memory::{InMemoryStore, InMemoryUnitOfWork};

use std::sync::Arc;

use thiserror::Error;

use bullion_accounting::{AssetType, EntryFilter, FundTransfer, LedgerEntry};
use bullion_core::{DraftId, PartyId, SequencePattern, StockId};
use bullion_drafts::Draft;
use bullion_inventory::{InventoryAggregate, InventoryLog, InventoryLogFilter, Stock};
use bullion_parties::Party;

use crate::sequence::SequenceKind;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique key (draft number, transaction id) is already taken.
    #[error("unique violation on {table}: {key} already exists")]
    UniqueViolation { table: &'static str, key: String },

    /// An update targeted a row that does not exist.
    #[error("{table} row {key} does not exist")]
    MissingRow { table: &'static str, key: String },
}

/// A store that hands out units of work.
pub trait Store: Send + Sync {
    type Tx<'a>: UnitOfWork
    where
        Self: 'a;

    /// Open a unit of work. Implementations provide serializable isolation
    /// between concurrently open units.
    fn begin(&self) -> StoreResult<Self::Tx<'_>>;
}

impl<S> Store for Arc<S>
where
    S: Store,
{
    type Tx<'a>
        = S::Tx<'a>
    where
        Self: 'a;

    fn begin(&self) -> StoreResult<Self::Tx<'_>> {
        (**self).begin()
    }
}

/// One atomic unit of work over all tables.
pub trait UnitOfWork {
    /// Make every write of this unit visible at once.
    fn commit(self) -> StoreResult<()>;

    // -------------------------
    // Parties & stocks
    // -------------------------

    fn party(&self, id: PartyId) -> StoreResult<Option<Party>>;
    fn put_party(&mut self, party: Party) -> StoreResult<()>;

    fn stock(&self, id: StockId) -> StoreResult<Option<Stock>>;
    fn put_stock(&mut self, stock: Stock) -> StoreResult<()>;

    // -------------------------
    // Drafts
    // -------------------------

    fn draft(&self, id: DraftId) -> StoreResult<Option<Draft>>;
    /// Insert a new draft. Fails with `UniqueViolation` if its number is taken.
    fn insert_draft(&mut self, draft: Draft) -> StoreResult<()>;
    fn update_draft(&mut self, draft: Draft) -> StoreResult<()>;
    fn delete_draft(&mut self, id: DraftId) -> StoreResult<bool>;
    fn drafts(&self) -> StoreResult<Vec<Draft>>;

    // -------------------------
    // Sequential identifiers
    // -------------------------

    /// Highest numeric suffix among identifiers of `kind` matching `pattern`.
    fn max_sequence(&self, kind: SequenceKind, pattern: &SequencePattern) -> StoreResult<Option<u64>>;
    fn identifier_exists(&self, kind: SequenceKind, identifier: &str) -> StoreResult<bool>;

    // -------------------------
    // Ledger
    // -------------------------

    /// Append an entry. Fails with `UniqueViolation` if its transaction id is taken.
    fn insert_entry(&mut self, entry: LedgerEntry) -> StoreResult<()>;
    fn entries(&self, filter: &EntryFilter) -> StoreResult<Vec<LedgerEntry>>;
    /// Apply `f` to every matching entry; returns how many matched.
    fn update_entries(
        &mut self,
        filter: &EntryFilter,
        f: &mut dyn FnMut(&mut LedgerEntry),
    ) -> StoreResult<usize>;
    fn delete_entries(&mut self, filter: &EntryFilter) -> StoreResult<usize>;

    // -------------------------
    // Inventory
    // -------------------------

    fn insert_log(&mut self, log: InventoryLog) -> StoreResult<()>;
    fn logs(&self, filter: &InventoryLogFilter) -> StoreResult<Vec<InventoryLog>>;
    fn update_logs(
        &mut self,
        filter: &InventoryLogFilter,
        f: &mut dyn FnMut(&mut InventoryLog),
    ) -> StoreResult<usize>;
    fn delete_logs(&mut self, filter: &InventoryLogFilter) -> StoreResult<usize>;

    fn inventory(&self, stock_id: StockId) -> StoreResult<Option<InventoryAggregate>>;
    fn put_inventory(&mut self, aggregate: InventoryAggregate) -> StoreResult<()>;

    // -------------------------
    // Fund transfers
    // -------------------------

    /// Insert a transfer record. Fails with `UniqueViolation` if its
    /// transaction id is taken.
    fn insert_transfer(&mut self, transfer: FundTransfer) -> StoreResult<()>;
    fn update_transfer(&mut self, transfer: FundTransfer) -> StoreResult<()>;
    fn opening_transfer(&self, party: PartyId, asset: AssetType) -> StoreResult<Option<FundTransfer>>;
    /// All transfers, or those involving `party`.
    fn transfers(&self, party: Option<PartyId>) -> StoreResult<Vec<FundTransfer>>;
}
