//! Draft lifecycle and transfer engine.
//!
//! The engine is the only writer of party balances, ledger entries, inventory
//! logs and inventory aggregates. Each public operation:
//!
//! ```text
//! begin unit of work
//!   ↓
//! load + validate referenced parties / stock / draft
//!   ↓
//! apply domain rules (crates `bullion-drafts`, `bullion-parties`, ...)
//!   ↓
//! write every affected row through the same unit of work
//!   ↓
//! commit (any error before this point rolls everything back)
//! ```
//!
//! Operations are split by concern: [`drafts`] (create / update / delete /
//! queries), [`lifecycle`] (confirm / reject / revert / reverse and
//! reservation bookkeeping) and [`transfers`].

mod drafts;
mod lifecycle;
mod transfers;

pub use drafts::{DraftQuery, Page};
pub use transfers::{OpeningBalance, TransferRequest};

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use bullion_accounting::{EntryFilter, FundTransfer, LedgerEntry, NewEntry};
use bullion_core::{DraftId, PartyId, StockId, UnderflowPolicy};
use bullion_drafts::Draft;
use bullion_inventory::{InventoryAggregate, InventoryLog, InventoryLogFilter, Stock};
use bullion_parties::{Party, PartyKind};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::sequence::{SequenceGenerator, SequenceKind, with_sequence_retry};
use crate::store::{Store, UnitOfWork};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    underflow: UnderflowPolicy,
    default_currency: String,
    draft_cost_center: String,
}

/// Engine over a transactional [`Store`]. `Send + Sync` whenever the store is;
/// share it behind an `Arc`.
#[derive(Debug)]
pub struct Engine<S> {
    store: S,
    sequences: SequenceGenerator,
    settings: Settings,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S, config: &EngineConfig) -> EngineResult<Self> {
        config
            .validate()
            .map_err(|e| EngineError::validation(e.to_string()))?;
        Ok(Self {
            store,
            sequences: SequenceGenerator::from_config(config)?,
            settings: Settings {
                underflow: config.underflow_policy,
                default_currency: config.default_currency.trim().to_ascii_uppercase(),
                draft_cost_center: config.draft_cost_center.clone(),
            },
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sequences(&self) -> &SequenceGenerator {
        &self.sequences
    }

    // -------------------------
    // Master data (collaborator seeding)
    // -------------------------

    #[instrument(skip(self))]
    pub fn register_party(&self, kind: PartyKind, name: &str) -> EngineResult<Party> {
        let party = Party::register(PartyId::new(), kind, name, Utc::now())?;
        let mut tx = self.store.begin()?;
        tx.put_party(party.clone())?;
        tx.commit()?;
        info!(party_id = %party.id_typed(), "party registered");
        Ok(party)
    }

    /// Insert or replace a stock master record.
    #[instrument(skip(self, stock), fields(stock_id = %stock.id, code = %stock.code))]
    pub fn register_stock(&self, stock: Stock) -> EngineResult<Stock> {
        stock.validate()?;
        let mut tx = self.store.begin()?;
        tx.put_stock(stock.clone())?;
        tx.commit()?;
        info!("stock registered");
        Ok(stock)
    }

    // -------------------------
    // Queries
    // -------------------------

    pub fn party(&self, id: PartyId) -> EngineResult<Party> {
        let tx = self.store.begin()?;
        load_party(&tx, id)
    }

    pub fn stock(&self, id: StockId) -> EngineResult<Stock> {
        let tx = self.store.begin()?;
        load_stock(&tx, id)
    }

    /// Running totals of a stock item; empty if nothing was confirmed yet.
    pub fn inventory_for(&self, stock_id: StockId) -> EngineResult<InventoryAggregate> {
        let tx = self.store.begin()?;
        load_stock(&tx, stock_id)?;
        Ok(tx
            .inventory(stock_id)?
            .unwrap_or_else(|| InventoryAggregate::empty(stock_id)))
    }

    /// Matching ledger entries in posting order.
    pub fn ledger_entries(&self, filter: &EntryFilter) -> EngineResult<Vec<LedgerEntry>> {
        let tx = self.store.begin()?;
        Ok(tx.entries(filter)?)
    }

    pub fn inventory_logs(&self, filter: &InventoryLogFilter) -> EngineResult<Vec<InventoryLog>> {
        let tx = self.store.begin()?;
        Ok(tx.logs(filter)?)
    }

    pub fn fund_transfers(&self, party: Option<PartyId>) -> EngineResult<Vec<FundTransfer>> {
        let tx = self.store.begin()?;
        Ok(tx.transfers(party)?)
    }

    // -------------------------
    // Shared helpers
    // -------------------------

    /// Append a ledger entry under a freshly drawn transaction id.
    fn post_entry<U: UnitOfWork>(
        &self,
        tx: &mut U,
        entry: NewEntry,
        now: DateTime<Utc>,
    ) -> EngineResult<LedgerEntry> {
        with_sequence_retry(self.sequences.max_attempts(), SequenceKind::Ledger, |_| {
            let transaction_id = self.sequences.next(&*tx, SequenceKind::Ledger)?;
            let row = LedgerEntry::new(transaction_id, entry.clone(), now)?;
            tx.insert_entry(row.clone())?;
            Ok(row)
        })
    }
}

fn load_party<U: UnitOfWork>(tx: &U, id: PartyId) -> EngineResult<Party> {
    tx.party(id)?
        .ok_or_else(|| EngineError::not_found(format!("party {id}")))
}

fn load_stock<U: UnitOfWork>(tx: &U, id: StockId) -> EngineResult<Stock> {
    tx.stock(id)?
        .ok_or_else(|| EngineError::not_found(format!("stock {id}")))
}

fn load_draft<U: UnitOfWork>(tx: &U, id: DraftId) -> EngineResult<Draft> {
    tx.draft(id)?
        .ok_or_else(|| EngineError::not_found(format!("draft {id}")))
}
