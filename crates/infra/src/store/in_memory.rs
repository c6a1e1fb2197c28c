use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bullion_accounting::{AssetType, EntryFilter, FundTransfer, LedgerEntry};
use bullion_core::{DraftId, PartyId, SequencePattern, StockId};
use bullion_drafts::Draft;
use bullion_inventory::{InventoryAggregate, InventoryLog, InventoryLogFilter, Stock};
use bullion_parties::Party;

use super::{Store, StoreError, StoreResult, UnitOfWork};
use crate::sequence::SequenceKind;

#[derive(Debug, Default, Clone)]
struct Tables {
    parties: HashMap<PartyId, Party>,
    stocks: HashMap<StockId, Stock>,
    drafts: BTreeMap<DraftId, Draft>,
    ledger: Vec<LedgerEntry>,
    logs: Vec<InventoryLog>,
    inventory: HashMap<StockId, InventoryAggregate>,
    transfers: Vec<FundTransfer>,
}

impl Tables {
    fn identifiers(&self, kind: SequenceKind) -> Box<dyn Iterator<Item = &str> + '_> {
        match kind {
            SequenceKind::Draft => Box::new(self.drafts.values().map(|d| d.draft_number())),
            SequenceKind::Ledger => Box::new(self.ledger.iter().map(|e| e.transaction_id.as_str())),
            SequenceKind::Transfer => {
                Box::new(self.transfers.iter().map(|t| t.transaction_id.as_str()))
            }
        }
    }
}

/// In-memory transactional store.
///
/// Intended for tests/dev. A unit of work holds the store lock for its whole
/// lifetime, so units are serialized. Writes go to a copy of the tables that
/// replaces the live tables on commit.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    type Tx<'a> = InMemoryUnitOfWork<'a>;

    fn begin(&self) -> StoreResult<Self::Tx<'_>> {
        // Live tables are only replaced wholesale on commit, so a unit of work
        // that panicked never leaves them half-written.
        let guard = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(InMemoryUnitOfWork {
            guard,
            working: None,
        })
    }
}

/// Unit of work over [`InMemoryStore`]. Copy-on-first-write: read-only units
/// never clone the tables.
#[derive(Debug)]
pub struct InMemoryUnitOfWork<'a> {
    guard: MutexGuard<'a, Tables>,
    working: Option<Tables>,
}

impl InMemoryUnitOfWork<'_> {
    fn tables(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let live = &self.guard;
        self.working.get_or_insert_with(|| Tables::clone(&**live))
    }
}

impl UnitOfWork for InMemoryUnitOfWork<'_> {
    fn commit(self) -> StoreResult<()> {
        let InMemoryUnitOfWork { mut guard, working } = self;
        if let Some(tables) = working {
            *guard = tables;
        }
        Ok(())
    }

    fn party(&self, id: PartyId) -> StoreResult<Option<Party>> {
        Ok(self.tables().parties.get(&id).cloned())
    }

    fn put_party(&mut self, party: Party) -> StoreResult<()> {
        self.tables_mut().parties.insert(party.id_typed(), party);
        Ok(())
    }

    fn stock(&self, id: StockId) -> StoreResult<Option<Stock>> {
        Ok(self.tables().stocks.get(&id).cloned())
    }

    fn put_stock(&mut self, stock: Stock) -> StoreResult<()> {
        self.tables_mut().stocks.insert(stock.id, stock);
        Ok(())
    }

    fn draft(&self, id: DraftId) -> StoreResult<Option<Draft>> {
        Ok(self.tables().drafts.get(&id).cloned())
    }

    fn insert_draft(&mut self, draft: Draft) -> StoreResult<()> {
        if self.identifier_exists(SequenceKind::Draft, draft.draft_number())? {
            return Err(StoreError::UniqueViolation {
                table: "drafts",
                key: draft.draft_number().to_string(),
            });
        }
        self.tables_mut().drafts.insert(draft.id_typed(), draft);
        Ok(())
    }

    fn update_draft(&mut self, draft: Draft) -> StoreResult<()> {
        let id = draft.id_typed();
        match self.tables_mut().drafts.get_mut(&id) {
            Some(row) => {
                *row = draft;
                Ok(())
            }
            None => Err(StoreError::MissingRow {
                table: "drafts",
                key: id.to_string(),
            }),
        }
    }

    fn delete_draft(&mut self, id: DraftId) -> StoreResult<bool> {
        if !self.tables().drafts.contains_key(&id) {
            return Ok(false);
        }
        Ok(self.tables_mut().drafts.remove(&id).is_some())
    }

    fn drafts(&self) -> StoreResult<Vec<Draft>> {
        Ok(self.tables().drafts.values().cloned().collect())
    }

    fn max_sequence(&self, kind: SequenceKind, pattern: &SequencePattern) -> StoreResult<Option<u64>> {
        Ok(self
            .tables()
            .identifiers(kind)
            .filter_map(|id| pattern.parse(id))
            .max())
    }

    fn identifier_exists(&self, kind: SequenceKind, identifier: &str) -> StoreResult<bool> {
        Ok(self.tables().identifiers(kind).any(|id| id == identifier))
    }

    fn insert_entry(&mut self, entry: LedgerEntry) -> StoreResult<()> {
        if self.identifier_exists(SequenceKind::Ledger, &entry.transaction_id)? {
            return Err(StoreError::UniqueViolation {
                table: "ledger",
                key: entry.transaction_id,
            });
        }
        self.tables_mut().ledger.push(entry);
        Ok(())
    }

    fn entries(&self, filter: &EntryFilter) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self
            .tables()
            .ledger
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    fn update_entries(
        &mut self,
        filter: &EntryFilter,
        f: &mut dyn FnMut(&mut LedgerEntry),
    ) -> StoreResult<usize> {
        if !self.tables().ledger.iter().any(|e| filter.matches(e)) {
            return Ok(0);
        }
        let mut n = 0;
        for entry in self.tables_mut().ledger.iter_mut().filter(|e| filter.matches(e)) {
            f(entry);
            n += 1;
        }
        Ok(n)
    }

    fn delete_entries(&mut self, filter: &EntryFilter) -> StoreResult<usize> {
        let matching = self.tables().ledger.iter().filter(|e| filter.matches(e)).count();
        if matching > 0 {
            self.tables_mut().ledger.retain(|e| !filter.matches(e));
        }
        Ok(matching)
    }

    fn insert_log(&mut self, log: InventoryLog) -> StoreResult<()> {
        self.tables_mut().logs.push(log);
        Ok(())
    }

    fn logs(&self, filter: &InventoryLogFilter) -> StoreResult<Vec<InventoryLog>> {
        Ok(self
            .tables()
            .logs
            .iter()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect())
    }

    fn update_logs(
        &mut self,
        filter: &InventoryLogFilter,
        f: &mut dyn FnMut(&mut InventoryLog),
    ) -> StoreResult<usize> {
        if !self.tables().logs.iter().any(|l| filter.matches(l)) {
            return Ok(0);
        }
        let mut n = 0;
        for log in self.tables_mut().logs.iter_mut().filter(|l| filter.matches(l)) {
            f(log);
            n += 1;
        }
        Ok(n)
    }

    fn delete_logs(&mut self, filter: &InventoryLogFilter) -> StoreResult<usize> {
        let matching = self.tables().logs.iter().filter(|l| filter.matches(l)).count();
        if matching > 0 {
            self.tables_mut().logs.retain(|l| !filter.matches(l));
        }
        Ok(matching)
    }

    fn inventory(&self, stock_id: StockId) -> StoreResult<Option<InventoryAggregate>> {
        Ok(self.tables().inventory.get(&stock_id).cloned())
    }

    fn put_inventory(&mut self, aggregate: InventoryAggregate) -> StoreResult<()> {
        self.tables_mut()
            .inventory
            .insert(aggregate.stock_id, aggregate);
        Ok(())
    }

    fn insert_transfer(&mut self, transfer: FundTransfer) -> StoreResult<()> {
        if self.identifier_exists(SequenceKind::Transfer, &transfer.transaction_id)? {
            return Err(StoreError::UniqueViolation {
                table: "fund_transfers",
                key: transfer.transaction_id,
            });
        }
        self.tables_mut().transfers.push(transfer);
        Ok(())
    }

    fn update_transfer(&mut self, transfer: FundTransfer) -> StoreResult<()> {
        let id = transfer.id;
        match self
            .tables_mut()
            .transfers
            .iter_mut()
            .find(|t| t.id == id)
        {
            Some(row) => {
                *row = transfer;
                Ok(())
            }
            None => Err(StoreError::MissingRow {
                table: "fund_transfers",
                key: id.to_string(),
            }),
        }
    }

    fn opening_transfer(&self, party: PartyId, asset: AssetType) -> StoreResult<Option<FundTransfer>> {
        Ok(self
            .tables()
            .transfers
            .iter()
            .find(|t| t.is_opening_for(party, asset))
            .cloned())
    }

    fn transfers(&self, party: Option<PartyId>) -> StoreResult<Vec<FundTransfer>> {
        Ok(self
            .tables()
            .transfers
            .iter()
            .filter(|t| party.is_none_or(|p| t.involves(p)))
            .cloned()
            .collect())
    }
}
