//! Status transitions and the reservation bookkeeping behind them.
//!
//! | transition | party gold | ledger / inventory logs | inventory aggregate |
//! |---|---|---|---|
//! | reserve (create, re-sync) | `draft_balance += pure` | provisional debit + `add` log | - |
//! | confirm | `draft_balance -= pure`, `total_grams += pure` | flipped to confirmed | `+ gross / pure / pieces` |
//! | reject | `draft_balance -= pure` | provisional rows deleted | - |
//! | revert | `total_grams -= pure`, `draft_balance += pure` | flipped back to provisional | `- gross / pure / pieces` |
//! | reverse (delete confirmed) | `total_grams -= pure` | all rows deleted | `- gross / pure / pieces` |

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use bullion_accounting::{AssetType, EntryFilter, EntryType, LedgerEntry, NewEntry, Side};
use bullion_core::{DraftId, InventoryLogId, PartyId, StockId, UserId};
use bullion_drafts::{Draft, DraftEconomics, Transition};
use bullion_inventory::{
    InventoryAction, InventoryAggregate, InventoryLog, InventoryLogFilter, Stock, StockMovement,
};

use super::{Engine, load_party, load_stock};
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, UnitOfWork};

impl<S: Store> Engine<S> {
    pub(super) fn run_transition<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &mut Draft,
        transition: Transition,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        match transition {
            Transition::Confirm => self.confirm(tx, draft, actor, now),
            Transition::Reject => self.reject(tx, draft, actor, now),
            Transition::Revert => self.revert(tx, draft, actor, now),
        }
    }

    /// Post the provisional reservation of an undecided draft. No-op unless
    /// the draft has a party, a stock item and a positive pure weight.
    pub(super) fn reserve<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &Draft,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let econ = draft.economics();
        let (Some(party_id), Some(stock_id)) = (econ.party_id, econ.stock_id) else {
            return Ok(());
        };
        if econ.pure_weight <= Decimal::ZERO {
            return Ok(());
        }

        let mut party = load_party(tx, party_id)?;
        let change = party.reserve_draft_gold(econ.pure_weight)?;
        party.touch(now);
        tx.put_party(party)?;

        self.post_entry(
            tx,
            NewEntry {
                entry_type: EntryType::StockBalance,
                party_id,
                asset: AssetType::Gold,
                currency: None,
                side: Side::Debit,
                amount: econ.pure_weight,
                previous_balance: change.previous,
                running_balance: change.running,
                is_draft: true,
                draft_id: Some(draft.id_typed()),
                stock_id: Some(stock_id),
                cost_center: Some(self.settings.draft_cost_center.clone()),
                reference: draft.voucher().reference(),
                description: Some(format!("{} reserved", draft.draft_number())),
                created_by: actor,
            },
            now,
        )?;
        tx.insert_log(inventory_log(draft, stock_id, &econ, econ.pure_weight, true, now))?;

        debug!(
            draft_number = draft.draft_number(),
            %party_id,
            pure_weight = %econ.pure_weight,
            "reservation posted"
        );
        Ok(())
    }

    /// Undo a reservation made with `econ`: release the party's draft gold and
    /// drop the draft's provisional ledger entries and inventory logs.
    pub(super) fn release<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft_id: DraftId,
        econ: &DraftEconomics,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if econ.reserves_gold() {
            if let Some(party_id) = econ.party_id {
                let mut party = load_party(tx, party_id)?;
                party.release_draft_gold(econ.pure_weight, self.settings.underflow)?;
                party.touch(now);
                tx.put_party(party)?;
            }
        }
        self.discard_provisional(tx, draft_id)
    }

    /// Delete the provisional rows owned by a draft. Idempotent.
    pub(super) fn discard_provisional<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft_id: DraftId,
    ) -> EngineResult<()> {
        let entries = tx.delete_entries(&EntryFilter::provisional(draft_id))?;
        let logs = tx.delete_logs(&InventoryLogFilter::provisional(draft_id))?;
        if entries + logs > 0 {
            debug!(%draft_id, entries, logs, "provisional rows discarded");
        }
        Ok(())
    }

    /// draft → confirmed.
    fn confirm<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &mut Draft,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let pure = draft.confirmable_pure_weight()?;
        let (party_id, stock) = self.confirmed_parties(tx, draft)?;
        let draft_id = draft.id_typed();

        let cost_center = stock.cost_center.clone();
        let flipped = tx.update_entries(&EntryFilter::provisional(draft_id), &mut |e: &mut LedgerEntry| {
            e.confirm(cost_center.as_str(), now)
        })?;

        let mut party = load_party(tx, party_id)?;
        party.release_draft_gold(pure, self.settings.underflow)?;
        let credited = party.credit_gold(pure)?;
        party.touch(now);
        tx.put_party(party)?;

        if flipped == 0 {
            warn!(
                draft_number = draft.draft_number(),
                %draft_id,
                "integrity anomaly: confirming a draft with no provisional ledger entry; posting a confirmed one"
            );
            self.post_entry(
                tx,
                NewEntry {
                    entry_type: EntryType::StockBalance,
                    party_id,
                    asset: AssetType::Gold,
                    currency: None,
                    side: Side::Credit,
                    amount: pure,
                    previous_balance: credited.previous,
                    running_balance: credited.running,
                    is_draft: false,
                    draft_id: Some(draft_id),
                    stock_id: Some(stock.id),
                    cost_center: Some(stock.cost_center.clone()),
                    reference: draft.voucher().reference(),
                    description: Some(format!("{} confirmed", draft.draft_number())),
                    created_by: actor,
                },
                now,
            )?;
        }

        let flipped_logs = tx.update_logs(&InventoryLogFilter::provisional(draft_id), &mut |l: &mut InventoryLog| {
            l.is_draft = false
        })?;
        if flipped_logs == 0 {
            warn!(
                draft_number = draft.draft_number(),
                %draft_id,
                "integrity anomaly: confirming a draft with no provisional inventory log; recording one"
            );
            tx.insert_log(inventory_log(draft, stock.id, &draft.economics(), pure, false, now))?;
        }

        let mut aggregate = tx
            .inventory(stock.id)?
            .unwrap_or_else(|| InventoryAggregate::empty(stock.id));
        aggregate.receive(&stock, &movement(draft, pure), now)?;
        tx.put_inventory(aggregate)?;

        draft.apply_transition(Transition::Confirm, actor, now)?;
        Ok(())
    }

    /// draft → rejected.
    fn reject<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &mut Draft,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        self.release(tx, draft.id_typed(), &draft.economics(), now)?;
        draft.apply_transition(Transition::Reject, actor, now)?;
        Ok(())
    }

    /// confirmed → draft.
    fn revert<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &mut Draft,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let pure = draft.confirmable_pure_weight()?;
        let (party_id, stock) = self.confirmed_parties(tx, draft)?;
        let draft_id = draft.id_typed();

        let confirmed_entries = EntryFilter {
            is_draft: Some(false),
            ..EntryFilter::for_draft(draft_id)
        };
        let placeholder = self.settings.draft_cost_center.clone();
        tx.update_entries(&confirmed_entries, &mut |e: &mut LedgerEntry| {
            e.mark_provisional(placeholder.as_str(), now)
        })?;

        let confirmed_logs = InventoryLogFilter {
            is_draft: Some(false),
            ..InventoryLogFilter::for_draft(draft_id)
        };
        tx.update_logs(&confirmed_logs, &mut |l: &mut InventoryLog| l.is_draft = true)?;

        let mut party = load_party(tx, party_id)?;
        party.debit_gold(pure, self.settings.underflow)?;
        party.reserve_draft_gold(pure)?;
        party.touch(now);
        tx.put_party(party)?;

        self.take_back_stock(tx, &stock, &movement(draft, pure), now)?;

        draft.apply_transition(Transition::Revert, actor, now)?;
        Ok(())
    }

    /// Undo a confirmation for good (confirmed draft being deleted).
    pub(super) fn reverse<U: UnitOfWork>(
        &self,
        tx: &mut U,
        draft: &Draft,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let pure = draft.confirmable_pure_weight()?;
        let (party_id, stock) = self.confirmed_parties(tx, draft)?;
        let draft_id = draft.id_typed();

        let entries = tx.delete_entries(&EntryFilter::for_draft(draft_id))?;
        let logs = tx.delete_logs(&InventoryLogFilter::for_draft(draft_id))?;

        let mut party = load_party(tx, party_id)?;
        party.debit_gold(pure, self.settings.underflow)?;
        party.touch(now);
        tx.put_party(party)?;

        self.take_back_stock(tx, &stock, &movement(draft, pure), now)?;

        debug!(draft_number = draft.draft_number(), entries, logs, "confirmation reversed");
        Ok(())
    }

    fn take_back_stock<U: UnitOfWork>(
        &self,
        tx: &mut U,
        stock: &Stock,
        movement: &StockMovement,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut aggregate = tx
            .inventory(stock.id)?
            .unwrap_or_else(|| InventoryAggregate::empty(stock.id));
        aggregate.release(stock, movement, self.settings.underflow, now)?;
        tx.put_inventory(aggregate)?;
        Ok(())
    }

    /// Party id and stock record of a draft that is (or is becoming) confirmed.
    fn confirmed_parties<U: UnitOfWork>(
        &self,
        tx: &U,
        draft: &Draft,
    ) -> EngineResult<(PartyId, Stock)> {
        let party_id = draft.party_id().ok_or_else(|| {
            EngineError::validation(format!("draft {} has no party", draft.draft_number()))
        })?;
        let stock_id = draft.stock_id().ok_or_else(|| {
            EngineError::validation(format!("draft {} has no stock item", draft.draft_number()))
        })?;
        Ok((party_id, load_stock(tx, stock_id)?))
    }
}

fn movement(draft: &Draft, pure_weight: Decimal) -> StockMovement {
    StockMovement {
        gross_weight: draft.gross_weight(),
        pure_weight,
        purity: draft.purity(),
        pieces: draft.pieces(),
    }
}

fn inventory_log(
    draft: &Draft,
    stock_id: StockId,
    econ: &DraftEconomics,
    pure_weight: Decimal,
    is_draft: bool,
    now: DateTime<Utc>,
) -> InventoryLog {
    InventoryLog {
        id: InventoryLogId::new(),
        stock_id,
        party_id: econ.party_id,
        draft_id: Some(draft.id_typed()),
        action: InventoryAction::Add,
        gross_weight: econ.gross_weight,
        pure_weight,
        purity: econ.purity,
        pieces: econ.pieces,
        is_draft,
        reference: draft.voucher().reference(),
        created_at: now,
    }
}
