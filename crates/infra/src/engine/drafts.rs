use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use bullion_core::{DraftId, PartyId, UserId};
use bullion_drafts::{Draft, DraftPatch, DraftStatus, NewDraft, Transition};

use super::{Engine, load_draft, load_party, load_stock};
use crate::error::{EngineError, EngineResult};
use crate::sequence::{SequenceKind, with_sequence_retry};
use crate::store::{Store, UnitOfWork};

/// Draft listing criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftQuery {
    /// Case-insensitive substring over draft number, party, stock,
    /// certificate and voucher fields.
    pub search: Option<String>,
    pub status: Option<DraftStatus>,
    pub party_id: Option<PartyId>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl DraftQuery {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 200;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<S: Store> Engine<S> {
    /// Create a draft and, if it reserves gold, post its provisional entries.
    #[instrument(skip(self, input), fields(party_id = ?input.party_id, stock_id = ?input.stock_id))]
    pub fn create_draft(&self, input: NewDraft, actor: Option<UserId>) -> EngineResult<Draft> {
        let mut tx = self.store.begin()?;
        let draft = self.create_draft_in(&mut tx, input, actor, Utc::now())?;
        tx.commit()?;
        info!(
            draft_number = draft.draft_number(),
            status = %draft.status(),
            pure_weight = %draft.pure_weight(),
            "draft created"
        );
        Ok(draft)
    }

    fn create_draft_in<U: UnitOfWork>(
        &self,
        tx: &mut U,
        input: NewDraft,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<Draft> {
        if let Some(party_id) = input.party_id {
            load_party(tx, party_id)?;
        }
        let stock_karat = match input.stock_id {
            Some(stock_id) => load_stock(tx, stock_id)?.karat,
            None => None,
        };
        let confirm_now = input.status == Some(DraftStatus::Confirmed);
        let id = DraftId::new();

        let mut draft = match input.draft_number.clone() {
            Some(number) => {
                let pattern = self.sequences.pattern(SequenceKind::Draft);
                if !pattern.matches(&number) {
                    return Err(EngineError::validation(format!(
                        "draft number {number:?} does not match {pattern}"
                    )));
                }
                let draft = Draft::create(id, number, input, stock_karat.as_deref(), actor, now)?;
                tx.insert_draft(draft.clone())?;
                draft
            }
            None => with_sequence_retry(self.sequences.max_attempts(), SequenceKind::Draft, |_| {
                let number = self.sequences.next(&*tx, SequenceKind::Draft)?;
                let draft =
                    Draft::create(id, number, input.clone(), stock_karat.as_deref(), actor, now)?;
                tx.insert_draft(draft.clone())?;
                Ok(draft)
            })?,
        };

        if draft.holds_reservation() {
            self.reserve(tx, &draft, actor, now)?;
        }
        if confirm_now {
            self.run_transition(tx, &mut draft, Transition::Confirm, actor, now)?;
            tx.update_draft(draft.clone())?;
        }
        Ok(draft)
    }

    /// Apply field updates, re-sync the reservation, then run the status
    /// transition (if the requested status change is one).
    #[instrument(skip(self, patch), fields(requested_status = ?patch.status))]
    pub fn update_draft(
        &self,
        id: DraftId,
        patch: DraftPatch,
        actor: Option<UserId>,
    ) -> EngineResult<Draft> {
        let now = Utc::now();
        let mut tx = self.store.begin()?;
        let mut draft = load_draft(&tx, id)?;

        if let Some(party_id) = patch.party_id {
            load_party(&tx, party_id)?;
        }
        let stock_karat = match patch.stock_id {
            Some(stock_id) => load_stock(&tx, stock_id)?.karat,
            None => None,
        };

        let held_reservation = draft.holds_reservation();
        let outcome = draft.apply_patch(&patch, stock_karat.as_deref(), actor, now)?;

        if draft.status() == DraftStatus::Draft && outcome.economics_changed {
            if held_reservation {
                self.release(&mut tx, id, &outcome.before, now)?;
            }
            if draft.holds_reservation() {
                self.reserve(&mut tx, &draft, actor, now)?;
            }
        }

        match outcome.transition {
            Some(transition) => {
                self.run_transition(&mut tx, &mut draft, transition, actor, now)?;
            }
            None => {
                if let Some(requested) = outcome.ignored_status {
                    debug!(
                        draft_number = draft.draft_number(),
                        from = %draft.status(),
                        to = %requested,
                        "status change is not a transition; status left unchanged"
                    );
                }
            }
        }

        tx.update_draft(draft.clone())?;
        tx.commit()?;
        info!(
            draft_number = draft.draft_number(),
            status = %draft.status(),
            transition = ?outcome.transition,
            "draft updated"
        );
        Ok(draft)
    }

    /// Delete a draft after undoing whatever its status put in place:
    /// reservation (draft), leftovers (rejected) or confirmation (confirmed).
    #[instrument(skip(self))]
    pub fn delete_draft(&self, id: DraftId, actor: Option<UserId>) -> EngineResult<Draft> {
        let now = Utc::now();
        let mut tx = self.store.begin()?;
        let mut draft = load_draft(&tx, id)?;
        let status = draft.status();

        match status {
            DraftStatus::Draft => {
                self.run_transition(&mut tx, &mut draft, Transition::Reject, actor, now)?
            }
            DraftStatus::Rejected => self.discard_provisional(&mut tx, id)?,
            DraftStatus::Confirmed => self.reverse(&mut tx, &draft, now)?,
        }

        tx.delete_draft(id)?;
        tx.commit()?;
        info!(draft_number = draft.draft_number(), %status, "draft deleted");
        Ok(draft)
    }

    pub fn get_draft(&self, id: DraftId) -> EngineResult<Draft> {
        let tx = self.store.begin()?;
        load_draft(&tx, id)
    }

    /// Drafts matching `query`, newest first.
    pub fn list_drafts(&self, query: &DraftQuery) -> EngineResult<Page<Draft>> {
        let tx = self.store.begin()?;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut matching = Vec::new();
        for draft in tx.drafts()? {
            if query.status.is_some_and(|s| draft.status() != s)
                || query.party_id.is_some_and(|p| draft.party_id() != Some(p))
            {
                continue;
            }
            if let Some(needle) = &needle {
                if !self.search_hit(&tx, &draft, needle)? {
                    continue;
                }
            }
            matching.push(draft);
        }

        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });

        let limit = query.effective_limit();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(query.offset)
            .take(limit)
            .collect();
        Ok(Page {
            items,
            total,
            limit,
            offset: query.offset,
        })
    }

    fn search_hit<U: UnitOfWork>(&self, tx: &U, draft: &Draft, needle: &str) -> EngineResult<bool> {
        if draft.matches_search(needle) {
            return Ok(true);
        }
        if let Some(party_id) = draft.party_id() {
            if let Some(party) = tx.party(party_id)? {
                if party.name().to_lowercase().contains(needle) {
                    return Ok(true);
                }
            }
        }
        if let Some(stock_id) = draft.stock_id() {
            if let Some(stock) = tx.stock(stock_id)? {
                if stock.code.to_lowercase().contains(needle)
                    || stock.name.to_lowercase().contains(needle)
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
