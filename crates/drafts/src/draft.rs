use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bullion_core::{
    AggregateRoot, DomainError, DomainResult, DraftId, ExpectedVersion, PartyId, Purity, StockId,
    UserId,
};

use crate::transition::{DraftStatus, Transition};

/// Voucher metadata attached to a draft and copied onto its ledger entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub voucher_type: Option<String>,
    pub voucher_number: Option<String>,
    pub voucher_date: Option<NaiveDate>,
}

impl Voucher {
    /// Code used as the `reference` of ledger and inventory entries.
    pub fn reference(&self) -> Option<String> {
        match (&self.voucher_type, &self.voucher_number) {
            (Some(t), Some(n)) => Some(format!("{t}-{n}")),
            (None, Some(n)) => Some(n.clone()),
            (Some(t), None) => Some(t.clone()),
            (None, None) => None,
        }
    }
}

/// The fields of a draft that drive balance, ledger and inventory effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftEconomics {
    pub party_id: Option<PartyId>,
    pub stock_id: Option<StockId>,
    pub gross_weight: Decimal,
    pub purity: Purity,
    pub pure_weight: Decimal,
    pub pieces: Option<u32>,
}

impl DraftEconomics {
    /// Whether an undecided draft with these values holds a gold reservation.
    pub fn reserves_gold(&self) -> bool {
        self.party_id.is_some() && self.stock_id.is_some() && self.pure_weight > Decimal::ZERO
    }
}

/// Input for creating a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDraft {
    pub draft_number: Option<String>,
    pub party_id: Option<PartyId>,
    pub stock_id: Option<StockId>,
    pub gross_weight: Option<Decimal>,
    /// Fraction `[0, 1]` or percentage `(1, 100]`.
    pub purity: Option<Decimal>,
    pub karat: Option<String>,
    pub pieces: Option<u32>,
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub voucher: Voucher,
    pub description: Option<String>,
    pub status: Option<DraftStatus>,
}

/// Partial update of a draft. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPatch {
    pub party_id: Option<PartyId>,
    pub stock_id: Option<StockId>,
    pub gross_weight: Option<Decimal>,
    pub purity: Option<Decimal>,
    /// An empty string clears the karat.
    pub karat: Option<String>,
    pub pieces: Option<u32>,
    pub certificate_number: Option<String>,
    pub voucher_type: Option<String>,
    pub voucher_number: Option<String>,
    pub voucher_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub status: Option<DraftStatus>,
    pub expected_version: Option<u64>,
}

/// What a patch changed, for the engine to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOutcome {
    pub before: DraftEconomics,
    pub after: DraftEconomics,
    pub economics_changed: bool,
    /// Transition to run after the field update is durable.
    pub transition: Option<Transition>,
    /// A requested status that is not reachable from the current one.
    pub ignored_status: Option<DraftStatus>,
}

/// Aggregate root: Draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    id: DraftId,
    draft_number: String,
    status: DraftStatus,
    party_id: Option<PartyId>,
    stock_id: Option<StockId>,
    gross_weight: Decimal,
    purity: Purity,
    karat: Option<String>,
    pure_weight: Decimal,
    pieces: Option<u32>,
    certificate_number: Option<String>,
    voucher: Voucher,
    description: Option<String>,
    created_by: Option<UserId>,
    updated_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Draft {
    /// Build a new draft from user input.
    ///
    /// The draft starts in `draft`, or `rejected` if asked; a draft requested
    /// as `confirmed` is created as `draft` and confirmed by the engine in the
    /// same unit of work.
    pub fn create(
        id: DraftId,
        draft_number: String,
        input: NewDraft,
        stock_karat: Option<&str>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let gross_weight = validate_gross(input.gross_weight.unwrap_or(Decimal::ZERO))?;
        let purity = input
            .purity
            .map(Purity::normalize)
            .transpose()?
            .unwrap_or(Purity::ZERO);
        let karat = non_empty(input.karat).or_else(|| stock_karat.map(str::to_string));
        let status = match input.status {
            Some(DraftStatus::Rejected) => DraftStatus::Rejected,
            _ => DraftStatus::Draft,
        };

        Ok(Self {
            id,
            draft_number,
            status,
            party_id: input.party_id,
            stock_id: input.stock_id,
            gross_weight,
            purity,
            karat,
            pure_weight: purity.pure_weight(gross_weight),
            pieces: input.pieces,
            certificate_number: non_empty(input.certificate_number),
            voucher: input.voucher,
            description: input.description,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    pub fn id_typed(&self) -> DraftId {
        self.id
    }

    pub fn draft_number(&self) -> &str {
        &self.draft_number
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    pub fn party_id(&self) -> Option<PartyId> {
        self.party_id
    }

    pub fn stock_id(&self) -> Option<StockId> {
        self.stock_id
    }

    pub fn gross_weight(&self) -> Decimal {
        self.gross_weight
    }

    pub fn purity(&self) -> Purity {
        self.purity
    }

    pub fn karat(&self) -> Option<&str> {
        self.karat.as_deref()
    }

    pub fn pure_weight(&self) -> Decimal {
        self.pure_weight
    }

    pub fn pieces(&self) -> Option<u32> {
        self.pieces
    }

    pub fn certificate_number(&self) -> Option<&str> {
        self.certificate_number.as_deref()
    }

    pub fn voucher(&self) -> &Voucher {
        &self.voucher
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn updated_by(&self) -> Option<UserId> {
        self.updated_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn economics(&self) -> DraftEconomics {
        DraftEconomics {
            party_id: self.party_id,
            stock_id: self.stock_id,
            gross_weight: self.gross_weight,
            purity: self.purity,
            pure_weight: self.pure_weight,
            pieces: self.pieces,
        }
    }

    /// Whether this draft currently holds a gold reservation.
    pub fn holds_reservation(&self) -> bool {
        self.status == DraftStatus::Draft && self.economics().reserves_gold()
    }

    /// Apply a partial update.
    ///
    /// Pure weight is recomputed from the supplied fields, falling back to the
    /// stored value field by field. The status is *not* changed here: the
    /// returned transition is applied by the engine once its side effects ran.
    pub fn apply_patch(
        &mut self,
        patch: &DraftPatch,
        stock_karat: Option<&str>,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<PatchOutcome> {
        ExpectedVersion::from(patch.expected_version).check(self.version)?;

        let before = self.economics();
        let gross_weight = match patch.gross_weight {
            Some(g) => validate_gross(g)?,
            None => self.gross_weight,
        };
        let purity = match patch.purity {
            Some(p) => Purity::normalize(p)?,
            None => self.purity,
        };
        let after = DraftEconomics {
            party_id: patch.party_id.or(self.party_id),
            stock_id: patch.stock_id.or(self.stock_id),
            gross_weight,
            purity,
            pure_weight: purity.pure_weight(gross_weight),
            pieces: patch.pieces.or(self.pieces),
        };
        let economics_changed = after != before;

        if economics_changed && self.status == DraftStatus::Confirmed {
            return Err(DomainError::invalid_state(format!(
                "draft {} is confirmed; revert it to draft before changing party, stock, weight or purity",
                self.draft_number
            )));
        }

        let stock_changed = after.stock_id != before.stock_id;
        self.party_id = after.party_id;
        self.stock_id = after.stock_id;
        self.gross_weight = after.gross_weight;
        self.purity = after.purity;
        self.pure_weight = after.pure_weight;
        self.pieces = after.pieces;

        match &patch.karat {
            Some(k) => self.karat = non_empty(Some(k.clone())),
            None if stock_changed => {
                self.karat = stock_karat.map(str::to_string).or(self.karat.take());
            }
            None => {}
        }
        if let Some(c) = &patch.certificate_number {
            self.certificate_number = non_empty(Some(c.clone()));
        }
        if let Some(t) = &patch.voucher_type {
            self.voucher.voucher_type = Some(t.clone());
        }
        if let Some(n) = &patch.voucher_number {
            self.voucher.voucher_number = Some(n.clone());
        }
        if let Some(d) = patch.voucher_date {
            self.voucher.voucher_date = Some(d);
        }
        if let Some(d) = &patch.description {
            self.description = Some(d.clone());
        }

        let transition = patch.status.and_then(|s| self.status.transition_to(s));
        let ignored_status = patch
            .status
            .filter(|s| *s != self.status && transition.is_none());

        self.updated_by = actor.or(self.updated_by);
        self.updated_at = now;
        self.version += 1;

        Ok(PatchOutcome {
            before,
            after,
            economics_changed,
            transition,
            ignored_status,
        })
    }

    /// Move to the transition's target status.
    pub fn apply_transition(
        &mut self,
        transition: Transition,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if self.status != transition.source() {
            return Err(DomainError::invalid_state(format!(
                "cannot {transition:?} draft {} in status {}",
                self.draft_number, self.status
            )));
        }
        self.status = transition.target();
        self.updated_by = actor.or(self.updated_by);
        self.updated_at = now;
        Ok(())
    }

    /// Pure weight to post on confirmation.
    ///
    /// Requires party, stock and a positive gross weight. The stored pure
    /// weight is used as-is; it is recomputed from the stored purity only when
    /// it is not a positive number.
    pub fn confirmable_pure_weight(&self) -> DomainResult<Decimal> {
        if self.party_id.is_none() {
            return Err(DomainError::validation(format!(
                "draft {} has no party and cannot be confirmed",
                self.draft_number
            )));
        }
        if self.stock_id.is_none() {
            return Err(DomainError::validation(format!(
                "draft {} has no stock item and cannot be confirmed",
                self.draft_number
            )));
        }
        if self.gross_weight <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "draft {} needs a positive gross weight to be confirmed",
                self.draft_number
            )));
        }
        if self.pure_weight > Decimal::ZERO {
            return Ok(self.pure_weight);
        }
        let recomputed = self.purity.pure_weight(self.gross_weight);
        if recomputed > Decimal::ZERO {
            Ok(recomputed)
        } else {
            Err(DomainError::validation(format!(
                "draft {} has no positive pure weight (purity {})",
                self.draft_number, self.purity
            )))
        }
    }

    /// Case-insensitive match of `needle` (already lowercased) against the
    /// draft's own searchable fields.
    pub fn matches_search(&self, needle: &str) -> bool {
        let fields = [
            Some(self.draft_number.as_str()),
            self.certificate_number.as_deref(),
            self.voucher.voucher_number.as_deref(),
            self.voucher.voucher_type.as_deref(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(needle))
            || self.party_id.is_some_and(|p| p.to_string().contains(needle))
            || self.stock_id.is_some_and(|s| s.to_string().contains(needle))
    }
}

impl AggregateRoot for Draft {
    type Id = DraftId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn validate_gross(gross: Decimal) -> DomainResult<Decimal> {
    if gross < Decimal::ZERO {
        return Err(DomainError::validation(format!(
            "gross weight cannot be negative (got {gross})"
        )));
    }
    Ok(gross.normalize())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn input(gross: &str, purity: &str) -> NewDraft {
        NewDraft {
            party_id: Some(PartyId::new()),
            stock_id: Some(StockId::new()),
            gross_weight: Some(d(gross)),
            purity: Some(d(purity)),
            ..NewDraft::default()
        }
    }

    fn create(input: NewDraft) -> Draft {
        Draft::create(DraftId::new(), "DRF001".to_string(), input, None, None, Utc::now()).unwrap()
    }

    #[test]
    fn create_normalizes_percentage_purity() {
        let draft = create(input("10", "75"));
        assert_eq!(draft.purity().fraction(), d("0.75"));
        assert_eq!(draft.pure_weight(), d("7.5"));
        assert_eq!(draft.status(), DraftStatus::Draft);
        assert!(draft.holds_reservation());
    }

    #[test]
    fn percentage_and_fraction_inputs_store_the_same_values() {
        let a = create(input("12", "50"));
        let b = create(input("12", "0.5"));
        assert_eq!(a.purity(), b.purity());
        assert_eq!(a.pure_weight(), b.pure_weight());
    }

    #[test]
    fn missing_weights_default_to_zero_and_hold_nothing() {
        let draft = create(NewDraft {
            party_id: Some(PartyId::new()),
            ..NewDraft::default()
        });
        assert_eq!(draft.gross_weight(), Decimal::ZERO);
        assert_eq!(draft.pure_weight(), Decimal::ZERO);
        assert!(!draft.holds_reservation());
    }

    #[test]
    fn negative_gross_weight_is_rejected() {
        let err = Draft::create(
            DraftId::new(),
            "DRF001".into(),
            input("-1", "0.5"),
            None,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn karat_resolves_from_input_then_stock() {
        let mut with_input = input("1", "1");
        with_input.karat = Some("18K".into());
        let a = Draft::create(DraftId::new(), "DRF001".into(), with_input, Some("22K"), None, Utc::now()).unwrap();
        assert_eq!(a.karat(), Some("18K"));

        let b = Draft::create(DraftId::new(), "DRF002".into(), input("1", "1"), Some("22K"), None, Utc::now()).unwrap();
        assert_eq!(b.karat(), Some("22K"));

        let c = create(input("1", "1"));
        assert_eq!(c.karat(), None);
    }

    #[test]
    fn requested_confirmed_status_starts_as_draft() {
        let mut i = input("1", "1");
        i.status = Some(DraftStatus::Confirmed);
        assert_eq!(create(i).status(), DraftStatus::Draft);

        let mut r = input("1", "1");
        r.status = Some(DraftStatus::Rejected);
        assert_eq!(create(r).status(), DraftStatus::Rejected);
    }

    #[test]
    fn patch_recomputes_from_supplied_fields_only() {
        let mut draft = create(input("10", "75"));
        let outcome = draft
            .apply_patch(
                &DraftPatch {
                    gross_weight: Some(d("20")),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap();

        assert!(outcome.economics_changed);
        assert_eq!(outcome.before.pure_weight, d("7.5"));
        assert_eq!(draft.purity().fraction(), d("0.75"));
        assert_eq!(draft.pure_weight(), d("15"));
        assert_eq!(draft.version(), 2);
    }

    #[test]
    fn metadata_only_patch_does_not_change_economics() {
        let mut draft = create(input("10", "75"));
        let outcome = draft
            .apply_patch(
                &DraftPatch {
                    voucher_number: Some("V-9".into()),
                    certificate_number: Some("CERT-1".into()),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap();
        assert!(!outcome.economics_changed);
        assert_eq!(draft.voucher().reference().as_deref(), Some("V-9"));
        assert_eq!(draft.certificate_number(), Some("CERT-1"));
    }

    #[test]
    fn patch_reports_transition_without_changing_status() {
        let mut draft = create(input("10", "75"));
        let outcome = draft
            .apply_patch(
                &DraftPatch {
                    status: Some(DraftStatus::Confirmed),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.transition, Some(Transition::Confirm));
        assert_eq!(draft.status(), DraftStatus::Draft);

        draft.apply_transition(Transition::Confirm, None, Utc::now()).unwrap();
        assert_eq!(draft.status(), DraftStatus::Confirmed);
    }

    #[test]
    fn undefined_status_change_is_reported_as_ignored() {
        let mut i = input("10", "75");
        i.status = Some(DraftStatus::Rejected);
        let mut draft = create(i);
        let outcome = draft
            .apply_patch(
                &DraftPatch {
                    status: Some(DraftStatus::Draft),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(outcome.transition, None);
        assert_eq!(outcome.ignored_status, Some(DraftStatus::Draft));
        assert_eq!(draft.status(), DraftStatus::Rejected);
    }

    #[test]
    fn confirmed_draft_economics_are_frozen() {
        let mut draft = create(input("10", "75"));
        draft.apply_transition(Transition::Confirm, None, Utc::now()).unwrap();
        let err = draft
            .apply_patch(
                &DraftPatch {
                    purity: Some(d("0.9")),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
        assert_eq!(draft.purity().fraction(), d("0.75"));
    }

    #[test]
    fn stale_expected_version_is_a_conflict() {
        let mut draft = create(input("10", "75"));
        let err = draft
            .apply_patch(
                &DraftPatch {
                    expected_version: Some(7),
                    ..DraftPatch::default()
                },
                None,
                None,
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn transition_from_wrong_status_is_refused() {
        let mut draft = create(input("10", "75"));
        assert!(draft.apply_transition(Transition::Revert, None, Utc::now()).is_err());
    }

    #[test]
    fn confirm_preconditions() {
        let no_party = create(NewDraft {
            stock_id: Some(StockId::new()),
            gross_weight: Some(d("1")),
            purity: Some(d("1")),
            ..NewDraft::default()
        });
        assert!(no_party.confirmable_pure_weight().is_err());

        let zero_purity = create(input("10", "0"));
        assert!(zero_purity.confirmable_pure_weight().is_err());

        assert_eq!(create(input("10", "75")).confirmable_pure_weight().unwrap(), d("7.5"));
    }

    #[test]
    fn search_matches_number_certificate_and_voucher() {
        let mut i = input("1", "1");
        i.certificate_number = Some("GIA-5521".into());
        i.voucher = Voucher {
            voucher_type: Some("PUR".into()),
            voucher_number: Some("778".into()),
            voucher_date: None,
        };
        let draft = create(i);
        assert!(draft.matches_search("drf001"));
        assert!(draft.matches_search("gia-55"));
        assert!(draft.matches_search("778"));
        assert!(!draft.matches_search("zzz"));
        assert_eq!(draft.voucher().reference().as_deref(), Some("PUR-778"));
    }

    proptest! {
        /// After any sequence of weight/purity patches, the stored pure weight
        /// equals gross × purity of the stored values.
        #[test]
        fn pure_weight_tracks_stored_fields(
            patches in prop::collection::vec((prop::option::of(0u32..100_000u32), prop::option::of(0u32..=100u32)), 1..10)
        ) {
            let mut draft = create(input("10", "75"));
            for (gross, pct) in patches {
                let patch = DraftPatch {
                    gross_weight: gross.map(|g| Decimal::new(g as i64, 2)),
                    purity: pct.map(|p| Decimal::new(p as i64, 2)),
                    ..DraftPatch::default()
                };
                draft.apply_patch(&patch, None, None, Utc::now()).unwrap();
                prop_assert_eq!(draft.pure_weight(), draft.purity().pure_weight(draft.gross_weight()));
            }
        }
    }
}
