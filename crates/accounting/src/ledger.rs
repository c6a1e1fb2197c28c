use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bullion_core::{DomainError, DomainResult, DraftId, EntryId, PartyId, StockId, UserId};

/// What kind of movement an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    OpeningCash,
    OpeningGold,
    PartyCash,
    PartyGold,
    /// Metal moving in or out of stock through a draft.
    StockBalance,
}

impl EntryType {
    pub fn opening_for(asset: AssetType) -> Self {
        match asset {
            AssetType::Cash => EntryType::OpeningCash,
            AssetType::Gold => EntryType::OpeningGold,
        }
    }

    pub fn transfer_for(asset: AssetType) -> Self {
        match asset {
            AssetType::Cash => EntryType::PartyCash,
            AssetType::Gold => EntryType::PartyGold,
        }
    }
}

/// Asset a balance slot (and therefore an entry) is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Cash,
    Gold,
}

impl core::str::FromStr for AssetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(AssetType::Cash),
            "GOLD" => Ok(AssetType::Gold),
            _ => Err(DomainError::validation(format!(
                "asset type must be one of: CASH, GOLD (got {s:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Provisional: owned by an undecided draft.
    Pending,
    Posted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Credit,
    Debit,
}

/// Input for a new ledger entry (everything but the assigned transaction id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub entry_type: EntryType,
    pub party_id: PartyId,
    pub asset: AssetType,
    pub currency: Option<String>,
    pub side: Side,
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub running_balance: Decimal,
    pub is_draft: bool,
    pub draft_id: Option<DraftId>,
    pub stock_id: Option<StockId>,
    pub cost_center: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<UserId>,
}

/// Registry entry: one credit or debit for one party and asset.
///
/// `credit` and `debit` are mutually exclusive magnitudes; `value` repeats the
/// non-zero one. The balance snapshots are asset-scoped and taken at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub transaction_id: String,
    pub entry_type: EntryType,
    pub party_id: PartyId,
    pub asset: AssetType,
    pub currency: Option<String>,
    pub value: Decimal,
    pub credit: Decimal,
    pub debit: Decimal,
    pub previous_balance: Decimal,
    pub running_balance: Decimal,
    pub is_draft: bool,
    pub status: EntryStatus,
    pub draft_id: Option<DraftId>,
    pub stock_id: Option<StockId>,
    pub cost_center: Option<String>,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        transaction_id: impl Into<String>,
        entry: NewEntry,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if entry.amount.is_sign_negative() && !entry.amount.is_zero() {
            return Err(DomainError::validation(format!(
                "ledger amount must be a magnitude (got {})",
                entry.amount
            )));
        }
        let (credit, debit) = match entry.side {
            Side::Credit => (entry.amount, Decimal::ZERO),
            Side::Debit => (Decimal::ZERO, entry.amount),
        };
        Ok(Self {
            id: EntryId::new(),
            transaction_id: transaction_id.into(),
            entry_type: entry.entry_type,
            party_id: entry.party_id,
            asset: entry.asset,
            currency: entry.currency,
            value: entry.amount,
            credit,
            debit,
            previous_balance: entry.previous_balance,
            running_balance: entry.running_balance,
            is_draft: entry.is_draft,
            status: if entry.is_draft {
                EntryStatus::Pending
            } else {
                EntryStatus::Posted
            },
            draft_id: entry.draft_id,
            stock_id: entry.stock_id,
            cost_center: entry.cost_center,
            reference: entry.reference,
            description: entry.description,
            created_by: entry.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Credit minus debit.
    pub fn signed_amount(&self) -> Decimal {
        self.credit - self.debit
    }

    /// Flip a provisional entry to posted, filing it under its real cost center.
    pub fn confirm(&mut self, cost_center: impl Into<String>, now: DateTime<Utc>) {
        self.is_draft = false;
        self.status = EntryStatus::Posted;
        self.cost_center = Some(cost_center.into());
        self.updated_at = now;
    }

    /// Flip a posted entry back to provisional (draft reverted).
    pub fn mark_provisional(&mut self, placeholder_cost_center: impl Into<String>, now: DateTime<Utc>) {
        self.is_draft = true;
        self.status = EntryStatus::Pending;
        self.cost_center = Some(placeholder_cost_center.into());
        self.updated_at = now;
    }

    /// Re-state the entry in place with a new signed amount, starting from
    /// `previous_balance`. Used only for opening-balance entries.
    pub fn restate(&mut self, signed_amount: Decimal, previous_balance: Decimal, now: DateTime<Utc>) {
        let magnitude = signed_amount.abs();
        if signed_amount.is_sign_negative() && !signed_amount.is_zero() {
            self.credit = Decimal::ZERO;
            self.debit = magnitude;
        } else {
            self.credit = magnitude;
            self.debit = Decimal::ZERO;
        }
        self.value = magnitude;
        self.previous_balance = previous_balance;
        self.running_balance = previous_balance + signed_amount;
        self.updated_at = now;
    }
}

/// Selection used by update-many / delete-many on ledger entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub party_id: Option<PartyId>,
    pub draft_id: Option<DraftId>,
    pub is_draft: Option<bool>,
    pub entry_type: Option<EntryType>,
    pub asset: Option<AssetType>,
}

impl EntryFilter {
    pub fn for_draft(draft_id: DraftId) -> Self {
        Self {
            draft_id: Some(draft_id),
            ..Self::default()
        }
    }

    pub fn provisional(draft_id: DraftId) -> Self {
        Self {
            draft_id: Some(draft_id),
            is_draft: Some(true),
            ..Self::default()
        }
    }

    pub fn for_party(party_id: PartyId) -> Self {
        Self {
            party_id: Some(party_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        self.party_id.is_none_or(|p| entry.party_id == p)
            && self.draft_id.is_none_or(|d| entry.draft_id == Some(d))
            && self.is_draft.is_none_or(|f| entry.is_draft == f)
            && self.entry_type.is_none_or(|t| entry.entry_type == t)
            && self.asset.is_none_or(|a| entry.asset == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn new_entry(side: Side, amount: Decimal, is_draft: bool) -> NewEntry {
        NewEntry {
            entry_type: EntryType::StockBalance,
            party_id: PartyId::new(),
            asset: AssetType::Gold,
            currency: None,
            side,
            amount,
            previous_balance: Decimal::ZERO,
            running_balance: amount,
            is_draft,
            draft_id: Some(DraftId::new()),
            stock_id: None,
            cost_center: Some("DRAFT".to_string()),
            reference: None,
            description: None,
            created_by: None,
        }
    }

    #[test]
    fn credit_and_debit_are_mutually_exclusive() {
        let debit = LedgerEntry::new("TRX001", new_entry(Side::Debit, d("7.5"), true), Utc::now()).unwrap();
        assert_eq!(debit.debit, d("7.5"));
        assert_eq!(debit.credit, Decimal::ZERO);
        assert_eq!(debit.value, d("7.5"));
        assert_eq!(debit.status, EntryStatus::Pending);

        let credit = LedgerEntry::new("TRX002", new_entry(Side::Credit, d("3"), false), Utc::now()).unwrap();
        assert_eq!(credit.credit, d("3"));
        assert_eq!(credit.debit, Decimal::ZERO);
        assert_eq!(credit.status, EntryStatus::Posted);
    }

    #[test]
    fn negative_magnitude_is_rejected() {
        let err = LedgerEntry::new("TRX001", new_entry(Side::Credit, d("-1"), false), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn confirm_and_revert_flip_flag_and_cost_center() {
        let mut e = LedgerEntry::new("TRX001", new_entry(Side::Debit, d("1"), true), Utc::now()).unwrap();
        e.confirm("RETAIL", Utc::now());
        assert!(!e.is_draft);
        assert_eq!(e.cost_center.as_deref(), Some("RETAIL"));

        e.mark_provisional("DRAFT", Utc::now());
        assert!(e.is_draft);
        assert_eq!(e.status, EntryStatus::Pending);
        assert_eq!(e.cost_center.as_deref(), Some("DRAFT"));
    }

    #[test]
    fn restate_recomputes_snapshots() {
        let mut e = LedgerEntry::new("TRX001", new_entry(Side::Credit, d("100"), false), Utc::now()).unwrap();
        e.restate(d("-40"), d("10"), Utc::now());
        assert_eq!(e.debit, d("40"));
        assert_eq!(e.credit, Decimal::ZERO);
        assert_eq!(e.previous_balance, d("10"));
        assert_eq!(e.running_balance, d("-30"));
    }

    #[test]
    fn asset_type_parses_case_insensitively_and_serializes_upper() {
        assert_eq!("gold".parse::<AssetType>().unwrap(), AssetType::Gold);
        assert!("silver".parse::<AssetType>().is_err());
        assert_eq!(serde_json::to_string(&AssetType::Cash).unwrap(), "\"CASH\"");
        assert_eq!(
            serde_json::to_string(&EntryType::OpeningGold).unwrap(),
            "\"opening-gold\""
        );
    }

    #[test]
    fn filter_combines_criteria() {
        let e = LedgerEntry::new("TRX001", new_entry(Side::Debit, d("1"), true), Utc::now()).unwrap();
        let draft = e.draft_id.unwrap();
        assert!(EntryFilter::provisional(draft).matches(&e));
        assert!(EntryFilter::for_party(e.party_id).matches(&e));
        assert!(!EntryFilter::for_party(PartyId::new()).matches(&e));
        let wrong_type = EntryFilter {
            entry_type: Some(EntryType::PartyGold),
            ..EntryFilter::for_draft(draft)
        };
        assert!(!wrong_type.matches(&e));
    }

    proptest! {
        /// Restating always keeps `running = previous + credit - debit`.
        #[test]
        fn restate_keeps_running_balance_consistent(amount in -1_000_000i64..1_000_000i64, prev in -1_000_000i64..1_000_000i64) {
            let mut e = LedgerEntry::new("TRX001", new_entry(Side::Credit, Decimal::ONE, false), Utc::now()).unwrap();
            let amount = Decimal::new(amount, 3);
            let prev = Decimal::new(prev, 3);
            e.restate(amount, prev, Utc::now());
            prop_assert_eq!(e.running_balance, e.previous_balance + e.credit - e.debit);
            prop_assert!(e.credit.is_zero() || e.debit.is_zero());
        }
    }
}
