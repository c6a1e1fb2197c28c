//! Per-movement inventory audit records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bullion_core::{DraftId, InventoryLogId, PartyId, Purity, StockId};

use crate::item::StockMovement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryAction {
    Add,
    Remove,
}

/// One stock movement. Mirrors the ledger's `is_draft` / `draft_id` convention:
/// provisional while the owning draft is undecided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLog {
    pub id: InventoryLogId,
    pub stock_id: StockId,
    pub party_id: Option<PartyId>,
    pub draft_id: Option<DraftId>,
    pub action: InventoryAction,
    pub gross_weight: Decimal,
    pub pure_weight: Decimal,
    pub purity: Purity,
    pub pieces: Option<u32>,
    pub is_draft: bool,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryLog {
    pub fn movement(&self) -> StockMovement {
        StockMovement {
            gross_weight: self.gross_weight,
            pure_weight: self.pure_weight,
            purity: self.purity,
            pieces: self.pieces,
        }
    }
}

/// Selection used by update-many / delete-many on inventory logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryLogFilter {
    pub stock_id: Option<StockId>,
    pub draft_id: Option<DraftId>,
    pub is_draft: Option<bool>,
}

impl InventoryLogFilter {
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

    pub fn matches(&self, log: &InventoryLog) -> bool {
        self.stock_id.is_none_or(|s| log.stock_id == s)
            && self.draft_id.is_none_or(|d| log.draft_id == Some(d))
            && self.is_draft.is_none_or(|f| log.is_draft == f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(draft_id: DraftId, is_draft: bool) -> InventoryLog {
        InventoryLog {
            id: InventoryLogId::new(),
            stock_id: StockId::new(),
            party_id: None,
            draft_id: Some(draft_id),
            action: InventoryAction::Add,
            gross_weight: Decimal::TEN,
            pure_weight: Decimal::TEN,
            purity: Purity::FINE,
            pieces: None,
            is_draft,
            reference: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn provisional_filter_skips_confirmed_logs() {
        let draft = DraftId::new();
        assert!(InventoryLogFilter::provisional(draft).matches(&log(draft, true)));
        assert!(!InventoryLogFilter::provisional(draft).matches(&log(draft, false)));
        assert!(InventoryLogFilter::for_draft(draft).matches(&log(draft, false)));
        assert!(!InventoryLogFilter::for_draft(DraftId::new()).matches(&log(draft, true)));
    }
}
