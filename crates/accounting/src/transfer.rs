//! Fund transfer records (reporting snapshots, not a source of truth).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bullion_core::{EntryId, PartyId, TransferId, UserId};

use crate::ledger::AssetType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivingParty {
    pub party: PartyId,
    pub credit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendingParty {
    pub party: PartyId,
    pub debit: Decimal,
}

/// Snapshot of a completed transfer.
///
/// Opening-balance transfers have no sending party and are updated in place
/// when the opening balance is posted again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundTransfer {
    pub id: TransferId,
    pub transaction_id: String,
    pub value: Decimal,
    pub asset: AssetType,
    pub currency: Option<String>,
    pub receiving_party: ReceivingParty,
    pub sending_party: Option<SendingParty>,
    pub is_opening: bool,
    pub entry_ids: Vec<EntryId>,
    pub reference: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FundTransfer {
    pub fn involves(&self, party: PartyId) -> bool {
        self.receiving_party.party == party
            || self.sending_party.as_ref().is_some_and(|s| s.party == party)
    }

    pub fn is_opening_for(&self, party: PartyId, asset: AssetType) -> bool {
        self.is_opening && self.asset == asset && self.receiving_party.party == party
    }
}
