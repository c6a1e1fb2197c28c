//! Transfer Engine: party-to-party and opening-balance movements of cash and
//! gold, outside the draft flow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use bullion_accounting::{
    AssetType, EntryFilter, EntryType, FundTransfer, LedgerEntry, NewEntry, ReceivingParty,
    SendingParty, Side,
};
use bullion_core::{PartyId, TransferId, UserId};
use bullion_parties::{BalanceChange, Party};

use super::{Engine, load_party};
use crate::error::{EngineError, EngineResult};
use crate::sequence::{SequenceKind, with_sequence_retry};
use crate::store::{Store, UnitOfWork};

/// Account-to-account transfer. A negative `value` moves the magnitude from
/// `receiver` to `sender`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransferRequest {
    pub sender: PartyId,
    pub receiver: PartyId,
    pub value: Decimal,
    pub asset: AssetType,
    /// Currency of a default cash slot created by this transfer.
    pub currency: Option<String>,
    pub reference: Option<String>,
}

/// Opening balance of one party and asset. Posting it again restates the
/// existing opening entry instead of adding a new one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OpeningBalance {
    pub party: PartyId,
    /// Signed; a negative opening balance is posted as a debit.
    pub value: Decimal,
    pub asset: AssetType,
    pub currency: Option<String>,
    pub reference: Option<String>,
}

impl<S: Store> Engine<S> {
    #[instrument(skip(self, request), fields(asset = ?request.asset, value = %request.value))]
    pub fn transfer(
        &self,
        request: TransferRequest,
        actor: Option<UserId>,
    ) -> EngineResult<FundTransfer> {
        if request.value.is_zero() {
            return Err(EngineError::validation("transfer value cannot be zero"));
        }
        if request.sender == request.receiver {
            return Err(EngineError::validation(
                "sender and receiver must be different parties",
            ));
        }
        let (from_id, to_id, amount) = if request.value.is_sign_negative() {
            (request.receiver, request.sender, -request.value)
        } else {
            (request.sender, request.receiver, request.value)
        };

        let now = Utc::now();
        let mut tx = self.store.begin()?;
        let mut from = load_party(&tx, from_id)?;
        let mut to = load_party(&tx, to_id)?;

        let (debited, credited, currency) = match request.asset {
            AssetType::Gold => (
                from.debit_gold(amount, self.settings.underflow)?,
                to.credit_gold(amount)?,
                None,
            ),
            AssetType::Cash => {
                let fallback = self.cash_currency(request.currency.as_deref());
                let from_currency = slot_currency(&from, &fallback);
                let to_currency = slot_currency(&to, &fallback);
                if from_currency != to_currency {
                    return Err(EngineError::validation(format!(
                        "default cash slots differ in currency ({from_currency} vs {to_currency}); conversion is not supported"
                    )));
                }
                (
                    from.adjust_default_cash(-amount, &fallback)?,
                    to.adjust_default_cash(amount, &fallback)?,
                    Some(from_currency),
                )
            }
        };
        from.touch(now);
        to.touch(now);
        tx.put_party(from)?;
        tx.put_party(to)?;

        let entry_type = EntryType::transfer_for(request.asset);
        let leg = |party_id, side, change: BalanceChange| NewEntry {
            entry_type,
            party_id,
            asset: request.asset,
            currency: currency.clone(),
            side,
            amount,
            previous_balance: change.previous,
            running_balance: change.running,
            is_draft: false,
            draft_id: None,
            stock_id: None,
            cost_center: None,
            reference: request.reference.clone(),
            description: None,
            created_by: actor,
        };
        let debit = self.post_entry(&mut tx, leg(from_id, Side::Debit, debited), now)?;
        let credit = self.post_entry(&mut tx, leg(to_id, Side::Credit, credited), now)?;

        let transfer = self.record_transfer(
            &mut tx,
            |transaction_id| FundTransfer {
                id: TransferId::new(),
                transaction_id,
                value: amount,
                asset: request.asset,
                currency: currency.clone(),
                receiving_party: ReceivingParty {
                    party: to_id,
                    credit: amount,
                },
                sending_party: Some(SendingParty {
                    party: from_id,
                    debit: amount,
                }),
                is_opening: false,
                entry_ids: vec![debit.id, credit.id],
                reference: request.reference.clone(),
                created_by: actor,
                created_at: now,
                updated_at: now,
            },
        )?;

        tx.commit()?;
        info!(
            transaction_id = %transfer.transaction_id,
            sender = %from_id,
            receiver = %to_id,
            %amount,
            "transfer posted"
        );
        Ok(transfer)
    }

    /// Post (or restate) a party's opening balance for one asset.
    #[instrument(skip(self, opening), fields(party = %opening.party, asset = ?opening.asset, value = %opening.value))]
    pub fn opening_balance_transfer(
        &self,
        opening: OpeningBalance,
        actor: Option<UserId>,
    ) -> EngineResult<FundTransfer> {
        let now = Utc::now();
        let mut tx = self.store.begin()?;
        let mut party = load_party(&tx, opening.party)?;
        let fallback = self.cash_currency(opening.currency.as_deref());

        let transfer = match tx.opening_transfer(opening.party, opening.asset)? {
            Some(existing) => self.restate_opening(&mut tx, &mut party, existing, &opening, &fallback, now)?,
            None => self.post_opening(&mut tx, &mut party, &opening, &fallback, actor, now)?,
        };

        party.touch(now);
        tx.put_party(party)?;
        tx.commit()?;
        info!(transaction_id = %transfer.transaction_id, "opening balance posted");
        Ok(transfer)
    }

    fn post_opening<U: UnitOfWork>(
        &self,
        tx: &mut U,
        party: &mut Party,
        opening: &OpeningBalance,
        fallback: &str,
        actor: Option<UserId>,
        now: DateTime<Utc>,
    ) -> EngineResult<FundTransfer> {
        if opening.value.is_zero() {
            return Err(EngineError::validation("opening balance cannot be zero"));
        }
        let change = self.apply_to_balance(party, opening.asset, opening.value, fallback)?;
        let currency = cash_currency_of(party, opening.asset);
        let side = if opening.value.is_sign_negative() {
            Side::Debit
        } else {
            Side::Credit
        };

        let entry = self.post_entry(
            tx,
            NewEntry {
                entry_type: EntryType::opening_for(opening.asset),
                party_id: party.id_typed(),
                asset: opening.asset,
                currency: currency.clone(),
                side,
                amount: opening.value.abs(),
                previous_balance: change.previous,
                running_balance: change.running,
                is_draft: false,
                draft_id: None,
                stock_id: None,
                cost_center: None,
                reference: opening.reference.clone(),
                description: Some("opening balance".to_string()),
                created_by: actor,
            },
            now,
        )?;

        self.record_transfer(tx, |transaction_id| FundTransfer {
            id: TransferId::new(),
            transaction_id,
            value: opening.value,
            asset: opening.asset,
            currency: currency.clone(),
            receiving_party: ReceivingParty {
                party: party.id_typed(),
                credit: opening.value,
            },
            sending_party: None,
            is_opening: true,
            entry_ids: vec![entry.id],
            reference: opening.reference.clone(),
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
    }

    /// Second posting of an opening balance: adjust the balance by the delta
    /// and restate the opening entry in place. The entry's running balance is
    /// the party balance after the adjustment (clamping included) and its
    /// previous balance is that minus the new opening value.
    fn restate_opening<U: UnitOfWork>(
        &self,
        tx: &mut U,
        party: &mut Party,
        mut existing: FundTransfer,
        opening: &OpeningBalance,
        fallback: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<FundTransfer> {
        let filter = EntryFilter {
            party_id: Some(opening.party),
            entry_type: Some(EntryType::opening_for(opening.asset)),
            asset: Some(opening.asset),
            ..EntryFilter::default()
        };
        let old_value = tx
            .entries(&filter)?
            .first()
            .map(LedgerEntry::signed_amount)
            .unwrap_or(existing.value);

        let delta = opening.value.checked_sub(old_value).ok_or_else(|| {
            EngineError::validation(format!(
                "opening balance restatement from {old_value} to {} is out of range",
                opening.value
            ))
        })?;
        let change = self.apply_to_balance(party, opening.asset, delta, fallback)?;
        let previous = change.running.checked_sub(opening.value).ok_or_else(|| {
            EngineError::validation(format!(
                "opening balance {} is out of range for a running balance of {}",
                opening.value, change.running
            ))
        })?;

        let restated = tx.update_entries(&filter, &mut |e: &mut LedgerEntry| {
            e.restate(opening.value, previous, now)
        })?;
        if restated == 0 {
            return Err(EngineError::InvariantViolation(format!(
                "opening transfer {} has no opening ledger entry",
                existing.transaction_id
            )));
        }

        existing.value = opening.value;
        existing.receiving_party.credit = opening.value;
        if opening.reference.is_some() {
            existing.reference = opening.reference.clone();
        }
        existing.updated_at = now;
        tx.update_transfer(existing.clone())?;
        Ok(existing)
    }

    fn apply_to_balance(
        &self,
        party: &mut Party,
        asset: AssetType,
        delta: Decimal,
        fallback_currency: &str,
    ) -> EngineResult<BalanceChange> {
        Ok(match asset {
            AssetType::Gold => party.adjust_gold(delta, self.settings.underflow)?,
            AssetType::Cash => party.adjust_default_cash(delta, fallback_currency)?,
        })
    }

    fn record_transfer<U, F>(&self, tx: &mut U, build: F) -> EngineResult<FundTransfer>
    where
        U: UnitOfWork,
        F: Fn(String) -> FundTransfer,
    {
        with_sequence_retry(self.sequences.max_attempts(), SequenceKind::Transfer, |_| {
            let transaction_id = self.sequences.next(&*tx, SequenceKind::Transfer)?;
            let transfer = build(transaction_id);
            tx.insert_transfer(transfer.clone())?;
            Ok(transfer)
        })
    }

    fn cash_currency(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| self.settings.default_currency.clone())
    }
}

/// Currency of the party's default cash slot, or the one it would be created in.
fn slot_currency(party: &Party, fallback: &str) -> String {
    party
        .default_cash()
        .map(|c| c.currency.clone())
        .unwrap_or_else(|| fallback.to_ascii_uppercase())
}

fn cash_currency_of(party: &Party, asset: AssetType) -> Option<String> {
    match asset {
        AssetType::Cash => party.default_cash().map(|c| c.currency.clone()),
        AssetType::Gold => None,
    }
}
