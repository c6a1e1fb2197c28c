use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bullion_core::{
    AggregateRoot, DomainError, DomainResult, PartyId, UnderflowPolicy, checked_add,
};

/// Party kind: who the business trades with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    #[default]
    Customer,
    Supplier,
    /// Internal account (cash desk, vault, ...).
    Account,
}

/// Gold held for a party, split by confirmation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoldBalance {
    /// Gold reserved by drafts that are neither confirmed nor rejected.
    pub draft_balance: Decimal,
    /// Confirmed gold balance, in grams of pure metal.
    pub total_grams: Decimal,
}

/// One currency slot of a party's cash balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashBalance {
    pub currency: String,
    pub amount: Decimal,
    pub is_default: bool,
}

/// Balance of one asset slot before and after a mutation.
///
/// Ledger entries copy these as their `previous_balance` / `running_balance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub previous: Decimal,
    pub running: Decimal,
}

/// Aggregate root: Party, carrying its cash and gold balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    id: PartyId,
    kind: PartyKind,
    name: String,
    gold: GoldBalance,
    cash: Vec<CashBalance>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Party {
    pub fn register(
        id: PartyId,
        kind: PartyKind,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            id,
            kind,
            name,
            gold: GoldBalance::default(),
            cash: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gold(&self) -> GoldBalance {
        self.gold
    }

    pub fn cash_balances(&self) -> &[CashBalance] {
        &self.cash
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The default cash slot, if one has been created.
    pub fn default_cash(&self) -> Option<&CashBalance> {
        self.cash.iter().find(|c| c.is_default)
    }

    pub fn cash_in(&self, currency: &str) -> Option<Decimal> {
        self.cash
            .iter()
            .find(|c| c.currency.eq_ignore_ascii_case(currency))
            .map(|c| c.amount)
    }

    /// Record a successful write (version bump + timestamp).
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    // -------------------------
    // Gold
    // -------------------------

    /// Reserve gold for an undecided draft.
    pub fn reserve_draft_gold(&mut self, amount: Decimal) -> DomainResult<BalanceChange> {
        ensure_non_negative(amount, "draft reservation")?;
        let previous = self.gold.draft_balance;
        self.gold.draft_balance = checked_add(previous, amount, "draft balance")?;
        Ok(BalanceChange {
            previous,
            running: self.gold.draft_balance,
        })
    }

    /// Release a draft reservation (reject, confirm, delete).
    pub fn release_draft_gold(
        &mut self,
        amount: Decimal,
        policy: UnderflowPolicy,
    ) -> DomainResult<BalanceChange> {
        ensure_non_negative(amount, "draft release")?;
        let previous = self.gold.draft_balance;
        self.gold.draft_balance = policy.subtract(previous, amount, "draft balance")?;
        Ok(BalanceChange {
            previous,
            running: self.gold.draft_balance,
        })
    }

    pub fn credit_gold(&mut self, amount: Decimal) -> DomainResult<BalanceChange> {
        ensure_non_negative(amount, "gold credit")?;
        let previous = self.gold.total_grams;
        self.gold.total_grams = checked_add(previous, amount, "gold balance")?;
        Ok(BalanceChange {
            previous,
            running: self.gold.total_grams,
        })
    }

    pub fn debit_gold(
        &mut self,
        amount: Decimal,
        policy: UnderflowPolicy,
    ) -> DomainResult<BalanceChange> {
        ensure_non_negative(amount, "gold debit")?;
        let previous = self.gold.total_grams;
        self.gold.total_grams = policy.subtract(previous, amount, "gold balance")?;
        Ok(BalanceChange {
            previous,
            running: self.gold.total_grams,
        })
    }

    /// Apply a signed change to the confirmed gold balance.
    pub fn adjust_gold(
        &mut self,
        delta: Decimal,
        policy: UnderflowPolicy,
    ) -> DomainResult<BalanceChange> {
        if delta.is_sign_negative() {
            self.debit_gold(-delta, policy)
        } else {
            self.credit_gold(delta)
        }
    }

    // -------------------------
    // Cash
    // -------------------------

    /// Apply a signed change to the default cash slot.
    ///
    /// If no slot is flagged default, one is created for `fallback_currency`
    /// (or an existing slot in that currency is promoted). Cash may go negative:
    /// a party can owe the business money.
    pub fn adjust_default_cash(
        &mut self,
        delta: Decimal,
        fallback_currency: &str,
    ) -> DomainResult<BalanceChange> {
        let slot = self.default_cash_slot(fallback_currency);
        let previous = slot.amount;
        slot.amount = checked_add(previous, delta, "cash balance")?;
        Ok(BalanceChange {
            previous,
            running: slot.amount,
        })
    }

    fn default_cash_slot(&mut self, fallback_currency: &str) -> &mut CashBalance {
        let idx = match self.cash.iter().position(|c| c.is_default) {
            Some(idx) => idx,
            None => match self
                .cash
                .iter()
                .position(|c| c.currency.eq_ignore_ascii_case(fallback_currency))
            {
                Some(idx) => {
                    self.cash[idx].is_default = true;
                    idx
                }
                None => {
                    self.cash.push(CashBalance {
                        currency: fallback_currency.to_ascii_uppercase(),
                        amount: Decimal::ZERO,
                        is_default: true,
                    });
                    self.cash.len() - 1
                }
            },
        };
        &mut self.cash[idx]
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

fn ensure_non_negative(amount: Decimal, what: &str) -> DomainResult<()> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::validation(format!(
            "{what} amount cannot be negative (got {amount})"
        )));
    }
    Ok(())
}
