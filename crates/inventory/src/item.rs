use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use bullion_core::{DomainError, DomainResult, Purity, StockId, UnderflowPolicy, checked_add};

/// Stock master record, as far as the draft engine needs it.
///
/// Full stock CRUD lives outside this system; the engine only reads the cost
/// center, the linked karat and whether the item is counted in pieces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub code: String,
    pub name: String,
    pub cost_center: String,
    pub karat: Option<String>,
    pub is_pcs: bool,
}

impl Stock {
    pub fn new(
        id: StockId,
        code: impl Into<String>,
        name: impl Into<String>,
        cost_center: impl Into<String>,
    ) -> DomainResult<Self> {
        let stock = Self {
            id,
            code: code.into(),
            name: name.into(),
            cost_center: cost_center.into(),
            karat: None,
            is_pcs: false,
        };
        stock.validate()?;
        Ok(stock)
    }

    pub fn with_karat(mut self, karat: impl Into<String>) -> Self {
        self.karat = Some(karat.into());
        self
    }

    pub fn counted_in_pieces(mut self) -> Self {
        self.is_pcs = true;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("stock code cannot be empty"));
        }
        if self.cost_center.trim().is_empty() {
            return Err(DomainError::validation("stock cost center cannot be empty"));
        }
        Ok(())
    }
}

/// Quantity moved in or out of a stock item by one confirmed draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockMovement {
    pub gross_weight: Decimal,
    pub pure_weight: Decimal,
    pub purity: Purity,
    /// Piece count; only applied to pcs-tracked stock.
    pub pieces: Option<u32>,
}

/// Running totals for one stock item.
///
/// Only confirmed movements touch this aggregate. `purity` is taken from the
/// first confirmed movement and never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAggregate {
    pub stock_id: StockId,
    pub gross_weight: Decimal,
    pub pure_weight: Decimal,
    pub purity: Option<Purity>,
    pub pieces: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryAggregate {
    pub fn empty(stock_id: StockId) -> Self {
        Self {
            stock_id,
            gross_weight: Decimal::ZERO,
            pure_weight: Decimal::ZERO,
            purity: None,
            pieces: 0,
            updated_at: None,
        }
    }

    /// Add a confirmed movement. Nothing is applied if any total would overflow.
    pub fn receive(
        &mut self,
        stock: &Stock,
        movement: &StockMovement,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let gross = checked_add(self.gross_weight, movement.gross_weight, "inventory gross weight")?;
        let pure = checked_add(self.pure_weight, movement.pure_weight, "inventory pure weight")?;
        let pieces = if stock.is_pcs {
            self.pieces
                .checked_add(i64::from(movement.pieces.unwrap_or(0)))
                .ok_or_else(|| DomainError::validation("inventory piece count out of range"))?
        } else {
            self.pieces
        };

        self.gross_weight = gross;
        self.pure_weight = pure;
        self.pieces = pieces;
        if self.purity.is_none() {
            self.purity = Some(movement.purity);
        }
        self.updated_at = Some(now);
        Ok(())
    }

    /// Take back a previously confirmed movement (revert, delete).
    pub fn release(
        &mut self,
        stock: &Stock,
        movement: &StockMovement,
        policy: UnderflowPolicy,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.gross_weight = policy.subtract(
            self.gross_weight,
            movement.gross_weight,
            "inventory gross weight",
        )?;
        self.pure_weight = policy.subtract(
            self.pure_weight,
            movement.pure_weight,
            "inventory pure weight",
        )?;
        if stock.is_pcs {
            let pieces = Decimal::from(movement.pieces.unwrap_or(0));
            let remaining = policy.subtract(Decimal::from(self.pieces), pieces, "inventory pieces")?;
            self.pieces = remaining
                .to_i64()
                .ok_or_else(|| DomainError::invariant("inventory piece count out of range"))?;
        }
        self.updated_at = Some(now);
        Ok(())
    }
}
