//! `bullion-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the party, inventory,
//! accounting and draft crates (no infrastructure concerns).

pub mod aggregate;
pub mod balance;
pub mod error;
pub mod id;
pub mod metal;
pub mod sequence;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use balance::{UnderflowPolicy, checked_add};
pub use error::{DomainError, DomainResult};
pub use id::{DraftId, EntryId, InventoryLogId, PartyId, StockId, TransferId, UserId};
pub use metal::Purity;
pub use sequence::SequencePattern;
pub use value_object::ValueObject;

/// Decimal type used for weights, purities and cash amounts.
pub use rust_decimal::Decimal;
