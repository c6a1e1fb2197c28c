//! Inventory domain module.
//!
//! Stock master records (as consumed by the engine), the per-stock running
//! aggregate of gross/pure weight, and the per-movement inventory log.
//! Deterministic domain logic only (no IO, no storage).

pub mod item;
pub mod log;

pub use item::{InventoryAggregate, Stock, StockMovement};
pub use log::{InventoryAction, InventoryLog, InventoryLogFilter};
