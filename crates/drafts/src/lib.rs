//! Drafts domain module: pending metal transactions and their status machine.
//!
//! A draft reserves gold against a party until it is confirmed or rejected.
//! This crate owns the pure rules (purity normalization, pure-weight
//! recomputation, which status changes are transitions); the side effects on
//! balances, ledger and inventory are applied by the infra engine.

pub mod draft;
pub mod transition;

pub use draft::{Draft, DraftEconomics, DraftPatch, NewDraft, PatchOutcome, Voucher};
pub use transition::{DraftStatus, Transition, TRANSITIONS};
