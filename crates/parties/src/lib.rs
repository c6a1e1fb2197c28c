//! Parties domain module.
//!
//! A party is anyone the business holds metal or cash for. Its balances are
//! embedded in the aggregate and mutated only inside an engine unit of work;
//! this crate holds the arithmetic rules (no IO, no storage).

pub mod party;

pub use party::{BalanceChange, CashBalance, GoldBalance, Party, PartyKind};
