//! Sequence Generator: human-readable sequential identifiers.
//!
//! `next` scans for the highest identifier of a kind and returns the next
//! free one. The scan is an optimization only: concurrent writers may still
//! pick the same value, so callers wrap the write in [`with_sequence_retry`]
//! and rely on the store's write-time uniqueness check.

use tracing::warn;

use bullion_core::SequencePattern;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::{StoreResult, UnitOfWork};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    /// Draft numbers (`DRF001`).
    Draft,
    /// Ledger transaction ids (`TRX001`).
    Ledger,
    /// Fund transfer ids (`FTR001`).
    Transfer,
}

impl core::fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            SequenceKind::Draft => "draft number",
            SequenceKind::Ledger => "ledger transaction id",
            SequenceKind::Transfer => "transfer id",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGenerator {
    draft: SequencePattern,
    ledger: SequencePattern,
    transfer: SequencePattern,
    max_attempts: u32,
}

impl SequenceGenerator {
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        Ok(Self {
            draft: SequencePattern::new(config.draft_prefix.as_str(), config.sequence_width)?,
            ledger: SequencePattern::new(config.ledger_prefix.as_str(), config.sequence_width)?,
            transfer: SequencePattern::new(config.transfer_prefix.as_str(), config.sequence_width)?,
            max_attempts: config.max_sequence_retries,
        })
    }

    pub fn pattern(&self, kind: SequenceKind) -> &SequencePattern {
        match kind {
            SequenceKind::Draft => &self.draft,
            SequenceKind::Ledger => &self.ledger,
            SequenceKind::Transfer => &self.transfer,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Next free identifier of `kind` as seen by `tx`.
    pub fn next<U: UnitOfWork>(&self, tx: &U, kind: SequenceKind) -> StoreResult<String> {
        let pattern = self.pattern(kind);
        let mut number = tx.max_sequence(kind, pattern)?.unwrap_or(0) + 1;
        loop {
            let candidate = pattern.format(number);
            if !tx.identifier_exists(kind, &candidate)? {
                return Ok(candidate);
            }
            number += 1;
        }
    }
}

/// Run `attempt` until it stops failing with a unique violation, at most
/// `max_attempts` times. `attempt` receives the 1-based attempt number and is
/// expected to draw a fresh identifier each time.
///
/// Exhausting the attempts is a [`EngineError::Conflict`]; any other error is
/// returned as-is.
pub fn with_sequence_retry<T, F>(max_attempts: u32, kind: SequenceKind, mut attempt: F) -> EngineResult<T>
where
    F: FnMut(u32) -> EngineResult<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut n = 1;
    loop {
        match attempt(n) {
            Err(err) if err.is_unique_violation() => {
                if n >= max_attempts {
                    return Err(EngineError::Conflict(format!(
                        "could not allocate a unique {kind} after {max_attempts} attempts (last collision: {err})"
                    )));
                }
                warn!(%kind, attempt = n, error = %err, "identifier collision; retrying with a fresh one");
                n += 1;
            }
            other => return other,
        }
    }
}
