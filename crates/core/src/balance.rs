//! Non-negative balance arithmetic.
//!
//! Gold balances, inventory weights and reservations must never go negative.
//! What happens when a subtraction would underflow is a policy decision made by
//! configuration: clamp the result to zero, or fail the unit of work.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// How a subtraction below zero is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnderflowPolicy {
    /// Clamp to zero and record the shortfall in the logs.
    #[default]
    Clamp,
    /// Fail the operation with an invariant violation.
    Reject,
}

impl UnderflowPolicy {
    /// Subtract `amount` from `current`, applying the policy on underflow.
    ///
    /// `what` names the balance for diagnostics (e.g. `"draft balance"`).
    pub fn subtract(self, current: Decimal, amount: Decimal, what: &str) -> DomainResult<Decimal> {
        let result = current
            .checked_sub(amount)
            .ok_or_else(|| out_of_range(what, current, amount))?;
        if result >= Decimal::ZERO {
            return Ok(result);
        }
        match self {
            UnderflowPolicy::Clamp => {
                tracing::warn!(
                    balance = what,
                    current = %current,
                    amount = %amount,
                    shortfall = %(-result),
                    "balance underflow clamped to zero"
                );
                Ok(Decimal::ZERO)
            }
            UnderflowPolicy::Reject => Err(DomainError::invariant(format!(
                "{what} would go negative ({current} - {amount})"
            ))),
        }
    }
}

impl core::str::FromStr for UnderflowPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(UnderflowPolicy::Clamp),
            "reject" => Ok(UnderflowPolicy::Reject),
            other => Err(DomainError::validation(format!(
                "underflow policy must be one of: clamp, reject (got {other:?})"
            ))),
        }
    }
}

/// `current + amount`, failing instead of overflowing the decimal range.
pub fn checked_add(current: Decimal, amount: Decimal, what: &str) -> DomainResult<Decimal> {
    current
        .checked_add(amount)
        .ok_or_else(|| out_of_range(what, current, amount))
}

fn out_of_range(what: &str, current: Decimal, amount: Decimal) -> DomainError {
    DomainError::validation(format!(
        "{what} out of range ({current} with a movement of {amount})"
    ))
}
