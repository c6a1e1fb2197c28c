//! Draft status and the transition table.

use serde::{Deserialize, Serialize};

use bullion_core::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Confirmed,
    Rejected,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Draft => "draft",
            DraftStatus::Confirmed => "confirmed",
            DraftStatus::Rejected => "rejected",
        }
    }

    /// The side-effecting transition from `self` to `next`, if there is one.
    ///
    /// Pairs not in [`TRANSITIONS`] (including `self == next`) yield `None`:
    /// the request is a field update only and the status stays as it is.
    pub fn transition_to(self, next: DraftStatus) -> Option<Transition> {
        TRANSITIONS
            .iter()
            .find(|(from, to, _)| *from == self && *to == next)
            .map(|(_, _, t)| *t)
    }
}

impl core::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DraftStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(DraftStatus::Draft),
            "confirmed" => Ok(DraftStatus::Confirmed),
            "rejected" => Ok(DraftStatus::Rejected),
            _ => Err(DomainError::validation(format!(
                "status must be one of: draft, confirmed, rejected (got {s:?})"
            ))),
        }
    }
}

/// Compensating operation run when a draft changes status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// draft → confirmed: reservation becomes confirmed gold and stock.
    Confirm,
    /// draft → rejected: reservation and provisional entries are dropped.
    Reject,
    /// confirmed → draft: confirmation is undone, reservation restored.
    Revert,
}

impl Transition {
    pub fn source(self) -> DraftStatus {
        match self {
            Transition::Confirm | Transition::Reject => DraftStatus::Draft,
            Transition::Revert => DraftStatus::Confirmed,
        }
    }

    pub fn target(self) -> DraftStatus {
        match self {
            Transition::Confirm => DraftStatus::Confirmed,
            Transition::Reject => DraftStatus::Rejected,
            Transition::Revert => DraftStatus::Draft,
        }
    }
}

/// `(from, to) → handler`. Anything else is not a transition.
pub const TRANSITIONS: [(DraftStatus, DraftStatus, Transition); 3] = [
    (DraftStatus::Draft, DraftStatus::Confirmed, Transition::Confirm),
    (DraftStatus::Draft, DraftStatus::Rejected, Transition::Reject),
    (DraftStatus::Confirmed, DraftStatus::Draft, Transition::Revert),
];
