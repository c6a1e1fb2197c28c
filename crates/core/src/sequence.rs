//! Human-readable sequential identifiers (`DRF001`, `TRX042`, ...).

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Fixed prefix + zero-padded numeric suffix.
///
/// Numbers wider than `width` are rendered in full (`DRF1000`), so the
/// pattern is `^PREFIX\d+$` rather than a fixed-length string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencePattern {
    prefix: String,
    width: usize,
}

impl ValueObject for SequencePattern {}

impl SequencePattern {
    pub const PREFIX_LEN: usize = 3;

    pub fn new(prefix: impl Into<String>, width: usize) -> DomainResult<Self> {
        let prefix = prefix.into();
        if prefix.len() != Self::PREFIX_LEN || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "sequence prefix must be {} uppercase ASCII letters (got {prefix:?})",
                Self::PREFIX_LEN
            )));
        }
        if width == 0 {
            return Err(DomainError::validation("sequence width must be positive"));
        }
        Ok(Self { prefix, width })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.width)
    }

    /// Numeric suffix of `value`, or `None` if it does not match the pattern.
    pub fn parse(&self, value: &str) -> Option<u64> {
        let digits = value.strip_prefix(self.prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    pub fn matches(&self, value: &str) -> bool {
        self.parse(value).is_some()
    }
}

impl core::fmt::Display for SequencePattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}", self.prefix, "#".repeat(self.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_zero_padding() {
        let p = SequencePattern::new("DRF", 3).unwrap();
        assert_eq!(p.format(1), "DRF001");
        assert_eq!(p.format(42), "DRF042");
        assert_eq!(p.format(1000), "DRF1000");
    }

    #[test]
    fn parses_only_matching_identifiers() {
        let p = SequencePattern::new("TRX", 3).unwrap();
        assert_eq!(p.parse("TRX007"), Some(7));
        assert_eq!(p.parse("TRX1234"), Some(1234));
        assert_eq!(p.parse("DRF007"), None);
        assert_eq!(p.parse("TRX"), None);
        assert_eq!(p.parse("TRX12a"), None);
        assert_eq!(p.parse("TRX-12"), None);
    }

    #[test]
    fn rejects_malformed_prefixes() {
        assert!(SequencePattern::new("DR", 3).is_err());
        assert!(SequencePattern::new("drf", 3).is_err());
        assert!(SequencePattern::new("DRF", 0).is_err());
    }
}
