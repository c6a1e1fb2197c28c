//! Metal purity and pure-weight arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Purity of a metal lot, always held as a fraction in `[0, 1]`.
///
/// Input may arrive either as a fraction (`0.75`) or as a percentage (`75`).
/// Values in `[0, 1]` are read as fractions, values in `(1, 100]` as
/// percentages; `1` therefore means fine metal, not one percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Purity(Decimal);

impl ValueObject for Purity {}

impl Purity {
    pub const ZERO: Purity = Purity(Decimal::ZERO);
    pub const FINE: Purity = Purity(Decimal::ONE);

    /// Normalize user input (fraction or percentage) into a fraction.
    pub fn normalize(input: Decimal) -> DomainResult<Self> {
        if input.is_sign_negative() && !input.is_zero() {
            return Err(DomainError::validation(format!(
                "purity cannot be negative (got {input})"
            )));
        }
        let fraction = if input <= Decimal::ONE {
            input
        } else if input <= Decimal::ONE_HUNDRED {
            input / Decimal::ONE_HUNDRED
        } else {
            return Err(DomainError::validation(format!(
                "purity must be a fraction in [0, 1] or a percentage in (1, 100] (got {input})"
            )));
        };
        Ok(Self(fraction.normalize()))
    }

    /// Wrap a value already known to be a fraction.
    pub fn from_fraction(fraction: Decimal) -> DomainResult<Self> {
        if fraction < Decimal::ZERO || fraction > Decimal::ONE {
            return Err(DomainError::invariant(format!(
                "stored purity {fraction} is outside [0, 1]"
            )));
        }
        Ok(Self(fraction.normalize()))
    }

    pub fn fraction(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Gold content of `gross_weight` at this purity.
    pub fn pure_weight(&self, gross_weight: Decimal) -> Decimal {
        (gross_weight * self.0).normalize()
    }
}

impl core::fmt::Display for Purity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn percentage_and_fraction_normalize_identically() {
        let from_pct = Purity::normalize(d("50")).unwrap();
        let from_frac = Purity::normalize(d("0.5")).unwrap();
        assert_eq!(from_pct, from_frac);
        assert_eq!(from_pct.fraction().to_string(), "0.5");
        assert_eq!(
            from_pct.pure_weight(d("10")),
            from_frac.pure_weight(d("10"))
        );
    }

    #[test]
    fn seventy_five_percent_of_ten_grams_is_seven_and_a_half() {
        let purity = Purity::normalize(d("75")).unwrap();
        assert_eq!(purity.fraction(), d("0.75"));
        assert_eq!(purity.pure_weight(d("10")), d("7.5"));
        assert_eq!(purity.pure_weight(d("10")).to_string(), "7.5");
    }

    #[test]
    fn one_is_read_as_fine_metal() {
        assert_eq!(Purity::normalize(Decimal::ONE).unwrap(), Purity::FINE);
        assert_eq!(Purity::normalize(d("100")).unwrap(), Purity::FINE);
    }

    #[test]
    fn out_of_range_input_is_rejected() {
        assert!(matches!(
            Purity::normalize(d("-0.1")),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            Purity::normalize(d("100.01")),
            Err(DomainError::Validation(_))
        ));
        assert!(Purity::from_fraction(d("1.2")).is_err());
    }

    proptest! {
        /// Any percentage in (1, 100] normalizes to the same purity as its fraction.
        #[test]
        fn percentage_matches_fraction(hundredths in 101u32..=10_000u32, gross in 0u32..100_000u32) {
            let pct = Decimal::new(hundredths as i64, 2);
            let frac = pct / Decimal::ONE_HUNDRED;
            let a = Purity::normalize(pct).unwrap();
            let b = Purity::normalize(frac).unwrap();
            prop_assert_eq!(a, b);
            let gross = Decimal::new(gross as i64, 3);
            prop_assert_eq!(a.pure_weight(gross), b.pure_weight(gross));
            prop_assert!(a.fraction() <= Decimal::ONE);
        }
    }
}
