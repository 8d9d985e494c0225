//! Internal helpers for input normalization and threshold arithmetic.
//!
//! These utilities are **not** part of the public API. Percentages are
//! compared in integer cents so that `spent / limit >= 80%` never suffers from
//! floating-point rounding.

use crate::Money;

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// `spent / limit * 100 >= percent`, with a zero limit meaning 0%.
pub(crate) fn reaches_percent(spent: Money, limit: Money, percent: i64) -> bool {
    if !limit.is_positive() {
        return percent <= 0;
    }
    i128::from(spent.cents()) * 100 >= i128::from(limit.cents()) * i128::from(percent)
}

/// `spent / limit * 100 < percent`, with a zero limit meaning 0%.
pub(crate) fn below_percent(spent: Money, limit: Money, percent: i64) -> bool {
    !reaches_percent(spent, limit, percent)
}

/// `spent / limit * 100 <= percent`, with a zero limit meaning 0%.
pub(crate) fn at_most_percent(spent: Money, limit: Money, percent: i64) -> bool {
    if !limit.is_positive() {
        return percent >= 0;
    }
    i128::from(spent.cents()) * 100 <= i128::from(limit.cents()) * i128::from(percent)
}

/// Display-only percentage.
pub(crate) fn percentage(spent: Money, limit: Money) -> f64 {
    if !limit.is_positive() {
        return 0.0;
    }
    spent.cents() as f64 / limit.cents() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive_and_exact() {
        let limit = Money::new(10_000);
        assert!(reaches_percent(Money::new(8_000), limit, 80));
        assert!(!reaches_percent(Money::new(7_999), limit, 80));
        assert!(reaches_percent(Money::new(10_000), limit, 100));
        assert!(at_most_percent(Money::new(5_000), limit, 50));
        assert!(!at_most_percent(Money::new(5_001), limit, 50));
    }

    #[test]
    fn zero_limit_means_zero_percent() {
        assert!(!reaches_percent(Money::new(500), Money::ZERO, 80));
        assert!(below_percent(Money::new(500), Money::ZERO, 80));
        assert_eq!(percentage(Money::new(500), Money::ZERO), 0.0);
    }

    #[test]
    fn normalizes_blank_text_to_none() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" a ")), Some("a".to_string()));
    }
}
