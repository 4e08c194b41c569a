//! # Numeric Normalization
//!
//! Aggregate queries return `BigDecimal` and nullable counts. Everything is
//! normalized to plain numbers here, at the database boundary, so downstream
//! report code works with a single numeric type. Precision loss beyond 2^53
//! is an accepted limitation for analytics figures.
//!
//! These helpers never fail: missing or dirty inputs degrade to zero.

use bigdecimal::ToPrimitive;
use sqlx::types::BigDecimal;

/// Normalize a decimal aggregate to `f64`. Unrepresentable values become 0.
pub fn decimal(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Normalize a nullable decimal aggregate (e.g. `SUM` over no rows) to `f64`.
pub fn opt_decimal(value: &Option<BigDecimal>) -> f64 {
    value.as_ref().map(decimal).unwrap_or(0.0)
}

/// Normalize a nullable count to `i64`.
pub fn opt_count(value: Option<i64>) -> i64 {
    value.unwrap_or(0)
}

/// Round to two decimal places for presentation-ready ratios.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage growth of `current` over `previous`.
///
/// The zero-previous handling is asymmetric on purpose: growth from nothing
/// to something reports 100%, nothing to nothing reports 0%.
pub fn growth_rate(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        round2((current - previous) / previous * 100.0)
    }
}

/// Percentage of `part` within `whole`; 0 when `whole` is 0.
pub fn rate(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Nearest-rank percentile: sort ascending, take `ceil(p/100 * n) - 1`
/// clamped into range. Empty input yields 0 by convention.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let index = ((p / 100.0 * n as f64).ceil() as usize).saturating_sub(1);
    sorted[index.min(n - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decimal_normalizes_to_f64() {
        let value = BigDecimal::from_str("1234.56").unwrap();
        assert!((decimal(&value) - 1234.56).abs() < f64::EPSILON);
    }

    #[test]
    fn opt_decimal_treats_null_as_zero() {
        assert_eq!(opt_decimal(&None), 0.0);
        let value = Some(BigDecimal::from(42));
        assert_eq!(opt_decimal(&value), 42.0);
    }

    #[test]
    fn opt_count_treats_null_as_zero() {
        assert_eq!(opt_count(None), 0);
        assert_eq!(opt_count(Some(7)), 7);
    }

    #[test]
    fn growth_rate_zero_boundaries() {
        assert_eq!(growth_rate(0.0, 0.0), 0.0);
        assert_eq!(growth_rate(5.0, 0.0), 100.0);
        assert_eq!(growth_rate(50.0, 100.0), -50.0);
    }

    #[test]
    fn growth_rate_regular_case() {
        assert_eq!(growth_rate(150.0, 100.0), 50.0);
        assert_eq!(growth_rate(100.0, 150.0), -33.33);
    }

    #[test]
    fn rate_handles_zero_denominator() {
        assert_eq!(rate(5, 0), 0.0);
        assert_eq!(rate(1, 4), 25.0);
    }

    #[test]
    fn percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[], 99.0), 0.0);
    }

    #[test]
    fn percentile_nearest_rank() {
        // ceil(0.5 * 4) - 1 = 1 -> second element ascending
        assert_eq!(percentile(&[10.0, 20.0, 30.0, 40.0], 50.0), 20.0);
        assert_eq!(percentile(&[40.0, 10.0, 30.0, 20.0], 50.0), 20.0);
    }

    #[test]
    fn percentile_clamps_extremes() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 3.0);
        assert_eq!(percentile(&values, 200.0), 3.0);
    }
}
