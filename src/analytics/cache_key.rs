//! # Cache Key Derivation
//!
//! Canonical, order-independent cache keys for reports and exports. Two
//! requests with the same report type, period, and filter set must always
//! derive the same key regardless of how the filters were supplied, so
//! key material is sorted before serialization.

use std::collections::BTreeMap;
use uuid::Uuid;

const KEY_PREFIX: &str = "analytics";
const PAIR_DELIMITER: &str = "|";

/// Derive the cache key for a report.
///
/// The period token is folded into the filter map so it participates in the
/// same canonical ordering as every other dimension.
pub fn report_key(report_type: &str, period_token: &str, filters: &BTreeMap<String, String>) -> String {
    let mut dimensions = filters.clone();
    dimensions.insert("period".to_string(), period_token.to_string());

    let canonical = dimensions
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(PAIR_DELIMITER);

    format!("{KEY_PREFIX}:{report_type}:{canonical}")
}

/// Derive the cache key for a spooled export.
pub fn export_key(export_id: &Uuid) -> String {
    format!("{KEY_PREFIX}:export:{export_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn filters(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn identical_filter_sets_produce_identical_keys() {
        let a = filters(&[("category_id", "x"), ("group_by", "month")]);
        let b = filters(&[("group_by", "month"), ("category_id", "x")]);
        assert_eq!(report_key("revenue", "30d", &a), report_key("revenue", "30d", &b));
    }

    #[test]
    fn key_includes_period_in_sorted_position() {
        let key = report_key("dashboard", "7d", &filters(&[("zone", "eu")]));
        assert_eq!(key, "analytics:dashboard:period=7d|zone=eu");
    }

    #[test]
    fn empty_filters_still_keyed_by_period() {
        let key = report_key("dashboard", "30d", &BTreeMap::new());
        assert_eq!(key, "analytics:dashboard:period=30d");
    }

    #[test]
    fn different_periods_produce_different_keys() {
        let empty = BTreeMap::new();
        assert_ne!(
            report_key("dashboard", "7d", &empty),
            report_key("dashboard", "30d", &empty)
        );
    }

    #[test]
    fn export_key_embeds_id() {
        let id = Uuid::new_v4();
        assert_eq!(export_key(&id), format!("analytics:export:{id}"));
    }

    proptest! {
        /// Insertion order of filter dimensions never changes the key.
        #[test]
        fn key_is_order_independent(
            pairs in proptest::collection::vec(("[a-z_]{1,10}", "[a-z0-9-]{1,10}"), 0..6)
        ) {
            let forward: BTreeMap<String, String> = pairs.iter().cloned().collect();
            let reverse: BTreeMap<String, String> = pairs.iter().rev().cloned().collect();
            prop_assert_eq!(
                report_key("users", "90d", &forward),
                report_key("users", "90d", &reverse)
            );
        }
    }
}
