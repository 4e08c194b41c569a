//! Integration tests for the report cache read-through path, using the
//! in-process Moka backend so TTL behavior is exercised for real.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use coursedash_core::analytics::{ReportCache, ReportTopic};
use coursedash_core::cache::CacheProvider;
use coursedash_core::config::ReportTtlConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FakeReport {
    label: String,
    value: f64,
}

fn cache_with_ttls(ttls: ReportTtlConfig) -> ReportCache {
    ReportCache::new(
        CacheProvider::in_memory(1024, Duration::from_secs(3600)),
        ttls,
    )
}

fn sample() -> FakeReport {
    FakeReport {
        label: "dashboard".to_string(),
        value: 42.5,
    }
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    let cache = cache_with_ttls(ReportTtlConfig::default());
    let filters = BTreeMap::new();
    let computes = AtomicUsize::new(0);

    let compute = || async {
        computes.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Infallible>(sample())
    };

    let (first, first_cached) = cache
        .read_through(ReportTopic::Dashboard, "30d", &filters, false, compute)
        .await
        .unwrap();
    assert!(!first_cached);

    let compute = || async {
        computes.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Infallible>(sample())
    };
    let (second, second_cached) = cache
        .read_through(ReportTopic::Dashboard, "30d", &filters, false, compute)
        .await
        .unwrap();

    assert!(second_cached);
    assert_eq!(first, second);
    assert_eq!(computes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_bypasses_and_overwrites_the_cached_copy() {
    let cache = cache_with_ttls(ReportTtlConfig::default());
    let filters = BTreeMap::new();

    let (_, _) = cache
        .read_through(ReportTopic::Users, "7d", &filters, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "stale".to_string(),
                value: 1.0,
            })
        })
        .await
        .unwrap();

    let (refreshed, cached) = cache
        .read_through(ReportTopic::Users, "7d", &filters, true, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "fresh".to_string(),
                value: 2.0,
            })
        })
        .await
        .unwrap();
    assert!(!cached);
    assert_eq!(refreshed.label, "fresh");

    // The refresh result replaced the stale copy.
    let (after, cached) = cache
        .read_through(ReportTopic::Users, "7d", &filters, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "unused".to_string(),
                value: 3.0,
            })
        })
        .await
        .unwrap();
    assert!(cached);
    assert_eq!(after.label, "fresh");
}

#[tokio::test]
async fn different_filters_never_collide() {
    let cache = cache_with_ttls(ReportTtlConfig::default());

    let mut eu = BTreeMap::new();
    eu.insert("category_id".to_string(), "abc".to_string());
    let unfiltered = BTreeMap::new();

    cache
        .read_through(ReportTopic::Courses, "30d", &eu, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "filtered".to_string(),
                value: 1.0,
            })
        })
        .await
        .unwrap();

    let (report, cached) = cache
        .read_through(ReportTopic::Courses, "30d", &unfiltered, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "unfiltered".to_string(),
                value: 2.0,
            })
        })
        .await
        .unwrap();

    assert!(!cached);
    assert_eq!(report.label, "unfiltered");
}

#[tokio::test]
async fn trend_groupings_are_cached_independently() {
    let cache = cache_with_ttls(ReportTtlConfig::default());

    let mut monthly = BTreeMap::new();
    monthly.insert("group_by".to_string(), "month".to_string());
    let mut daily = BTreeMap::new();
    daily.insert("group_by".to_string(), "day".to_string());

    cache
        .read_through(ReportTopic::Revenue, "30d", &monthly, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "monthly".to_string(),
                value: 1.0,
            })
        })
        .await
        .unwrap();

    let (report, cached) = cache
        .read_through(ReportTopic::Revenue, "30d", &daily, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "daily".to_string(),
                value: 2.0,
            })
        })
        .await
        .unwrap();
    assert!(!cached);
    assert_eq!(report.label, "daily");

    // Same grouping again hits the stored monthly copy.
    let (report, cached) = cache
        .read_through(ReportTopic::Revenue, "30d", &monthly, false, || async {
            Ok::<_, Infallible>(FakeReport {
                label: "unused".to_string(),
                value: 3.0,
            })
        })
        .await
        .unwrap();
    assert!(cached);
    assert_eq!(report.label, "monthly");
}

#[tokio::test]
async fn expired_entries_are_recomputed() {
    let ttls = ReportTtlConfig {
        realtime_seconds: 0,
        ..ReportTtlConfig::default()
    };
    let cache = cache_with_ttls(ttls);
    let filters = BTreeMap::new();

    cache
        .read_through(ReportTopic::Realtime, "now", &filters, false, || async {
            Ok::<_, Infallible>(sample())
        })
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;

    let (_, cached) = cache
        .read_through(ReportTopic::Realtime, "now", &filters, false, || async {
            Ok::<_, Infallible>(sample())
        })
        .await
        .unwrap();
    assert!(!cached, "zero-TTL entry must not be served from cache");
}

#[tokio::test]
async fn compute_errors_propagate_and_nothing_is_cached() {
    let cache = cache_with_ttls(ReportTtlConfig::default());
    let filters = BTreeMap::new();

    let result: Result<(FakeReport, bool), &str> = cache
        .read_through(ReportTopic::Revenue, "90d", &filters, false, || async {
            Err("database down")
        })
        .await;
    assert_eq!(result.unwrap_err(), "database down");

    // A later successful compute is a miss, not a hit on a poisoned entry.
    let (_, cached) = cache
        .read_through(ReportTopic::Revenue, "90d", &filters, false, || async {
            Ok::<_, Infallible>(sample())
        })
        .await
        .unwrap();
    assert!(!cached);
}

#[tokio::test]
async fn noop_provider_always_recomputes() {
    let cache = ReportCache::new(CacheProvider::noop(), ReportTtlConfig::default());
    let filters = BTreeMap::new();

    for _ in 0..2 {
        let (_, cached) = cache
            .read_through(ReportTopic::Dashboard, "30d", &filters, false, || async {
                Ok::<_, Infallible>(sample())
            })
            .await
            .unwrap();
        assert!(!cached);
    }
}
