//! # Report Cache
//!
//! Read-through cache for assembled report documents. Writes are best-effort:
//! a failing cache backend costs recomputation, never a failed request. Cache
//! read errors are logged and treated as misses for the same reason.
//!
//! There is no invalidation on write to the transactional tables; staleness
//! up to the topic TTL is the accepted tradeoff.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache_key;
use crate::cache::CacheProvider;
use crate::config::ReportTtlConfig;

/// Report topics with distinct TTL policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTopic {
    Dashboard,
    Users,
    Courses,
    Revenue,
    Engagement,
    Realtime,
}

impl ReportTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportTopic::Dashboard => "dashboard",
            ReportTopic::Users => "users",
            ReportTopic::Courses => "courses",
            ReportTopic::Revenue => "revenue",
            ReportTopic::Engagement => "engagement",
            ReportTopic::Realtime => "realtime",
        }
    }

    fn ttl(&self, ttls: &ReportTtlConfig) -> Duration {
        let seconds = match self {
            ReportTopic::Dashboard => ttls.dashboard_seconds,
            ReportTopic::Users => ttls.users_seconds,
            ReportTopic::Courses => ttls.courses_seconds,
            ReportTopic::Revenue => ttls.revenue_seconds,
            ReportTopic::Engagement => ttls.engagement_seconds,
            ReportTopic::Realtime => ttls.realtime_seconds,
        };
        Duration::from_secs(seconds)
    }
}

#[derive(Clone)]
pub struct ReportCache {
    provider: CacheProvider,
    ttls: ReportTtlConfig,
}

impl ReportCache {
    pub fn new(provider: CacheProvider, ttls: ReportTtlConfig) -> Self {
        Self { provider, ttls }
    }

    pub fn provider(&self) -> &CacheProvider {
        &self.provider
    }

    /// Look up a cached report. Backend errors and undecodable payloads are
    /// treated as misses.
    pub async fn get<T: DeserializeOwned>(
        &self,
        topic: ReportTopic,
        period_token: &str,
        filters: &BTreeMap<String, String>,
    ) -> Option<T> {
        let key = cache_key::report_key(topic.as_str(), period_token, filters);

        match self.provider.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(document) => Some(document),
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cached report");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store an assembled report with the topic's TTL. Best-effort.
    pub async fn put<T: Serialize>(
        &self,
        topic: ReportTopic,
        period_token: &str,
        filters: &BTreeMap<String, String>,
        document: &T,
    ) {
        let key = cache_key::report_key(topic.as_str(), period_token, filters);

        let raw = match serde_json::to_string(document) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize report for caching");
                return;
            }
        };

        let ttl = topic.ttl(&self.ttls);
        if let Err(e) = self.provider.set(&key, &raw, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed, continuing without cache");
        } else {
            debug!(key = %key, ttl_seconds = ttl.as_secs(), "Report cached");
        }
    }

    /// Read-through helper: return the cached document unless `refresh` is
    /// set, otherwise compute, write back, and report whether the result was
    /// served from cache.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        topic: ReportTopic,
        period_token: &str,
        filters: &BTreeMap<String, String>,
        refresh: bool,
        compute: F,
    ) -> Result<(T, bool), E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !refresh {
            if let Some(document) = self.get::<T>(topic, period_token, filters).await {
                return Ok((document, true));
            }
        }

        let document = compute().await?;
        self.put(topic, period_token, filters, &document).await;
        Ok((document, false))
    }
}
