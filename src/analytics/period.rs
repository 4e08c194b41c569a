//! # Period Resolution
//!
//! Maps symbolic time-range tokens to absolute windows. Unrecognized or
//! absent tokens silently fall back to thirty days; callers never see a
//! parse error from this module.

use chrono::{DateTime, Duration, Utc};

/// Symbolic reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Days7,
    Days30,
    Days90,
    Year1,
}

impl Default for Period {
    fn default() -> Self {
        Period::Days30
    }
}

impl Period {
    /// Parse a period token. Anything outside the accepted set, including
    /// `None`, resolves to the thirty-day default.
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            Some("7d") => Period::Days7,
            Some("30d") => Period::Days30,
            Some("90d") => Period::Days90,
            Some("1y") => Period::Year1,
            _ => Period::default(),
        }
    }

    /// Normalized token for cache keys and response documents.
    pub fn token(&self) -> &'static str {
        match self {
            Period::Days7 => "7d",
            Period::Days30 => "30d",
            Period::Days90 => "90d",
            Period::Year1 => "1y",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Period::Days7 => Duration::days(7),
            Period::Days30 => Duration::days(30),
            Period::Days90 => Duration::days(90),
            Period::Year1 => Duration::days(365),
        }
    }

    /// Resolve against an explicit "now" so tests can freeze the clock.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> ResolvedPeriod {
        ResolvedPeriod {
            period: *self,
            start: now - self.duration(),
            end: now,
        }
    }

    /// Resolve against the wall clock.
    pub fn resolve(&self) -> ResolvedPeriod {
        self.resolve_at(Utc::now())
    }
}

/// Trend bucket size for time-series breakdowns.
///
/// Parsed with the same silent-fallback policy as [`Period`]: anything
/// outside the accepted set resolves to monthly buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Day,
    Week,
    Month,
}

impl Default for Grouping {
    fn default() -> Self {
        Grouping::Month
    }
}

impl Grouping {
    pub fn parse(token: Option<&str>) -> Self {
        match token {
            Some("day") => Grouping::Day,
            Some("week") => Grouping::Week,
            Some("month") => Grouping::Month,
            _ => Grouping::default(),
        }
    }

    /// Normalized token for cache keys and response documents.
    pub fn token(&self) -> &'static str {
        match self {
            Grouping::Day => "day",
            Grouping::Week => "week",
            Grouping::Month => "month",
        }
    }

    /// Unit string accepted by Postgres `date_trunc`.
    pub fn trunc_unit(&self) -> &'static str {
        self.token()
    }
}

/// An absolute reporting window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPeriod {
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ResolvedPeriod {
    pub fn token(&self) -> &'static str {
        self.period.token()
    }

    /// Start of the equal-length window immediately preceding this one.
    ///
    /// Growth figures compare `[previous_start, start)` against
    /// `[start, end)`. When the platform is younger than two periods the
    /// previous window is empty and growth reports the 100%-from-zero case.
    pub fn previous_start(&self) -> DateTime<Utc> {
        self.start - (self.end - self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn frozen_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn parses_accepted_tokens() {
        assert_eq!(Period::parse(Some("7d")), Period::Days7);
        assert_eq!(Period::parse(Some("30d")), Period::Days30);
        assert_eq!(Period::parse(Some("90d")), Period::Days90);
        assert_eq!(Period::parse(Some("1y")), Period::Year1);
    }

    #[test]
    fn unknown_tokens_fall_back_to_default() {
        for bad in [Some("14d"), Some(""), Some("1Y"), Some("month"), None] {
            assert_eq!(Period::parse(bad), Period::Days30);
        }
    }

    #[test]
    fn fallback_resolves_identically_to_explicit_30d() {
        let now = frozen_now();
        let fallback = Period::parse(Some("bogus")).resolve_at(now);
        let explicit = Period::parse(Some("30d")).resolve_at(now);
        assert_eq!(fallback, explicit);
    }

    #[test]
    fn resolution_is_pure_given_now() {
        let now = frozen_now();
        let a = Period::Days7.resolve_at(now);
        let b = Period::Days7.resolve_at(now);
        assert_eq!(a, b);
        assert_eq!(a.start, now - Duration::days(7));
        assert_eq!(a.token(), "7d");
    }

    #[test]
    fn one_year_is_365_days() {
        let resolved = Period::Year1.resolve_at(frozen_now());
        assert_eq!(resolved.end - resolved.start, Duration::days(365));
    }

    #[test]
    fn grouping_parses_accepted_tokens() {
        assert_eq!(Grouping::parse(Some("day")), Grouping::Day);
        assert_eq!(Grouping::parse(Some("week")), Grouping::Week);
        assert_eq!(Grouping::parse(Some("month")), Grouping::Month);
    }

    #[test]
    fn unknown_grouping_falls_back_to_month() {
        for bad in [Some("quarter"), Some(""), Some("Day"), None] {
            assert_eq!(Grouping::parse(bad), Grouping::Month);
        }
    }

    #[test]
    fn previous_window_has_equal_duration_ending_at_start() {
        let resolved = Period::Days30.resolve_at(frozen_now());
        let previous_start = resolved.previous_start();
        assert_eq!(resolved.start - previous_start, Duration::days(30));
    }
}
