//! # Report Assembler
//!
//! Runs the fixed aggregate query batch for a report type concurrently and
//! folds the rows into a nested document. The join is all-or-nothing: a
//! failure in any query fails the whole assembly, there is no partial-report
//! degradation.
//!
//! Growth, conversion, retention, and churn figures compare the requested
//! window against the equal-length window immediately preceding it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::export::{ExportData, ExportOptions, ExportType};
use super::numeric;
use super::period::{Grouping, ResolvedPeriod};
use crate::database::queries::{CoursePerformance, StudentActivity};
use crate::database::AggregateQueryExecutor;
use crate::error::CoreError;

const TOP_COURSES_LIMIT: i64 = 10;
const TOP_LEARNERS_LIMIT: i64 = 10;
const EXPORT_ROW_LIMIT: i64 = 10_000;

#[derive(Clone)]
pub struct ReportAssembler {
    queries: AggregateQueryExecutor,
}

/// Headline totals across the whole platform.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_users: i64,
    pub active_users: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
    pub total_revenue: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    pub new_users: i64,
    pub previous_new_users: i64,
    pub user_growth_rate: f64,
    pub active_users: i64,
    pub retention_rate: f64,
    pub churn_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub period_revenue: f64,
    pub previous_revenue: f64,
    pub revenue_growth_rate: f64,
    pub transactions: i64,
    pub average_order_value: f64,
    pub refunded_amount: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseAnalytics {
    pub total_courses: i64,
    pub published_courses: i64,
    pub new_courses: i64,
    pub completion_rate: f64,
    pub top_courses: Vec<CourseEntry>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseEntry {
    pub course_id: Uuid,
    pub title: String,
    pub enrollments: i64,
    pub revenue: f64,
    pub average_rating: f64,
    pub completion_rate: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRevenueEntry {
    pub category: String,
    pub revenue: f64,
    pub enrollments: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub lesson_completions: i64,
    pub active_learners: i64,
    pub average_progress: f64,
    pub progress_90th_percentile: f64,
    pub reviews_submitted: i64,
    pub average_rating: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub pending_payments: i64,
    pub failed_payments_24h: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeographicEntry {
    pub country: String,
    pub users: i64,
    pub revenue: f64,
}

/// The admin dashboard overview document.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub summary: Summary,
    pub user_analytics: UserAnalytics,
    pub financial_metrics: FinancialMetrics,
    pub course_analytics: CourseAnalytics,
    pub revenue_by_category: Vec<CategoryRevenueEntry>,
    pub engagement: Engagement,
    pub system_health: SystemHealth,
    pub geographic_analytics: Vec<GeographicEntry>,
    pub period: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleEntry {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LearnerEntry {
    pub user_id: Uuid,
    pub full_name: String,
    pub enrollments: i64,
    pub completions: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserReport {
    pub total_users: i64,
    pub new_users: i64,
    pub user_growth_rate: f64,
    pub active_users: i64,
    pub retention_rate: f64,
    pub churn_rate: f64,
    pub role_distribution: Vec<RoleEntry>,
    pub top_learners: Vec<LearnerEntry>,
    pub period: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryEntry {
    pub category: String,
    pub courses: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseReport {
    pub total_courses: i64,
    pub published_courses: i64,
    pub new_courses: i64,
    pub enrollment_growth_rate: f64,
    pub completion_rate: f64,
    pub top_courses: Vec<CourseEntry>,
    pub category_distribution: Vec<CategoryEntry>,
    pub period: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueTrendEntry {
    pub bucket: DateTime<Utc>,
    pub revenue: f64,
    pub transactions: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub total_revenue: f64,
    pub period_revenue: f64,
    pub revenue_growth_rate: f64,
    pub transactions: i64,
    pub average_order_value: f64,
    pub refunded_amount: f64,
    pub trend: Vec<RevenueTrendEntry>,
    pub revenue_by_category: Vec<CategoryRevenueEntry>,
    pub grouping: String,
    pub period: String,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngagementReport {
    #[serde(flatten)]
    pub engagement: Engagement,
    pub top_learners: Vec<LearnerEntry>,
    pub period: String,
    pub last_updated: DateTime<Utc>,
}

/// Live platform pulse; intentionally period-free.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeReport {
    pub active_sessions: i64,
    pub enrollments_last_hour: i64,
    pub signups_today: i64,
    pub revenue_today: f64,
    pub last_updated: DateTime<Utc>,
}

impl ReportAssembler {
    pub fn new(queries: AggregateQueryExecutor) -> Self {
        Self { queries }
    }

    /// Assemble the dashboard overview. All aggregate queries for the report
    /// start together; the fold begins only once every one of them finished.
    pub async fn dashboard(&self, window: &ResolvedPeriod) -> Result<DashboardReport, sqlx::Error> {
        let start = window.start;
        let previous_start = window.previous_start();

        let (
            users,
            revenue,
            courses,
            enrollments,
            by_category,
            engagement,
            progress,
            geography,
            payment_health,
            top_courses,
            retention,
        ) = tokio::try_join!(
            self.queries.user_counts(start, previous_start),
            self.queries.revenue_totals(start, previous_start),
            self.queries.course_counts(start),
            self.queries.enrollment_stats(start, previous_start),
            self.queries.revenue_by_category(start),
            self.queries.engagement_stats(start),
            self.queries.progress_values(start),
            self.queries.geographic_breakdown(start),
            self.queries.payment_health_counts(),
            self.queries.top_courses(start, None, TOP_COURSES_LIMIT),
            self.queries.retention_counts(start, previous_start),
        )?;

        let period_revenue = numeric::opt_decimal(&revenue.period_revenue);
        let previous_revenue = numeric::opt_decimal(&revenue.previous_revenue);
        let retention_rate = numeric::rate(retention.retained, retention.previous_active);
        let progress_values: Vec<f64> = progress
            .iter()
            .map(|row| numeric::opt_decimal(&row.progress))
            .collect();

        Ok(DashboardReport {
            summary: Summary {
                total_users: users.total_users,
                active_users: users.active_users,
                total_courses: courses.total_courses,
                total_enrollments: enrollments.total_enrollments,
                total_revenue: numeric::opt_decimal(&revenue.total_revenue),
            },
            user_analytics: UserAnalytics {
                new_users: users.new_users,
                previous_new_users: users.previous_new_users,
                user_growth_rate: numeric::growth_rate(
                    users.new_users as f64,
                    users.previous_new_users as f64,
                ),
                active_users: users.active_users,
                retention_rate,
                churn_rate: numeric::round2(100.0 - retention_rate),
            },
            financial_metrics: FinancialMetrics {
                period_revenue,
                previous_revenue,
                revenue_growth_rate: numeric::growth_rate(period_revenue, previous_revenue),
                transactions: revenue.period_transactions,
                average_order_value: numeric::opt_decimal(&revenue.avg_order_value),
                refunded_amount: numeric::opt_decimal(&revenue.refunded_amount),
                conversion_rate: numeric::rate(
                    revenue.period_transactions,
                    enrollments.period_enrollments,
                ),
            },
            course_analytics: CourseAnalytics {
                total_courses: courses.total_courses,
                published_courses: courses.published_courses,
                new_courses: courses.new_courses,
                completion_rate: numeric::rate(
                    enrollments.completed_enrollments,
                    enrollments.total_enrollments,
                ),
                top_courses: top_courses.into_iter().map(course_entry).collect(),
            },
            revenue_by_category: by_category
                .into_iter()
                .map(|row| CategoryRevenueEntry {
                    category: row.category_name,
                    revenue: numeric::opt_decimal(&row.revenue),
                    enrollments: row.enrollments,
                })
                .collect(),
            engagement: Engagement {
                lesson_completions: engagement.lesson_completions,
                active_learners: engagement.active_learners,
                average_progress: numeric::opt_decimal(&engagement.avg_progress),
                progress_90th_percentile: numeric::percentile(&progress_values, 90.0),
                reviews_submitted: engagement.reviews_submitted,
                average_rating: numeric::opt_decimal(&engagement.avg_rating),
            },
            system_health: SystemHealth {
                pending_payments: payment_health.pending_payments,
                failed_payments_24h: payment_health.failed_payments_24h,
            },
            geographic_analytics: geography
                .into_iter()
                .map(|row| GeographicEntry {
                    country: row.country.unwrap_or_else(|| "unknown".to_string()),
                    users: row.users,
                    revenue: numeric::opt_decimal(&row.revenue),
                })
                .collect(),
            period: window.token().to_string(),
            last_updated: Utc::now(),
        })
    }

    pub async fn users(&self, window: &ResolvedPeriod) -> Result<UserReport, sqlx::Error> {
        let start = window.start;
        let previous_start = window.previous_start();

        let (counts, roles, learners, retention) = tokio::try_join!(
            self.queries.user_counts(start, previous_start),
            self.queries.role_distribution(),
            self.queries.top_learners(start, TOP_LEARNERS_LIMIT),
            self.queries.retention_counts(start, previous_start),
        )?;

        let retention_rate = numeric::rate(retention.retained, retention.previous_active);

        Ok(UserReport {
            total_users: counts.total_users,
            new_users: counts.new_users,
            user_growth_rate: numeric::growth_rate(
                counts.new_users as f64,
                counts.previous_new_users as f64,
            ),
            active_users: counts.active_users,
            retention_rate,
            churn_rate: numeric::round2(100.0 - retention_rate),
            role_distribution: roles
                .into_iter()
                .map(|row| RoleEntry {
                    role: row.role,
                    count: row.count,
                })
                .collect(),
            top_learners: learners.into_iter().map(learner_entry).collect(),
            period: window.token().to_string(),
            last_updated: Utc::now(),
        })
    }

    pub async fn courses(
        &self,
        window: &ResolvedPeriod,
        category_id: Option<Uuid>,
    ) -> Result<CourseReport, sqlx::Error> {
        let start = window.start;
        let previous_start = window.previous_start();

        let (counts, top, categories, enrollments) = tokio::try_join!(
            self.queries.course_counts(start),
            self.queries.top_courses(start, category_id, TOP_COURSES_LIMIT),
            self.queries.category_distribution(),
            self.queries.enrollment_stats(start, previous_start),
        )?;

        Ok(CourseReport {
            total_courses: counts.total_courses,
            published_courses: counts.published_courses,
            new_courses: counts.new_courses,
            enrollment_growth_rate: numeric::growth_rate(
                enrollments.period_enrollments as f64,
                enrollments.previous_enrollments as f64,
            ),
            completion_rate: numeric::rate(
                enrollments.completed_enrollments,
                enrollments.total_enrollments,
            ),
            top_courses: top.into_iter().map(course_entry).collect(),
            category_distribution: categories
                .into_iter()
                .map(|row| CategoryEntry {
                    category: row.category_name,
                    courses: row.courses,
                })
                .collect(),
            period: window.token().to_string(),
            last_updated: Utc::now(),
        })
    }

    pub async fn revenue(
        &self,
        window: &ResolvedPeriod,
        grouping: Grouping,
    ) -> Result<RevenueReport, sqlx::Error> {
        let start = window.start;
        let previous_start = window.previous_start();

        let (totals, trend, by_category) = tokio::try_join!(
            self.queries.revenue_totals(start, previous_start),
            self.queries.revenue_trend(start, grouping.trunc_unit()),
            self.queries.revenue_by_category(start),
        )?;

        let period_revenue = numeric::opt_decimal(&totals.period_revenue);
        let previous_revenue = numeric::opt_decimal(&totals.previous_revenue);

        Ok(RevenueReport {
            total_revenue: numeric::opt_decimal(&totals.total_revenue),
            period_revenue,
            revenue_growth_rate: numeric::growth_rate(period_revenue, previous_revenue),
            transactions: totals.period_transactions,
            average_order_value: numeric::opt_decimal(&totals.avg_order_value),
            refunded_amount: numeric::opt_decimal(&totals.refunded_amount),
            trend: trend
                .into_iter()
                .map(|row| RevenueTrendEntry {
                    bucket: row.bucket,
                    revenue: numeric::opt_decimal(&row.revenue),
                    transactions: row.transactions,
                })
                .collect(),
            grouping: grouping.token().to_string(),
            revenue_by_category: by_category
                .into_iter()
                .map(|row| CategoryRevenueEntry {
                    category: row.category_name,
                    revenue: numeric::opt_decimal(&row.revenue),
                    enrollments: row.enrollments,
                })
                .collect(),
            period: window.token().to_string(),
            last_updated: Utc::now(),
        })
    }

    pub async fn engagement(&self, window: &ResolvedPeriod) -> Result<EngagementReport, sqlx::Error> {
        let start = window.start;

        let (stats, progress, learners) = tokio::try_join!(
            self.queries.engagement_stats(start),
            self.queries.progress_values(start),
            self.queries.top_learners(start, TOP_LEARNERS_LIMIT),
        )?;

        let progress_values: Vec<f64> = progress
            .iter()
            .map(|row| numeric::opt_decimal(&row.progress))
            .collect();

        Ok(EngagementReport {
            engagement: Engagement {
                lesson_completions: stats.lesson_completions,
                active_learners: stats.active_learners,
                average_progress: numeric::opt_decimal(&stats.avg_progress),
                progress_90th_percentile: numeric::percentile(&progress_values, 90.0),
                reviews_submitted: stats.reviews_submitted,
                average_rating: numeric::opt_decimal(&stats.avg_rating),
            },
            top_learners: learners.into_iter().map(learner_entry).collect(),
            period: window.token().to_string(),
            last_updated: Utc::now(),
        })
    }

    pub async fn realtime(&self) -> Result<RealtimeReport, sqlx::Error> {
        let counts = self.queries.realtime_counts().await?;

        Ok(RealtimeReport {
            active_sessions: counts.active_sessions,
            enrollments_last_hour: counts.enrollments_last_hour,
            signups_today: counts.signups_today,
            revenue_today: numeric::opt_decimal(&counts.revenue_today),
            last_updated: Utc::now(),
        })
    }

    /// Build the dataset for an export request. Row-shaped datasets become
    /// CSV-compatible exports; document-shaped ones export as a single row.
    pub async fn export_dataset(
        &self,
        export_type: ExportType,
        window: &ResolvedPeriod,
        options: &ExportOptions,
    ) -> Result<ExportData, CoreError> {
        let start = window.start;

        let data = match export_type {
            ExportType::Dashboard => {
                let report = self.dashboard(window).await?;
                ExportData::Document(serde_json::to_value(report)?)
            }
            ExportType::Users | ExportType::Students => {
                let rows = self.queries.student_activity(start, EXPORT_ROW_LIMIT).await?;
                ExportData::Rows(
                    rows.into_iter()
                        .map(|row| student_row(row, options.include_details))
                        .collect(),
                )
            }
            ExportType::Courses => {
                let rows = self
                    .queries
                    .top_courses(start, options.category_id, EXPORT_ROW_LIMIT)
                    .await?;
                ExportData::Rows(
                    rows.into_iter()
                        .map(|row| course_row(row, options.include_details))
                        .collect(),
                )
            }
            ExportType::Revenue => {
                let rows = self
                    .queries
                    .revenue_trend(start, Grouping::Month.trunc_unit())
                    .await?;
                ExportData::Rows(
                    rows.into_iter()
                        .map(|row| {
                            json!({
                                "month": row.bucket,
                                "revenue": numeric::opt_decimal(&row.revenue),
                                "transactions": row.transactions,
                            })
                        })
                        .collect(),
                )
            }
            ExportType::Engagement => {
                let report = self.engagement(window).await?;
                ExportData::Document(serde_json::to_value(report)?)
            }
            ExportType::Instructors => {
                let rows = self
                    .queries
                    .instructor_performance(start, options.instructor_id)
                    .await?;
                ExportData::Rows(
                    rows.into_iter()
                        .map(|row| {
                            json!({
                                "instructorId": row.instructor_id,
                                "fullName": row.full_name,
                                "courses": row.courses,
                                "enrollments": row.enrollments,
                                "revenue": numeric::opt_decimal(&row.revenue),
                                "averageRating": numeric::opt_decimal(&row.avg_rating),
                            })
                        })
                        .collect(),
                )
            }
        };

        Ok(data)
    }
}

fn course_entry(row: CoursePerformance) -> CourseEntry {
    let completion_rate = numeric::rate(row.completions, row.enrollments);
    CourseEntry {
        course_id: row.course_id,
        title: row.title,
        enrollments: row.enrollments,
        revenue: numeric::opt_decimal(&row.revenue),
        average_rating: numeric::opt_decimal(&row.avg_rating),
        completion_rate,
    }
}

fn learner_entry(row: crate::database::queries::LearnerActivity) -> LearnerEntry {
    LearnerEntry {
        user_id: row.user_id,
        full_name: row.full_name,
        enrollments: row.enrollments,
        completions: row.completions,
    }
}

/// Two statically-known projections selected by `include_details`; the
/// detailed one adds contact and last-activity columns.
fn student_row(row: StudentActivity, include_details: bool) -> serde_json::Value {
    if include_details {
        json!({
            "userId": row.user_id,
            "fullName": row.full_name,
            "email": row.email,
            "enrollments": row.enrollments,
            "completions": row.completions,
            "lastLoginAt": row.last_login_at,
        })
    } else {
        json!({
            "userId": row.user_id,
            "fullName": row.full_name,
            "enrollments": row.enrollments,
            "completions": row.completions,
        })
    }
}

fn course_row(row: CoursePerformance, include_details: bool) -> serde_json::Value {
    if include_details {
        json!({
            "courseId": row.course_id,
            "title": row.title,
            "enrollments": row.enrollments,
            "completions": row.completions,
            "revenue": numeric::opt_decimal(&row.revenue),
            "averageRating": numeric::opt_decimal(&row.avg_rating),
        })
    } else {
        json!({
            "courseId": row.course_id,
            "title": row.title,
            "enrollments": row.enrollments,
        })
    }
}
