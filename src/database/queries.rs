//! # Aggregate Query Executor
//!
//! Type-safe execution of the fixed aggregate queries behind the analytics
//! reports. Each method maps one query to a `FromRow` struct; numeric columns
//! come back as `BigDecimal` or nullable counts and are normalized into plain
//! numbers by `analytics::numeric` before they reach any report document.
//!
//! All queries are stateless and independent so the assembler can fan them
//! out concurrently over the shared pool.

use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Executor over the analytics read pool.
#[derive(Clone)]
pub struct AggregateQueryExecutor {
    pool: PgPool,
}

/// User registration and activity counts for a window and the one before it.
#[derive(Debug, FromRow)]
pub struct UserCounts {
    pub total_users: i64,
    pub new_users: i64,
    pub previous_new_users: i64,
    pub active_users: i64,
}

#[derive(Debug, FromRow)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

/// Revenue aggregates; sums are nullable when no matching rows exist.
#[derive(Debug, FromRow)]
pub struct RevenueTotals {
    pub total_revenue: Option<BigDecimal>,
    pub period_revenue: Option<BigDecimal>,
    pub previous_revenue: Option<BigDecimal>,
    pub period_transactions: i64,
    pub avg_order_value: Option<BigDecimal>,
    pub refunded_amount: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct CategoryRevenue {
    pub category_name: String,
    pub revenue: Option<BigDecimal>,
    pub enrollments: i64,
}

#[derive(Debug, FromRow)]
pub struct RevenueBucket {
    pub bucket: DateTime<Utc>,
    pub revenue: Option<BigDecimal>,
    pub transactions: i64,
}

#[derive(Debug, FromRow)]
pub struct CourseCounts {
    pub total_courses: i64,
    pub published_courses: i64,
    pub new_courses: i64,
}

#[derive(Debug, FromRow)]
pub struct CoursePerformance {
    pub course_id: Uuid,
    pub title: String,
    pub enrollments: i64,
    pub revenue: Option<BigDecimal>,
    pub avg_rating: Option<BigDecimal>,
    pub completions: i64,
}

#[derive(Debug, FromRow)]
pub struct CategoryCount {
    pub category_name: String,
    pub courses: i64,
}

#[derive(Debug, FromRow)]
pub struct EnrollmentStats {
    pub total_enrollments: i64,
    pub period_enrollments: i64,
    pub previous_enrollments: i64,
    pub completed_enrollments: i64,
    pub period_completions: i64,
}

#[derive(Debug, FromRow)]
pub struct EngagementStats {
    pub lesson_completions: i64,
    pub active_learners: i64,
    pub avg_progress: Option<BigDecimal>,
    pub reviews_submitted: i64,
    pub avg_rating: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct ProgressValue {
    pub progress: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct GeoBreakdown {
    pub country: Option<String>,
    pub users: i64,
    pub revenue: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct LearnerActivity {
    pub user_id: Uuid,
    pub full_name: String,
    pub enrollments: i64,
    pub completions: i64,
}

/// Users active in the previous window, split by whether they stayed active.
#[derive(Debug, FromRow)]
pub struct RetentionCounts {
    pub previous_active: i64,
    pub retained: i64,
}

#[derive(Debug, FromRow)]
pub struct RealtimeCounts {
    pub active_sessions: i64,
    pub enrollments_last_hour: i64,
    pub signups_today: i64,
    pub revenue_today: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct PaymentHealthCounts {
    pub pending_payments: i64,
    pub failed_payments_24h: i64,
}

#[derive(Debug, FromRow)]
pub struct InstructorPerformance {
    pub instructor_id: Uuid,
    pub full_name: String,
    pub courses: i64,
    pub enrollments: i64,
    pub revenue: Option<BigDecimal>,
    pub avg_rating: Option<BigDecimal>,
}

#[derive(Debug, FromRow)]
pub struct StudentActivity {
    pub user_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub enrollments: i64,
    pub completions: i64,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AggregateQueryExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// User counts for the requested window and the immediately preceding one.
    pub async fn user_counts(
        &self,
        start: DateTime<Utc>,
        previous_start: DateTime<Utc>,
    ) -> Result<UserCounts, sqlx::Error> {
        sqlx::query_as::<_, UserCounts>(
            r#"
            SELECT
                COUNT(*) AS total_users,
                COUNT(*) FILTER (WHERE created_at >= $1) AS new_users,
                COUNT(*) FILTER (WHERE created_at >= $2 AND created_at < $1) AS previous_new_users,
                COUNT(*) FILTER (WHERE last_login_at >= $1) AS active_users
            FROM users
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(start)
        .bind(previous_start)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn role_distribution(&self) -> Result<Vec<RoleCount>, sqlx::Error> {
        sqlx::query_as::<_, RoleCount>(
            r#"
            SELECT role, COUNT(*) AS count
            FROM users
            WHERE deleted_at IS NULL
            GROUP BY role
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn revenue_totals(
        &self,
        start: DateTime<Utc>,
        previous_start: DateTime<Utc>,
    ) -> Result<RevenueTotals, sqlx::Error> {
        sqlx::query_as::<_, RevenueTotals>(
            r#"
            SELECT
                SUM(amount) FILTER (WHERE status = 'completed') AS total_revenue,
                SUM(amount) FILTER (WHERE status = 'completed' AND created_at >= $1) AS period_revenue,
                SUM(amount) FILTER (WHERE status = 'completed' AND created_at >= $2 AND created_at < $1) AS previous_revenue,
                COUNT(*) FILTER (WHERE status = 'completed' AND created_at >= $1) AS period_transactions,
                AVG(amount) FILTER (WHERE status = 'completed' AND created_at >= $1) AS avg_order_value,
                SUM(amount) FILTER (WHERE status = 'refunded' AND created_at >= $1) AS refunded_amount
            FROM payments
            "#,
        )
        .bind(start)
        .bind(previous_start)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn revenue_by_category(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<CategoryRevenue>, sqlx::Error> {
        sqlx::query_as::<_, CategoryRevenue>(
            r#"
            SELECT
                cat.name AS category_name,
                SUM(p.amount) AS revenue,
                COUNT(DISTINCT e.id) AS enrollments
            FROM categories cat
            JOIN courses c ON c.category_id = cat.id
            LEFT JOIN payments p
                ON p.course_id = c.id AND p.status = 'completed' AND p.created_at >= $1
            LEFT JOIN enrollments e
                ON e.course_id = c.id AND e.enrolled_at >= $1
            GROUP BY cat.name
            ORDER BY revenue DESC NULLS LAST
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
    }

    /// Revenue time series bucketed by a `date_trunc` unit (day, week, month).
    pub async fn revenue_trend(
        &self,
        start: DateTime<Utc>,
        bucket_unit: &str,
    ) -> Result<Vec<RevenueBucket>, sqlx::Error> {
        sqlx::query_as::<_, RevenueBucket>(
            r#"
            SELECT
                date_trunc($2::text, created_at) AS bucket,
                SUM(amount) AS revenue,
                COUNT(*) AS transactions
            FROM payments
            WHERE status = 'completed' AND created_at >= $1
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(start)
        .bind(bucket_unit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn course_counts(&self, start: DateTime<Utc>) -> Result<CourseCounts, sqlx::Error> {
        sqlx::query_as::<_, CourseCounts>(
            r#"
            SELECT
                COUNT(*) AS total_courses,
                COUNT(*) FILTER (WHERE published) AS published_courses,
                COUNT(*) FILTER (WHERE created_at >= $1) AS new_courses
            FROM courses
            WHERE deleted_at IS NULL
            "#,
        )
        .bind(start)
        .fetch_one(&self.pool)
        .await
    }

    /// Top courses by enrollments in the window, optionally scoped to a category.
    pub async fn top_courses(
        &self,
        start: DateTime<Utc>,
        category_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<CoursePerformance>, sqlx::Error> {
        sqlx::query_as::<_, CoursePerformance>(
            r#"
            SELECT
                c.id AS course_id,
                c.title,
                COUNT(DISTINCT e.id) AS enrollments,
                SUM(p.amount) AS revenue,
                AVG(r.rating) AS avg_rating,
                COUNT(DISTINCT e.id) FILTER (WHERE e.completed_at IS NOT NULL) AS completions
            FROM courses c
            LEFT JOIN enrollments e ON e.course_id = c.id AND e.enrolled_at >= $1
            LEFT JOIN payments p
                ON p.course_id = c.id AND p.status = 'completed' AND p.created_at >= $1
            LEFT JOIN reviews r ON r.course_id = c.id
            WHERE c.deleted_at IS NULL
              AND ($2::uuid IS NULL OR c.category_id = $2)
            GROUP BY c.id, c.title
            ORDER BY enrollments DESC
            LIMIT $3
            "#,
        )
        .bind(start)
        .bind(category_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn category_distribution(&self) -> Result<Vec<CategoryCount>, sqlx::Error> {
        sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT cat.name AS category_name, COUNT(c.id) AS courses
            FROM categories cat
            LEFT JOIN courses c ON c.category_id = cat.id AND c.deleted_at IS NULL
            GROUP BY cat.name
            ORDER BY courses DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn enrollment_stats(
        &self,
        start: DateTime<Utc>,
        previous_start: DateTime<Utc>,
    ) -> Result<EnrollmentStats, sqlx::Error> {
        sqlx::query_as::<_, EnrollmentStats>(
            r#"
            SELECT
                COUNT(*) AS total_enrollments,
                COUNT(*) FILTER (WHERE enrolled_at >= $1) AS period_enrollments,
                COUNT(*) FILTER (WHERE enrolled_at >= $2 AND enrolled_at < $1) AS previous_enrollments,
                COUNT(*) FILTER (WHERE completed_at IS NOT NULL) AS completed_enrollments,
                COUNT(*) FILTER (WHERE completed_at >= $1) AS period_completions
            FROM enrollments
            "#,
        )
        .bind(start)
        .bind(previous_start)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn engagement_stats(
        &self,
        start: DateTime<Utc>,
    ) -> Result<EngagementStats, sqlx::Error> {
        sqlx::query_as::<_, EngagementStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM lesson_progress WHERE completed_at >= $1) AS lesson_completions,
                (SELECT COUNT(DISTINCT e.user_id)
                   FROM lesson_progress lp
                   JOIN enrollments e ON e.id = lp.enrollment_id
                  WHERE lp.completed_at >= $1) AS active_learners,
                (SELECT AVG(progress) FROM enrollments WHERE enrolled_at >= $1) AS avg_progress,
                (SELECT COUNT(*) FROM reviews WHERE created_at >= $1) AS reviews_submitted,
                (SELECT AVG(rating) FROM reviews WHERE created_at >= $1) AS avg_rating
            "#,
        )
        .bind(start)
        .fetch_one(&self.pool)
        .await
    }

    /// Per-enrollment progress values for percentile computation.
    pub async fn progress_values(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<ProgressValue>, sqlx::Error> {
        sqlx::query_as::<_, ProgressValue>(
            r#"
            SELECT progress FROM enrollments WHERE enrolled_at >= $1
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn geographic_breakdown(
        &self,
        start: DateTime<Utc>,
    ) -> Result<Vec<GeoBreakdown>, sqlx::Error> {
        sqlx::query_as::<_, GeoBreakdown>(
            r#"
            SELECT
                u.country,
                COUNT(DISTINCT u.id) AS users,
                SUM(p.amount) AS revenue
            FROM users u
            LEFT JOIN payments p
                ON p.user_id = u.id AND p.status = 'completed' AND p.created_at >= $1
            WHERE u.deleted_at IS NULL
            GROUP BY u.country
            ORDER BY users DESC
            LIMIT 25
            "#,
        )
        .bind(start)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn top_learners(
        &self,
        start: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<LearnerActivity>, sqlx::Error> {
        sqlx::query_as::<_, LearnerActivity>(
            r#"
            SELECT
                u.id AS user_id,
                u.full_name,
                COUNT(e.id) AS enrollments,
                COUNT(e.id) FILTER (WHERE e.completed_at IS NOT NULL) AS completions
            FROM users u
            JOIN enrollments e ON e.user_id = u.id AND e.enrolled_at >= $1
            WHERE u.deleted_at IS NULL
            GROUP BY u.id, u.full_name
            ORDER BY completions DESC, enrollments DESC
            LIMIT $2
            "#,
        )
        .bind(start)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Retention inputs: of the users active in the previous window, how many
    /// were active again in the current one.
    pub async fn retention_counts(
        &self,
        start: DateTime<Utc>,
        previous_start: DateTime<Utc>,
    ) -> Result<RetentionCounts, sqlx::Error> {
        sqlx::query_as::<_, RetentionCounts>(
            r#"
            WITH previous_active AS (
                SELECT DISTINCT user_id FROM enrollments
                WHERE enrolled_at >= $2 AND enrolled_at < $1
            )
            SELECT
                (SELECT COUNT(*) FROM previous_active) AS previous_active,
                (SELECT COUNT(*) FROM previous_active pa
                  WHERE EXISTS (
                      SELECT 1 FROM enrollments e
                      WHERE e.user_id = pa.user_id AND e.enrolled_at >= $1
                  )) AS retained
            "#,
        )
        .bind(start)
        .bind(previous_start)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn realtime_counts(&self) -> Result<RealtimeCounts, sqlx::Error> {
        sqlx::query_as::<_, RealtimeCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users
                  WHERE last_login_at >= NOW() - INTERVAL '5 minutes') AS active_sessions,
                (SELECT COUNT(*) FROM enrollments
                  WHERE enrolled_at >= NOW() - INTERVAL '1 hour') AS enrollments_last_hour,
                (SELECT COUNT(*) FROM users
                  WHERE created_at >= date_trunc('day', NOW())) AS signups_today,
                (SELECT SUM(amount) FROM payments
                  WHERE status = 'completed'
                    AND created_at >= date_trunc('day', NOW())) AS revenue_today
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    pub async fn payment_health_counts(&self) -> Result<PaymentHealthCounts, sqlx::Error> {
        sqlx::query_as::<_, PaymentHealthCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_payments,
                COUNT(*) FILTER (WHERE status = 'failed'
                    AND created_at >= NOW() - INTERVAL '24 hours') AS failed_payments_24h
            FROM payments
            "#,
        )
        .fetch_one(&self.pool)
        .await
    }

    pub async fn instructor_performance(
        &self,
        start: DateTime<Utc>,
        instructor_id: Option<Uuid>,
    ) -> Result<Vec<InstructorPerformance>, sqlx::Error> {
        sqlx::query_as::<_, InstructorPerformance>(
            r#"
            SELECT
                u.id AS instructor_id,
                u.full_name,
                COUNT(DISTINCT c.id) AS courses,
                COUNT(DISTINCT e.id) AS enrollments,
                SUM(p.amount) AS revenue,
                AVG(r.rating) AS avg_rating
            FROM users u
            JOIN courses c ON c.instructor_id = u.id AND c.deleted_at IS NULL
            LEFT JOIN enrollments e ON e.course_id = c.id AND e.enrolled_at >= $1
            LEFT JOIN payments p
                ON p.course_id = c.id AND p.status = 'completed' AND p.created_at >= $1
            LEFT JOIN reviews r ON r.course_id = c.id
            WHERE u.role = 'instructor'
              AND ($2::uuid IS NULL OR u.id = $2)
            GROUP BY u.id, u.full_name
            ORDER BY revenue DESC NULLS LAST
            "#,
        )
        .bind(start)
        .bind(instructor_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn student_activity(
        &self,
        start: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<StudentActivity>, sqlx::Error> {
        sqlx::query_as::<_, StudentActivity>(
            r#"
            SELECT
                u.id AS user_id,
                u.full_name,
                u.email,
                COUNT(e.id) AS enrollments,
                COUNT(e.id) FILTER (WHERE e.completed_at IS NOT NULL) AS completions,
                u.last_login_at
            FROM users u
            LEFT JOIN enrollments e ON e.user_id = u.id AND e.enrolled_at >= $1
            WHERE u.role = 'student' AND u.deleted_at IS NULL
            GROUP BY u.id, u.full_name, u.email, u.last_login_at
            ORDER BY enrollments DESC
            LIMIT $2
            "#,
        )
        .bind(start)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
