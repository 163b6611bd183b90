//! Read-only aggregate queries for the admin dashboard.
//!
//! Bucketed queries only return non-empty buckets; the caller zero-fills
//! them against the calendar with `storehouse_core::analytics::zero_fill`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use storehouse_core::OrderStatus;
use storehouse_core::analytics::{BucketKey, DashboardTotals, OrderSample, QuickStats, UserSample};

use super::RepositoryError;
use crate::models::RecentUser;

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    users: i64,
    products: i64,
    orders: i64,
    revenue: Decimal,
}

impl From<TotalsRow> for DashboardTotals {
    fn from(row: TotalsRow) -> Self {
        Self {
            users: row.users,
            products: row.products,
            orders: row.orders,
            revenue: row.revenue,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderBucketRow {
    year: i32,
    month: i32,
    day: Option<i32>,
    orders: i64,
    revenue: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct UserBucketRow {
    year: i32,
    month: i32,
    day: Option<i32>,
    users: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct QuickStatsRow {
    orders: i64,
    sales: Decimal,
}

fn bucket_key(year: i32, month: i32, day: Option<i32>) -> Result<BucketKey, RepositoryError> {
    let corrupt = |_| RepositoryError::DataCorruption(format!("invalid bucket {year}-{month}"));
    Ok(BucketKey {
        year,
        month: u32::try_from(month).map_err(corrupt)?,
        day: day.map(u32::try_from).transpose().map_err(corrupt)?,
    })
}

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record counts and revenue over confirmed, shipped and delivered orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn totals(&self) -> Result<DashboardTotals, RepositoryError> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r"
            SELECT (SELECT COUNT(*) FROM users) AS users,
                   (SELECT COUNT(*) FROM products) AS products,
                   (SELECT COUNT(*) FROM orders) AS orders,
                   (SELECT COALESCE(SUM(amount), 0) FROM orders
                    WHERE status IN ('confirmed', 'shipped', 'delivered')) AS revenue
            ",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Order count per status, for statuses that have any orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, RepositoryError> {
        let rows = sqlx::query_as::<_, (OrderStatus, i64)>(
            "SELECT status, COUNT(*) FROM orders GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Newest registrations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_users(&self, limit: i64) -> Result<Vec<RecentUser>, RepositoryError> {
        let rows = sqlx::query_as::<_, RecentUser>(
            "SELECT id, name, email, created_at FROM users ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Non-cancelled orders since `since`, grouped by local day (`daily`) or
    /// local month.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn order_samples(
        &self,
        since: DateTime<Utc>,
        offset_minutes: i32,
        daily: bool,
    ) -> Result<Vec<OrderSample>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderBucketRow>(
            r"
            WITH local AS (
                SELECT (date AT TIME ZONE 'UTC') + make_interval(mins => $2) AS ts, amount
                FROM orders
                WHERE date >= $1 AND status <> 'cancelled'
            )
            SELECT EXTRACT(YEAR FROM ts)::INT4 AS year,
                   EXTRACT(MONTH FROM ts)::INT4 AS month,
                   CASE WHEN $3 THEN EXTRACT(DAY FROM ts)::INT4 END AS day,
                   COUNT(*) AS orders,
                   COALESCE(SUM(amount), 0) AS revenue
            FROM local
            GROUP BY 1, 2, 3
            ",
        )
        .bind(since)
        .bind(offset_minutes)
        .bind(daily)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(OrderSample {
                    key: bucket_key(r.year, r.month, r.day)?,
                    orders: r.orders,
                    revenue: r.revenue,
                })
            })
            .collect()
    }

    /// Registrations since `since`, bucketed like [`Self::order_samples`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_samples(
        &self,
        since: DateTime<Utc>,
        offset_minutes: i32,
        daily: bool,
    ) -> Result<Vec<UserSample>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserBucketRow>(
            r"
            WITH local AS (
                SELECT (created_at AT TIME ZONE 'UTC') + make_interval(mins => $2) AS ts
                FROM users
                WHERE created_at >= $1
            )
            SELECT EXTRACT(YEAR FROM ts)::INT4 AS year,
                   EXTRACT(MONTH FROM ts)::INT4 AS month,
                   CASE WHEN $3 THEN EXTRACT(DAY FROM ts)::INT4 END AS day,
                   COUNT(*) AS users
            FROM local
            GROUP BY 1, 2, 3
            ",
        )
        .bind(since)
        .bind(offset_minutes)
        .bind(daily)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(UserSample {
                    key: bucket_key(r.year, r.month, r.day)?,
                    users: r.users,
                })
            })
            .collect()
    }

    /// Orders placed in `[start, end)` and their sales, excluding cancelled
    /// orders from the sales sum.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quick_stats(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<QuickStats, RepositoryError> {
        let row = sqlx::query_as::<_, QuickStatsRow>(
            r"
            SELECT COUNT(*) AS orders,
                   COALESCE(SUM(amount) FILTER (
                       WHERE status IN ('pending', 'confirmed', 'shipped', 'delivered')
                   ), 0) AS sales
            FROM orders
            WHERE date >= $1 AND date < $2
            ",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool)
        .await?;
        Ok(QuickStats {
            today_orders: row.orders,
            today_sales: row.sales,
        })
    }
}
