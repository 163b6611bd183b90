//! Dashboard Aggregator.
//!
//! Read-only summaries for the admin panel. Every figure tolerates an empty
//! database and comes back as zero.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use storehouse_core::OrderStatus;
use storehouse_core::analytics::{self, Bucket, DashboardTotals, Period, QuickStats};
use storehouse_core::inventory::StockReport;
use storehouse_core::product::Product;

use crate::db::products::ProductFilter;
use crate::db::{DashboardRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::{OrderWithOwner, RecentUser};

const RECENT_LIMIT: i64 = 5;

/// Count of orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// `GET /api/dashboard/stats` payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_revenue: rust_decimal::Decimal,
    pub recent_orders: Vec<OrderWithOwner>,
    pub recent_users: Vec<RecentUser>,
    /// Newest products
    pub top_products: Vec<Product>,
    /// Every status, zero when no order has it
    pub orders_by_status: Vec<StatusCount>,
}

impl DashboardStats {
    fn new(totals: DashboardTotals) -> Self {
        Self {
            total_users: totals.users,
            total_products: totals.products,
            total_orders: totals.orders,
            total_revenue: totals.revenue,
            recent_orders: Vec::new(),
            recent_users: Vec::new(),
            top_products: Vec::new(),
            orders_by_status: Vec::new(),
        }
    }
}

/// `GET /api/dashboard/analytics` payload.
#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub period: Period,
    pub buckets: Vec<Bucket>,
}

/// Fill in every status, in lifecycle order.
fn all_statuses(counts: &[(OrderStatus, i64)]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: counts
                .iter()
                .filter(|(s, _)| *s == status)
                .map(|(_, n)| n)
                .sum(),
        })
        .collect()
}

/// Dashboard aggregation service.
pub struct DashboardService<'a> {
    dashboard: DashboardRepository<'a>,
    orders: OrderRepository<'a>,
    products: ProductRepository<'a>,
    offset: FixedOffset,
}

impl<'a> DashboardService<'a> {
    /// `offset` defines the store's local day.
    #[must_use]
    pub const fn new(pool: &'a PgPool, offset: FixedOffset) -> Self {
        Self {
            dashboard: DashboardRepository::new(pool),
            orders: OrderRepository::new(pool),
            products: ProductRepository::new(pool),
            offset,
        }
    }

    /// Totals with recent activity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on database failure.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, RepositoryError> {
        let mut stats = DashboardStats::new(self.dashboard.totals().await?);
        stats.recent_orders = self.orders.list_with_owner(Some(RECENT_LIMIT)).await?;
        stats.recent_users = self.dashboard.recent_users(RECENT_LIMIT).await?;
        let newest = ProductFilter {
            per_page: RECENT_LIMIT,
            ..ProductFilter::default()
        }
        .clamped();
        stats.top_products = self.products.list(&newest).await?.0;
        stats.orders_by_status = all_statuses(&self.dashboard.orders_by_status().await?);
        Ok(stats)
    }

    /// Zero-filled order, revenue and registration series.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on database failure.
    #[instrument(skip(self))]
    pub async fn analytics(&self, period: Period) -> Result<Analytics, RepositoryError> {
        self.analytics_at(period, Utc::now()).await
    }

    async fn analytics_at(&self, period: Period, now: DateTime<Utc>) -> Result<Analytics, RepositoryError> {
        let since = analytics::window_start(period, now, self.offset);
        let daily = matches!(period, Period::Weekly);
        let offset_minutes = self.offset.local_minus_utc() / 60;

        let orders = self.dashboard.order_samples(since, offset_minutes, daily).await?;
        let users = self.dashboard.user_samples(since, offset_minutes, daily).await?;
        let today = analytics::local_date(now, self.offset);

        Ok(Analytics {
            period,
            buckets: analytics::zero_fill(period, today, &orders, &users),
        })
    }

    /// Today's order count and sales.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on database failure.
    #[instrument(skip(self))]
    pub async fn quick_stats(&self) -> Result<QuickStats, RepositoryError> {
        let (start, end) = analytics::today_bounds(Utc::now(), self.offset);
        self.dashboard.quick_stats(start, end).await
    }

    /// Stock levels against `threshold`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on database failure.
    #[instrument(skip(self))]
    pub async fn inventory(&self, threshold: i32) -> Result<StockReport, RepositoryError> {
        let products = self.products.list_all().await?;
        Ok(StockReport::build(&products, threshold))
    }
}
