//! Order repository.
//!
//! Guarded transitions (`cancel`, `mark_paid`) are single conditional updates
//! that return `None` when the guard did not match. Callers re-read the order
//! to explain the miss.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use storehouse_core::order::{Order, OrderAddress, OrderItem};
use storehouse_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{OrderOwner, OrderWithOwner};

const ORDER_COLUMNS: &str =
    "id, user_id, items, amount, address, payment_method, payment_status, status, date, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    amount: Decimal,
    address: Json<OrderAddress>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    status: OrderStatus,
    date: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            amount: row.amount,
            address: row.address.0,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            status: row.status,
            date: row.date,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderWithOwnerRow {
    #[sqlx(flatten)]
    order: OrderRow,
    owner_name: String,
    owner_email: String,
}

impl From<OrderWithOwnerRow> for OrderWithOwner {
    fn from(row: OrderWithOwnerRow) -> Self {
        Self {
            order: row.order.into(),
            user: OrderOwner {
                name: row.owner_name,
                email: row.owner_email,
            },
        }
    }
}

/// Everything needed to insert a new order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user: UserId,
    pub items: &'a [OrderItem],
    pub amount: Decimal,
    pub address: &'a OrderAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub idempotency_key: Option<&'a str>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// The order a user created earlier with the same idempotency key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_idempotency_key(
        &self,
        user: UserId,
        key: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND idempotency_key = $2"
        ))
        .bind(user)
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY date DESC, id DESC"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Newest orders with their owners; `limit = None` returns all of them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_owner(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<OrderWithOwner>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderWithOwnerRow>(
            r"
            SELECT o.id, o.user_id, o.items, o.amount, o.address, o.payment_method,
                   o.payment_status, o.status, o.date, o.updated_at,
                   u.name AS owner_name, u.email AS owner_email
            FROM orders o
            JOIN users u ON u.id = o.user_id
            ORDER BY o.date DESC, o.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Record the mock payment on an unpaid order owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_paid(&self, id: OrderId, user: UserId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE orders
            SET payment_status = 'paid', payment_method = 'card', status = 'confirmed',
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND payment_status <> 'paid'
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

/// Insert an order inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the user already used the
/// idempotency key.
pub async fn insert(conn: &mut PgConnection, order: &NewOrder<'_>) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO orders (user_id, items, amount, address, payment_method,
                            payment_status, status, idempotency_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order.user)
    .bind(Json(order.items))
    .bind(order.amount)
    .bind(Json(order.address))
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.status)
    .bind(order.idempotency_key)
    .fetch_one(conn)
    .await
    .map_err(|e| conflict_on_unique(e, "idempotency key already used"))?;
    Ok(row.into())
}

/// Soft-cancel an order owned by `user` unless it is delivered or
/// already cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn cancel(
    conn: &mut PgConnection,
    id: OrderId,
    user: UserId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        UPDATE orders
        SET status = 'cancelled', updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status NOT IN ('cancelled', 'delivered')
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(user)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Lock an order row for an admin status change and read its status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_status(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderStatus>, RepositoryError> {
    let status = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(status)
}

/// Admin override of status and, optionally, payment status.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` for an unknown order.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
    payment_status: Option<PaymentStatus>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        UPDATE orders
        SET status = $2, payment_status = COALESCE($3, payment_status), updated_at = NOW()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .bind(payment_status)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    Ok(row.into())
}
