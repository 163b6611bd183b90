//! Order Lifecycle Manager.
//!
//! Creation prices every line from the catalog and takes stock in the same
//! transaction as the insert. Cancellation and mock payment are conditional
//! updates; a miss is explained from a fresh read via
//! [`lifecycle::diagnose`].

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;

use storehouse_core::lifecycle::{self, OrderError, StockEffect};
use storehouse_core::order::{CreateOrderRequest, Order};
use storehouse_core::{OrderId, OrderStatus, PaymentStatus, UserId};

use crate::db::orders::{self, NewOrder};
use crate::db::products;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::OrderWithOwner;

/// Order operation failures.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// Rule violation the caller can act on.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Result of an order-creation request.
#[derive(Debug, Clone)]
pub struct Created {
    pub order: Order,
    /// `false` when an earlier order with the same idempotency key was returned
    pub is_new: bool,
}

/// Order lifecycle service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    orders: OrderRepository<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            orders: OrderRepository::new(pool),
        }
    }

    /// Create an order for `user`.
    ///
    /// # Errors
    ///
    /// Validation, catalog and stock failures as [`OrderError`]; nothing is
    /// written when any line fails.
    #[instrument(skip(self, request), fields(user_id = %user, items = request.items.len()))]
    pub async fn create(
        &self,
        user: UserId,
        request: &CreateOrderRequest,
    ) -> Result<Created, OrderServiceError> {
        let validated = lifecycle::validate_request(request)?;
        let key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());

        if let Some(key) = key
            && let Some(order) = self.orders.get_by_idempotency_key(user, key).await?
        {
            tracing::info!(order_id = %order.id, "Idempotent replay of order creation");
            return Ok(Created {
                order,
                is_new: false,
            });
        }

        let ids: Vec<_> = validated.lines.iter().map(|(id, _)| *id).collect();
        let mut tx = self.pool.begin().await?;

        let catalog = products::lock_for_order(&mut tx, &ids).await?;
        let priced = lifecycle::price_order(&validated.lines, &catalog, request.amount)?;

        for item in &priced.items {
            if !products::decrement_stock(&mut tx, item.product_id, item.quantity).await? {
                let available = catalog.get(&item.product_id).map_or(0, |p| p.stock);
                return Err(OrderError::InsufficientStock {
                    name: item.name.clone(),
                    available,
                }
                .into());
            }
        }

        let (status, payment_status) = lifecycle::initial_statuses(request.payment_method);
        let inserted = orders::insert(
            &mut tx,
            &NewOrder {
                user,
                items: &priced.items,
                amount: priced.amount,
                address: &validated.address,
                payment_method: request.payment_method,
                payment_status,
                status,
                idempotency_key: key,
            },
        )
        .await;

        let order = match inserted {
            Ok(order) => order,
            // A concurrent request with the same key won the race
            Err(RepositoryError::Conflict(_)) => {
                drop(tx);
                if let Some(key) = key
                    && let Some(order) = self.orders.get_by_idempotency_key(user, key).await?
                {
                    return Ok(Created {
                        order,
                        is_new: false,
                    });
                }
                return Err(RepositoryError::Conflict("idempotency key already used".to_owned()).into());
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        tracing::info!(order_id = %order.id, amount = %order.amount, "Order created");
        Ok(Created {
            order,
            is_new: true,
        })
    }

    /// Soft-cancel the caller's order and return its items to stock.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, `Forbidden` or `NotCancellable`.
    #[instrument(skip(self), fields(order_id = %id, user_id = %user))]
    pub async fn cancel(&self, id: OrderId, user: UserId) -> Result<Order, OrderServiceError> {
        let mut tx = self.pool.begin().await?;

        let Some(order) = orders::cancel(&mut tx, id, user).await? else {
            drop(tx);
            let current = self.orders.get(id).await?;
            return Err(lifecycle::diagnose(
                current.as_ref(),
                user,
                lifecycle::check_cancellable,
                OrderError::NotCancellable(OrderStatus::Cancelled),
            )
            .into());
        };

        for item in &order.items {
            products::restore_stock(&mut tx, item.product_id, item.quantity).await?;
        }
        tx.commit().await?;

        tracing::info!("Order cancelled");
        Ok(order)
    }

    /// Simulate capturing payment for the caller's order.
    ///
    /// # Errors
    ///
    /// `OrderNotFound`, `Forbidden` or `AlreadyPaid`.
    #[instrument(skip(self), fields(order_id = %id, user_id = %user))]
    pub async fn pay(&self, id: OrderId, user: UserId) -> Result<Order, OrderServiceError> {
        if let Some(order) = self.orders.mark_paid(id, user).await? {
            tracing::info!("Mock payment captured");
            return Ok(order);
        }

        let current = self.orders.get(id).await?;
        Err(lifecycle::diagnose(
            current.as_ref(),
            user,
            lifecycle::check_payable,
            OrderError::AlreadyPaid,
        )
        .into())
    }

    /// The caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` on database failure.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.orders.list_for_user(user).await?)
    }

    /// One order, visible to its owner or an admin.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` or `Forbidden`.
    pub async fn get(&self, id: OrderId, user: UserId, is_admin: bool) -> Result<Order, OrderServiceError> {
        let order = self.orders.get(id).await?.ok_or(OrderError::OrderNotFound)?;
        if !is_admin && !order.is_owned_by(user) {
            return Err(OrderError::Forbidden.into());
        }
        Ok(order)
    }

    /// Every order with its owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderServiceError::Repository` on database failure.
    pub async fn list_all(&self) -> Result<Vec<OrderWithOwner>, OrderServiceError> {
        Ok(self.orders.list_with_owner(None).await?)
    }

    /// Admin override of an order's status.
    ///
    /// Any status may be set at any time. Stock follows the order: entering
    /// `cancelled` restores it and leaving `cancelled` reserves it again, in
    /// the same transaction.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` for an unknown id, `InsufficientStock` when a cancelled
    /// order is reactivated without enough stock.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, OrderServiceError> {
        let mut tx = self.pool.begin().await?;

        let current = orders::lock_status(&mut tx, id)
            .await?
            .ok_or(OrderError::OrderNotFound)?;
        let order = orders::set_status(&mut tx, id, status, payment_status).await?;

        match lifecycle::admin_stock_effect(current, status) {
            StockEffect::None => {}
            StockEffect::Restore => {
                for item in &order.items {
                    products::restore_stock(&mut tx, item.product_id, item.quantity).await?;
                }
            }
            StockEffect::Reserve => reserve_again(&mut tx, &order).await?,
        }
        tx.commit().await?;

        tracing::info!(from = %current, status = %order.status, "Order status set by admin");
        Ok(order)
    }
}

/// Take a reactivated order's items out of stock. Deleted products are
/// skipped, as they are when stock is restored.
async fn reserve_again(conn: &mut PgConnection, order: &Order) -> Result<(), OrderServiceError> {
    let ids: Vec<_> = order.items.iter().map(|item| item.product_id).collect();
    let catalog = products::lock_for_order(conn, &ids).await?;

    for item in &order.items {
        let Some(product) = catalog.get(&item.product_id) else {
            continue;
        };
        if !products::decrement_stock(conn, item.product_id, item.quantity).await? {
            return Err(OrderError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
            }
            .into());
        }
    }
    Ok(())
}
