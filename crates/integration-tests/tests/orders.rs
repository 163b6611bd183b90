//! Order lifecycle scenarios against a running server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`storehouse-cli migrate`)
//! - The API server running (`cargo run -p storehouse-api`)
//!
//! Run with: cargo test -p storehouse-integration-tests -- --ignored

use rust_decimal::Decimal;

use storehouse_client::ClientError;
use storehouse_core::{OrderStatus, PaymentMethod, PaymentStatus};
use storehouse_integration_tests::{TestContext, order_for};

fn status_of(result: Result<impl std::fmt::Debug, ClientError>) -> Option<u16> {
    result.err().and_then(|e| e.status())
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cod_order_is_pending_and_reserves_stock() {
    let ctx = TestContext::new().await;
    let (client, session) = ctx.customer().await;
    let product = ctx
        .seed_product(Decimal::new(1000, 0), Decimal::new(10, 0), 5)
        .await;

    let order = client
        .create_order(&order_for(&product, 2, PaymentMethod::Cod))
        .await
        .expect("Failed to create order");

    assert_eq!(order.user_id, session.user.id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    // 2 x (1000 - 10%)
    assert_eq!(order.amount, Decimal::new(1800, 0));
    assert_eq!(ctx.stock_of(product.id).await, 3);

    let mine = client.my_orders().await.expect("Failed to list orders");
    assert!(mine.iter().any(|o| o.id == order.id));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_online_payment_is_confirmed_immediately() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(250, 0), Decimal::ZERO, 3).await;

    let order = client
        .create_order(&order_for(&product, 1, PaymentMethod::Upi))
        .await
        .expect("Failed to create order");

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_insufficient_stock_writes_nothing() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(99, 0), Decimal::ZERO, 1).await;

    let result = client
        .create_order(&order_for(&product, 2, PaymentMethod::Cod))
        .await;

    assert_eq!(status_of(result), Some(409));
    assert_eq!(ctx.stock_of(product.id).await, 1);
    assert!(client.my_orders().await.expect("list").is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_tampered_amount_rejected() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(500, 0), Decimal::ZERO, 4).await;

    let mut request = order_for(&product, 1, PaymentMethod::Cod);
    request.amount = Some(Decimal::ONE);

    assert_eq!(status_of(client.create_order(&request).await), Some(409));
    assert_eq!(ctx.stock_of(product.id).await, 4);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_idempotency_key_replays_original_order() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(75, 0), Decimal::ZERO, 10).await;

    let mut request = order_for(&product, 1, PaymentMethod::Cod);
    request.idempotency_key = Some(uuid::Uuid::new_v4().to_string());

    let first = client.create_order(&request).await.expect("first submit");
    let second = client.create_order(&request).await.expect("retried submit");

    assert_eq!(first.id, second.id);
    assert_eq!(ctx.stock_of(product.id).await, 9);
    assert_eq!(client.my_orders().await.expect("list").len(), 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_order_requires_token() {
    let ctx = TestContext::new().await;
    let product = ctx.seed_product(Decimal::new(10, 0), Decimal::ZERO, 1).await;

    let result = ctx
        .anonymous()
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await;

    assert!(matches!(result, Err(ClientError::Unauthorized(_))));
}

// ============================================================================
// Payment & Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_mock_payment_once() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(300, 0), Decimal::ZERO, 2).await;
    let order = client
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("create");

    let paid = client.pay_order(order.id).await.expect("pay");
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Confirmed);

    assert_eq!(status_of(client.pay_order(order.id).await), Some(409));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_other_users_order_is_forbidden() {
    let ctx = TestContext::new().await;
    let (owner, _) = ctx.customer().await;
    let (stranger, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(40, 0), Decimal::ZERO, 2).await;
    let order = owner
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("create");

    assert_eq!(status_of(stranger.order(order.id).await), Some(403));
    assert_eq!(status_of(stranger.pay_order(order.id).await), Some(403));
    assert_eq!(status_of(stranger.cancel_order(order.id).await), Some(403));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_cancel_restores_stock_until_delivered() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let admin = ctx.admin().await;
    let product = ctx.seed_product(Decimal::new(60, 0), Decimal::ZERO, 5).await;

    let order = client
        .create_order(&order_for(&product, 3, PaymentMethod::Cod))
        .await
        .expect("create");
    assert_eq!(ctx.stock_of(product.id).await, 2);

    let cancelled = client.cancel_order(order.id).await.expect("cancel");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(ctx.stock_of(product.id).await, 5);
    assert_eq!(status_of(client.cancel_order(order.id).await), Some(409));

    let delivered = client
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("create");
    admin
        .set_order_status(delivered.id, OrderStatus::Delivered, None)
        .await
        .expect("admin status update");
    assert_eq!(status_of(client.cancel_order(delivered.id).await), Some(409));
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_admin_cancel_restores_stock_once() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let admin = ctx.admin().await;
    let product = ctx.seed_product(Decimal::new(80, 0), Decimal::ZERO, 4).await;

    let order = client
        .create_order(&order_for(&product, 2, PaymentMethod::Cod))
        .await
        .expect("create");
    assert_eq!(ctx.stock_of(product.id).await, 2);

    let cancelled = admin
        .set_order_status(order.id, OrderStatus::Cancelled, None)
        .await
        .expect("admin cancel");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(ctx.stock_of(product.id).await, 4);

    // Re-sending cancelled leaves stock alone.
    admin
        .set_order_status(order.id, OrderStatus::Cancelled, None)
        .await
        .expect("repeat admin cancel");
    assert_eq!(ctx.stock_of(product.id).await, 4);

    // Reactivating takes the stock again, so a later cancel restores it once.
    admin
        .set_order_status(order.id, OrderStatus::Pending, None)
        .await
        .expect("admin reactivate");
    assert_eq!(ctx.stock_of(product.id).await, 2);
    client.cancel_order(order.id).await.expect("customer cancel");
    assert_eq!(ctx.stock_of(product.id).await, 4);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_reactivation_needs_stock() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let (other, _) = ctx.customer().await;
    let admin = ctx.admin().await;
    let product = ctx.seed_product(Decimal::new(80, 0), Decimal::ZERO, 1).await;

    let order = client
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("create");
    client.cancel_order(order.id).await.expect("cancel");
    other
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("second order takes the last unit");

    assert_eq!(
        status_of(admin.set_order_status(order.id, OrderStatus::Confirmed, None).await),
        Some(409)
    );
    assert_eq!(ctx.stock_of(product.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_admin_sees_all_orders() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;
    let admin = ctx.admin().await;
    let product = ctx.seed_product(Decimal::new(20, 0), Decimal::ZERO, 1).await;
    let order = client
        .create_order(&order_for(&product, 1, PaymentMethod::Cod))
        .await
        .expect("create");

    let all = admin.all_orders().await.expect("admin list");
    assert!(all.iter().any(|o| o.id == order.id));
    assert_eq!(admin.order(order.id).await.expect("admin get").id, order.id);

    assert_eq!(status_of(client.all_orders().await), Some(403));
}
