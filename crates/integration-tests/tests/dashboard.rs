//! Dashboard scenarios against a running server.
//!
//! Other tests may place orders concurrently, so counts are compared with
//! lower bounds.
//!
//! Run with: cargo test -p storehouse-integration-tests -- --ignored

use rust_decimal::Decimal;

use storehouse_core::PaymentMethod;
use storehouse_integration_tests::{TestContext, order_for};

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_quick_stats_count_todays_orders() {
    let ctx = TestContext::new().await;
    let admin = ctx.admin().await;
    let (client, _) = ctx.customer().await;
    let product = ctx.seed_product(Decimal::new(400, 0), Decimal::ZERO, 3).await;

    let before = admin.quick_stats().await.expect("quick stats");
    let order = client
        .create_order(&order_for(&product, 2, PaymentMethod::Cod))
        .await
        .expect("create");
    let after = admin.quick_stats().await.expect("quick stats");

    assert!(after.today_orders > before.today_orders);
    assert!(after.today_sales >= before.today_sales + order.amount);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn test_dashboard_is_admin_only() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.customer().await;

    let err = client.quick_stats().await.expect_err("customers are refused");
    assert_eq!(err.status(), Some(403));

    let err = ctx
        .anonymous()
        .quick_stats()
        .await
        .expect_err("anonymous callers are refused");
    assert_eq!(err.status(), Some(401));
}
