//! Order lifecycle rules.
//!
//! Status: `pending → confirmed → shipped → delivered`, or `→ cancelled`.
//! Payment: `pending → paid | failed`. Customers can cancel and pay their own
//! orders through guarded operations; admins may set any status.
//!
//! The rules here are pure. The API performs each guarded transition as a
//! single conditional update and, when it matches no row, uses the
//! `check_*` functions on a fresh read to explain why.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::order::{CreateOrderRequest, Order, OrderAddress, OrderItem};
use crate::product::Product;
use crate::types::{OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId};

/// Broad class of an [`OrderError`], used to pick the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
}

/// Order operation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order must contain at least one item")]
    EmptyItems,
    #[error("Item {index} is missing a product id")]
    MissingProductId { index: usize },
    #[error("Quantity for product {product} must be at least 1")]
    InvalidQuantity { product: ProductId },
    #[error("Delivery address is required")]
    MissingAddress,
    #[error("Missing required address fields: {}", .fields.join(", "))]
    IncompleteAddress { fields: Vec<&'static str> },
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),
    #[error("{0} is currently unavailable")]
    ProductUnavailable(String),
    #[error("Only {available} of {name} left in stock")]
    InsufficientStock { name: String, available: i32 },
    #[error("Order total changed: submitted {submitted}, current total is {computed}")]
    PriceMismatch { submitted: Decimal, computed: Decimal },
    #[error("Order not found")]
    OrderNotFound,
    #[error("You do not have access to this order")]
    Forbidden,
    #[error("Order is already paid")]
    AlreadyPaid,
    #[error("Order cannot be cancelled once it is {0}")]
    NotCancellable(OrderStatus),
}

impl OrderError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyItems
            | Self::MissingProductId { .. }
            | Self::InvalidQuantity { .. }
            | Self::MissingAddress
            | Self::IncompleteAddress { .. } => ErrorKind::Validation,
            Self::ProductNotFound(_) | Self::OrderNotFound => ErrorKind::NotFound,
            Self::Forbidden => ErrorKind::Forbidden,
            Self::ProductUnavailable(_)
            | Self::InsufficientStock { .. }
            | Self::PriceMismatch { .. }
            | Self::AlreadyPaid
            | Self::NotCancellable(_) => ErrorKind::Conflict,
        }
    }
}

/// Status and payment status a new order starts in.
///
/// Online methods are treated as captured at order time; cash on delivery
/// waits for the mock payment step or an admin.
#[must_use]
pub const fn initial_statuses(method: PaymentMethod) -> (OrderStatus, PaymentStatus) {
    if method.is_online() {
        (OrderStatus::Confirmed, PaymentStatus::Paid)
    } else {
        (OrderStatus::Pending, PaymentStatus::Pending)
    }
}

/// Requested quantity per product, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub lines: Vec<(ProductId, u32)>,
    pub address: OrderAddress,
}

/// Structural checks on an order-creation request, before any catalog read.
///
/// Duplicate product ids are merged into one line.
///
/// # Errors
///
/// [`OrderError::EmptyItems`], [`OrderError::MissingProductId`],
/// [`OrderError::InvalidQuantity`], [`OrderError::MissingAddress`] or
/// [`OrderError::IncompleteAddress`].
pub fn validate_request(request: &CreateOrderRequest) -> Result<ValidatedOrder, OrderError> {
    if request.items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    let mut lines: Vec<(ProductId, u32)> = Vec::with_capacity(request.items.len());
    for (index, item) in request.items.iter().enumerate() {
        let product = item
            .product_id
            .ok_or(OrderError::MissingProductId { index })?;
        if item.quantity == 0 {
            return Err(OrderError::InvalidQuantity { product });
        }
        match lines.iter_mut().find(|(id, _)| *id == product) {
            Some((_, qty)) => *qty = qty.saturating_add(item.quantity),
            None => lines.push((product, item.quantity)),
        }
    }

    let address = request
        .address
        .as_ref()
        .ok_or(OrderError::MissingAddress)?
        .trimmed();
    let fields = address.missing_fields();
    if !fields.is_empty() {
        return Err(OrderError::IncompleteAddress { fields });
    }

    Ok(ValidatedOrder { lines, address })
}

/// Server-priced order lines and their total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub amount: Decimal,
}

/// Price every line from the catalog.
///
/// Each item takes the product's current discounted unit price and its name
/// and first image. If the client sent a total, it must equal the computed
/// one exactly.
///
/// # Errors
///
/// [`OrderError::ProductNotFound`], [`OrderError::ProductUnavailable`],
/// [`OrderError::InsufficientStock`] or [`OrderError::PriceMismatch`].
pub fn price_order(
    lines: &[(ProductId, u32)],
    catalog: &HashMap<ProductId, Product>,
    submitted_amount: Option<Decimal>,
) -> Result<PricedOrder, OrderError> {
    let mut items = Vec::with_capacity(lines.len());
    for &(id, quantity) in lines {
        let product = catalog.get(&id).ok_or(OrderError::ProductNotFound(id))?;
        if !product.is_available {
            return Err(OrderError::ProductUnavailable(product.name.clone()));
        }
        if !product.can_fulfil(quantity) {
            return Err(OrderError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
            });
        }
        items.push(OrderItem {
            product_id: id,
            name: product.name.clone(),
            price: product.net_price(),
            quantity,
            image: product.images.first().cloned(),
        });
    }

    let amount: Decimal = items.iter().map(OrderItem::subtotal).sum();
    if let Some(submitted) = submitted_amount
        && submitted != amount
    {
        return Err(OrderError::PriceMismatch {
            submitted,
            computed: amount,
        });
    }

    Ok(PricedOrder { items, amount })
}

/// Whether `requester` may mock-pay `order`.
///
/// # Errors
///
/// [`OrderError::Forbidden`] for another user's order,
/// [`OrderError::AlreadyPaid`] once payment was captured.
pub fn check_payable(order: &Order, requester: UserId) -> Result<(), OrderError> {
    if !order.is_owned_by(requester) {
        return Err(OrderError::Forbidden);
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(OrderError::AlreadyPaid);
    }
    Ok(())
}

/// Whether `requester` may cancel `order`.
///
/// # Errors
///
/// [`OrderError::Forbidden`] for another user's order,
/// [`OrderError::NotCancellable`] once delivered or cancelled.
pub fn check_cancellable(order: &Order, requester: UserId) -> Result<(), OrderError> {
    if !order.is_owned_by(requester) {
        return Err(OrderError::Forbidden);
    }
    if order.status.is_terminal() {
        return Err(OrderError::NotCancellable(order.status));
    }
    Ok(())
}

/// What an admin status change does to stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock is untouched.
    None,
    /// The order's items go back to stock.
    Restore,
    /// The order's items are taken out of stock again.
    Reserve,
}

/// Stock effect of an admin moving an order from `current` to `target`.
///
/// Only active orders hold stock, so entering `cancelled` restores it and
/// leaving `cancelled` reserves it again.
#[must_use]
pub const fn admin_stock_effect(current: OrderStatus, target: OrderStatus) -> StockEffect {
    match (current, target) {
        (OrderStatus::Cancelled, OrderStatus::Cancelled) => StockEffect::None,
        (OrderStatus::Cancelled, _) => StockEffect::Reserve,
        (_, OrderStatus::Cancelled) => StockEffect::Restore,
        _ => StockEffect::None,
    }
}

/// Explain why a guarded update matched no row, given a fresh read.
///
/// If the fresh read would now pass the check, the row changed between the
/// update and the read; that is reported as the conflict the guard protects
/// against.
#[must_use]
pub fn diagnose(
    current: Option<&Order>,
    requester: UserId,
    check: fn(&Order, UserId) -> Result<(), OrderError>,
    conflict: OrderError,
) -> OrderError {
    match current {
        None => OrderError::OrderNotFound,
        Some(order) => check(order, requester).err().unwrap_or(conflict),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::order::OrderItemInput;
    use crate::types::{OrderId, ProductType};

    fn address() -> OrderAddress {
        OrderAddress {
            first_name: "Ravi".to_owned(),
            last_name: "Kumar".to_owned(),
            email: "ravi@example.com".to_owned(),
            street: "4, Park Street".to_owned(),
            city: "Kolkata".to_owned(),
            state: "West Bengal".to_owned(),
            zipcode: "700016".to_owned(),
            country: "India".to_owned(),
            phone: "9000000000".to_owned(),
        }
    }

    fn item(id: i32, quantity: u32) -> OrderItemInput {
        OrderItemInput {
            product_id: Some(ProductId::new(id)),
            name: None,
            price: None,
            quantity,
            image: None,
            images: Vec::new(),
        }
    }

    fn request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            address: Some(address()),
            payment_method: PaymentMethod::Cod,
            amount: None,
            idempotency_key: None,
        }
    }

    fn product(id: i32, price: i64, discount: i64, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from(price),
            discounted_percentage: Decimal::from(discount),
            stock,
            category: "Home".to_owned(),
            brand: None,
            images: vec![format!("https://media.example/{id}.jpg")],
            is_available: true,
            offer: false,
            badge: false,
            product_type: ProductType::None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn order(status: OrderStatus, payment_status: PaymentStatus) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(9),
            user_id: UserId::new(1),
            items: Vec::new(),
            amount: Decimal::from(100),
            address: address(),
            payment_method: PaymentMethod::Cod,
            payment_status,
            status,
            date: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_initial_statuses_by_method() {
        assert_eq!(
            initial_statuses(PaymentMethod::Cod),
            (OrderStatus::Pending, PaymentStatus::Pending)
        );
        for method in [PaymentMethod::Card, PaymentMethod::Upi] {
            assert_eq!(
                initial_statuses(method),
                (OrderStatus::Confirmed, PaymentStatus::Paid)
            );
        }
    }

    #[test]
    fn test_validate_request_structure() {
        assert_eq!(
            validate_request(&request(Vec::new())),
            Err(OrderError::EmptyItems)
        );

        let mut missing = item(1, 1);
        missing.product_id = None;
        assert_eq!(
            validate_request(&request(vec![item(2, 1), missing])),
            Err(OrderError::MissingProductId { index: 1 })
        );

        assert_eq!(
            validate_request(&request(vec![item(3, 0)])),
            Err(OrderError::InvalidQuantity {
                product: ProductId::new(3)
            })
        );

        let mut req = request(vec![item(1, 1)]);
        req.address = Some(OrderAddress {
            city: String::new(),
            phone: " ".to_owned(),
            ..address()
        });
        let err = validate_request(&req).unwrap_err();
        assert_eq!(
            err,
            OrderError::IncompleteAddress {
                fields: vec!["city", "phone"]
            }
        );
        assert_eq!(err.to_string(), "Missing required address fields: city, phone");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validate_request_merges_duplicates() {
        let validated = validate_request(&request(vec![item(1, 2), item(2, 1), item(1, 3)])).unwrap();
        assert_eq!(
            validated.lines,
            vec![(ProductId::new(1), 5), (ProductId::new(2), 1)]
        );
    }

    #[test]
    fn test_price_order_uses_catalog_prices() {
        let catalog: HashMap<_, _> = [product(1, 1000, 10, 5), product(2, 250, 0, 5)]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let lines = [(ProductId::new(1), 2), (ProductId::new(2), 1)];

        let priced = price_order(&lines, &catalog, None).unwrap();
        assert_eq!(priced.amount, Decimal::from(2050));
        assert_eq!(priced.items[0].price, Decimal::from(900));
        assert_eq!(priced.items[0].name, "Product 1");

        assert!(price_order(&lines, &catalog, Some(Decimal::from(2050))).is_ok());
        let err = price_order(&lines, &catalog, Some(Decimal::from(10))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_price_order_stock_and_availability() {
        let mut unavailable = product(2, 100, 0, 10);
        unavailable.is_available = false;
        let catalog: HashMap<_, _> = [product(1, 100, 0, 1), unavailable]
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        assert_eq!(
            price_order(&[(ProductId::new(1), 2)], &catalog, None),
            Err(OrderError::InsufficientStock {
                name: "Product 1".to_owned(),
                available: 1
            })
        );
        assert_eq!(
            price_order(&[(ProductId::new(2), 1)], &catalog, None),
            Err(OrderError::ProductUnavailable("Product 2".to_owned()))
        );
        assert_eq!(
            price_order(&[(ProductId::new(3), 1)], &catalog, None),
            Err(OrderError::ProductNotFound(ProductId::new(3)))
        );
    }

    #[test]
    fn test_mock_payment_rules() {
        let mut pending = order(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(check_payable(&pending, UserId::new(1)).is_ok());
        assert_eq!(
            check_payable(&pending, UserId::new(2)),
            Err(OrderError::Forbidden)
        );

        pending.payment_status = PaymentStatus::Paid;
        assert_eq!(
            check_payable(&pending, UserId::new(1)),
            Err(OrderError::AlreadyPaid)
        );
    }

    #[test]
    fn test_terminal_orders_cannot_be_cancelled() {
        for status in [OrderStatus::Delivered, OrderStatus::Cancelled] {
            let o = order(status, PaymentStatus::Paid);
            assert_eq!(
                check_cancellable(&o, UserId::new(1)),
                Err(OrderError::NotCancellable(status))
            );
        }
        for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped] {
            assert!(check_cancellable(&order(status, PaymentStatus::Pending), UserId::new(1)).is_ok());
        }
    }

    #[test]
    fn test_diagnose_missed_update() {
        let cancelled = order(OrderStatus::Cancelled, PaymentStatus::Pending);
        assert_eq!(
            diagnose(None, UserId::new(1), check_cancellable, OrderError::OrderNotFound),
            OrderError::OrderNotFound
        );
        assert_eq!(
            diagnose(
                Some(&cancelled),
                UserId::new(2),
                check_cancellable,
                OrderError::NotCancellable(OrderStatus::Cancelled)
            ),
            OrderError::Forbidden
        );
        assert_eq!(
            diagnose(
                Some(&cancelled),
                UserId::new(1),
                check_cancellable,
                OrderError::NotCancellable(OrderStatus::Cancelled)
            ),
            OrderError::NotCancellable(OrderStatus::Cancelled)
        );

        let pending = order(OrderStatus::Pending, PaymentStatus::Pending);
        assert_eq!(
            diagnose(Some(&pending), UserId::new(1), check_payable, OrderError::AlreadyPaid),
            OrderError::AlreadyPaid
        );
    }

    #[test]
    fn test_cancel_twice_is_not_cancellable() {
        let mut o = order(OrderStatus::Pending, PaymentStatus::Pending);
        assert!(check_cancellable(&o, UserId::new(1)).is_ok());

        // First cancel went through; the retry's guarded update misses.
        o.status = OrderStatus::Cancelled;
        assert_eq!(
            check_cancellable(&o, UserId::new(1)),
            Err(OrderError::NotCancellable(OrderStatus::Cancelled))
        );
        assert_eq!(
            diagnose(
                Some(&o),
                UserId::new(1),
                check_cancellable,
                OrderError::NotCancellable(OrderStatus::Cancelled)
            ),
            OrderError::NotCancellable(OrderStatus::Cancelled)
        );
    }

    #[test]
    fn test_admin_stock_effects() {
        for status in [OrderStatus::Pending, OrderStatus::Confirmed, OrderStatus::Shipped] {
            assert_eq!(
                admin_stock_effect(status, OrderStatus::Cancelled),
                StockEffect::Restore
            );
            assert_eq!(
                admin_stock_effect(OrderStatus::Cancelled, status),
                StockEffect::Reserve
            );
            assert_eq!(
                admin_stock_effect(status, OrderStatus::Delivered),
                StockEffect::None
            );
        }
        assert_eq!(
            admin_stock_effect(OrderStatus::Cancelled, OrderStatus::Cancelled),
            StockEffect::None
        );
    }
}
