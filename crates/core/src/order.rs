//! Order model and order-creation payloads.
//!
//! Line items and the delivery address are embedded in the order: they are
//! snapshots taken at creation time and never follow later catalog edits.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId};

/// One purchased line inside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    /// Unit price paid, after discount.
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl OrderItem {
    /// `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Delivery address embedded in an order.
///
/// Deserialization is lenient (every field defaults to empty, `zipCode` is
/// accepted for `zipcode`) so that missing fields are reported by
/// [`OrderAddress::missing_fields`] instead of failing the whole request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(alias = "zipCode")]
    pub zipcode: String,
    pub country: String,
    pub phone: String,
}

impl OrderAddress {
    /// Names of required fields that are empty or blank, in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zipcode", &self.zipcode),
            ("country", &self.country),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Copy with every field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_owned(),
            last_name: self.last_name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            zipcode: self.zipcode.trim().to_owned(),
            country: self.country.trim().to_owned(),
            phone: self.phone.trim().to_owned(),
        }
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub amount: Decimal,
    pub address: OrderAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    /// Creation timestamp.
    pub date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the line subtotals.
    #[must_use]
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(OrderItem::subtotal).sum()
    }

    /// Whether `user` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }
}

/// A requested line in an order-creation request.
///
/// Clients may send the product id as `productId` or `_id`; `name`/`title`,
/// `price`, and `image`/`images` are informational only: the server re-prices
/// every line from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    #[serde(alias = "_id", default)]
    pub product_id: Option<ProductId>,
    #[serde(alias = "title", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

const fn default_quantity() -> u32 {
    1
}

/// Body of `POST /api/order/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
    #[serde(default)]
    pub address: Option<OrderAddress>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Net total the client computed; checked against the server total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_reports_blank_values() {
        let address = OrderAddress {
            first_name: "Asha".to_owned(),
            last_name: " ".to_owned(),
            email: "asha@example.com".to_owned(),
            street: "12, MG Road".to_owned(),
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            zipcode: String::new(),
            country: "India".to_owned(),
            phone: "9876543210".to_owned(),
        };
        assert_eq!(address.missing_fields(), vec!["lastName", "zipcode"]);
    }

    #[test]
    fn test_zip_code_alias() {
        let address: OrderAddress =
            serde_json::from_str(r#"{"zipCode": "560001", "city": "Bengaluru"}"#).unwrap();
        assert_eq!(address.zipcode, "560001");
        assert!(!address.missing_fields().contains(&"zipcode"));
        assert!(address.missing_fields().contains(&"street"));
    }

    #[test]
    fn test_item_input_accepts_underscore_id_and_title() {
        let item: OrderItemInput =
            serde_json::from_str(r#"{"_id": "17", "title": "Kettle", "price": 799}"#).unwrap();
        assert_eq!(item.product_id, Some(ProductId::new(17)));
        assert_eq!(item.name.as_deref(), Some("Kettle"));
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_create_request_defaults_to_cod() {
        let req: CreateOrderRequest =
            serde_json::from_str(r#"{"items": [{"productId": 1, "quantity": 2}]}"#).unwrap();
        assert_eq!(req.payment_method, PaymentMethod::Cod);
        assert!(req.address.is_none());
    }
}
