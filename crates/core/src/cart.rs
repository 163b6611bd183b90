//! Client-held shopping cart.
//!
//! The cart is optimistic: every mutation is applied locally and totals are
//! recomputed on demand, before any network round trip. Nothing here is
//! persisted server-side until checkout submits an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::OrderItemInput;
use crate::product::ProductSnapshot;
use crate::types::{ProductId, discounted_unit_price};

/// One product in the cart with its quantity (always ≥ 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    #[serde(flatten)]
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price after the snapshot's discount.
    #[must_use]
    pub fn net_unit_price(&self) -> Decimal {
        discounted_unit_price(self.product.price, self.product.discounted_percentage)
    }

    /// `price × quantity`, before discount.
    #[must_use]
    pub fn gross_subtotal(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    /// `net unit price × quantity`.
    #[must_use]
    pub fn net_subtotal(&self) -> Decimal {
        self.net_unit_price() * Decimal::from(self.quantity)
    }

    /// The order-creation line for this cart line.
    #[must_use]
    pub fn to_order_item(&self) -> OrderItemInput {
        OrderItemInput {
            product_id: Some(self.product.id),
            name: Some(self.product.name.clone()),
            price: Some(self.net_unit_price()),
            quantity: self.quantity,
            image: self.product.image.clone(),
            images: Vec::new(),
        }
    }
}

/// Cart totals.
///
/// `net_total ≤ gross_total` always holds, with equality exactly when no line
/// carries a discount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub gross_total: Decimal,
    pub net_total: Decimal,
}

impl CartTotals {
    /// Savings shown to the shopper.
    #[must_use]
    pub fn discount(&self) -> Decimal {
        self.gross_total - self.net_total
    }
}

/// Compute gross and net totals over `lines`.
#[must_use]
pub fn compute_totals(lines: &[CartLine]) -> CartTotals {
    lines.iter().fold(CartTotals::default(), |acc, line| CartTotals {
        gross_total: acc.gross_total + line.gross_subtotal(),
        net_total: acc.net_total + line.net_subtotal(),
    })
}

/// An ordered collection of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add `quantity` units of a product, merging with an existing line.
    /// Adding zero units is a no-op.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(quantity);
            line.product = product;
        } else {
            self.lines.push(CartLine { product, quantity });
        }
    }

    /// Increase a line's quantity by one. Returns `false` if the product is
    /// not in the cart.
    pub fn increment(&mut self, id: ProductId) -> bool {
        self.line_mut(id).is_some_and(|line| {
            line.quantity = line.quantity.saturating_add(1);
            true
        })
    }

    /// Decrease a line's quantity by one, removing the line at zero. Returns
    /// `false` if the product is not in the cart.
    pub fn decrement(&mut self, id: ProductId) -> bool {
        let Some(pos) = self.position(id) else {
            return false;
        };
        if self.lines[pos].quantity <= 1 {
            self.lines.remove(pos);
        } else {
            self.lines[pos].quantity -= 1;
        }
        true
    }

    /// Remove a line entirely. Returns `false` if it was not present.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product.id != id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        compute_totals(&self.lines)
    }

    /// The lines as order-creation items.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItemInput> {
        self.lines.iter().map(CartLine::to_order_item).collect()
    }

    fn position(&self, id: ProductId) -> Option<usize> {
        self.lines.iter().position(|line| line.product.id == id)
    }

    fn line_mut(&mut self, id: ProductId) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.product.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(id: i32, price: i64, discount: i64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            discounted_percentage: Decimal::from(discount),
            image: None,
        }
    }

    #[test]
    fn test_discounted_line_totals() {
        let mut cart = Cart::new();
        cart.add(snapshot(1, 1000, 10), 2);
        let totals = cart.totals();
        assert_eq!(totals.gross_total, Decimal::from(2000));
        assert_eq!(totals.net_total, Decimal::from(1800));
        assert_eq!(totals.discount(), Decimal::from(200));
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        assert_eq!(Cart::new().totals(), CartTotals::default());
    }

    #[test]
    fn test_net_never_exceeds_gross() {
        let mut cart = Cart::new();
        for (id, price, discount) in [(1, 499, 0), (2, 1299, 15), (3, 89, 100), (4, 0, 50)] {
            cart.add(snapshot(id, price, discount), u32::try_from(id).unwrap());
        }
        let totals = cart.totals();
        assert!(totals.net_total <= totals.gross_total);
        assert!(totals.net_total < totals.gross_total);
    }

    #[test]
    fn test_equal_totals_without_discount() {
        let mut cart = Cart::new();
        cart.add(snapshot(1, 250, 0), 3);
        cart.add(snapshot(2, 40, 0), 1);
        let totals = cart.totals();
        assert_eq!(totals.net_total, totals.gross_total);
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        cart.add(snapshot(7, 100, 0), 1);
        cart.add(snapshot(7, 100, 0), 2);
        cart.add(snapshot(8, 100, 0), 0);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_decrement_to_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add(snapshot(1, 100, 0), 2);
        assert!(cart.decrement(ProductId::new(1)));
        assert_eq!(cart.item_count(), 1);
        assert!(cart.decrement(ProductId::new(1)));
        assert!(cart.is_empty());
        assert!(!cart.decrement(ProductId::new(1)));
    }

    #[test]
    fn test_mutations_update_totals_immediately() {
        let mut cart = Cart::new();
        cart.add(snapshot(1, 100, 0), 1);
        cart.add(snapshot(2, 50, 0), 1);
        assert!(cart.increment(ProductId::new(1)));
        assert_eq!(cart.totals().gross_total, Decimal::from(250));
        assert!(cart.remove(ProductId::new(1)));
        assert_eq!(cart.totals().gross_total, Decimal::from(50));
        assert!(!cart.remove(ProductId::new(1)));
        cart.clear();
        assert_eq!(cart.totals().net_total, Decimal::ZERO);
    }

    #[test]
    fn test_order_items_carry_net_unit_price() {
        let mut cart = Cart::new();
        cart.add(snapshot(3, 1000, 25), 4);
        let items = cart.order_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id, Some(ProductId::new(3)));
        assert_eq!(items[0].price, Some(Decimal::from(750)));
        assert_eq!(items[0].quantity, 4);
    }
}
