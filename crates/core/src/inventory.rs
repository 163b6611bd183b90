//! Stock level reporting for the admin inventory page.

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::ProductId;

/// Stock at or below this (and above zero) counts as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// A product running low on stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub stock: i32,
}

/// Stock summary over the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReport {
    pub threshold: i32,
    pub total_products: usize,
    pub in_stock: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    /// Low-stock products, lowest stock first.
    pub low_stock_items: Vec<LowStockItem>,
}

impl StockReport {
    /// Classify `products` against `threshold`.
    ///
    /// A product is in stock when `stock > 0`, out of stock at zero, and low
    /// when `1 ≤ stock ≤ threshold`. Low-stock products also count as in stock.
    #[must_use]
    pub fn build<'a>(products: impl IntoIterator<Item = &'a Product>, threshold: i32) -> Self {
        let mut report = Self {
            threshold,
            ..Self::default()
        };
        for product in products {
            report.total_products += 1;
            if product.stock <= 0 {
                report.out_of_stock += 1;
                continue;
            }
            report.in_stock += 1;
            if product.stock <= threshold {
                report.low_stock_items.push(LowStockItem {
                    id: product.id,
                    name: product.name.clone(),
                    category: product.category.clone(),
                    stock: product.stock,
                });
            }
        }
        report
            .low_stock_items
            .sort_by(|a, b| a.stock.cmp(&b.stock).then(a.name.cmp(&b.name)));
        report.low_stock = report.low_stock_items.len();
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::ProductType;

    fn product(id: i32, name: &str, stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: name.to_owned(),
            description: String::new(),
            price: Decimal::from(100),
            discounted_percentage: Decimal::ZERO,
            stock,
            category: "Kitchen".to_owned(),
            brand: None,
            images: vec!["https://media.example/p.jpg".to_owned()],
            is_available: true,
            offer: false,
            badge: false,
            product_type: ProductType::None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_classification() {
        let products = [
            product(1, "Pan", 0),
            product(2, "Ladle", 10),
            product(3, "Tongs", 11),
            product(4, "Whisk", 2),
        ];
        let report = StockReport::build(&products, DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(report.total_products, 4);
        assert_eq!(report.out_of_stock, 1);
        assert_eq!(report.in_stock, 3);
        assert_eq!(report.low_stock, 2);
        let names: Vec<&str> = report.low_stock_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Whisk", "Ladle"]);
    }

    #[test]
    fn test_custom_threshold_and_empty_catalog() {
        let products = [product(1, "Pan", 5)];
        assert_eq!(StockReport::build(&products, 3).low_stock, 0);
        let empty = StockReport::build(&[], DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(empty.total_products, 0);
        assert!(empty.low_stock_items.is_empty());
    }
}
