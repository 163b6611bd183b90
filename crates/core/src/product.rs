//! Catalog product model.
//!
//! Category and brand are free-text names, not foreign keys: renaming a
//! category does not touch the products that mention it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{MoneyError, ProductId, ProductType, discounted_unit_price};
use crate::types::{validate_discount, validate_price};

/// Maximum number of images per product.
pub const MAX_IMAGES: usize = 4;

/// Validation failures for product input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("product category is required")]
    MissingCategory,
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error("stock cannot be negative")]
    NegativeStock,
    #[error("a product needs between 1 and 4 images (got {0})")]
    ImageCount(usize),
    #[error("image references cannot be blank")]
    BlankImage,
}

/// A product as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub discounted_percentage: Decimal,
    pub stock: i32,
    pub category: String,
    pub brand: Option<String>,
    pub images: Vec<String>,
    pub is_available: bool,
    pub offer: bool,
    pub badge: bool,
    #[serde(rename = "_type")]
    pub product_type: ProductType,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Unit price after the product's own discount.
    #[must_use]
    pub fn net_price(&self) -> Decimal {
        discounted_unit_price(self.price, self.discounted_percentage)
    }

    /// Whether the product can currently be ordered in `quantity` units.
    #[must_use]
    pub fn can_fulfil(&self, quantity: u32) -> bool {
        self.is_available && i64::from(self.stock) >= i64::from(quantity)
    }

    /// The subset of fields a cart keeps for display and pricing.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            discounted_percentage: self.discounted_percentage,
            image: self.images.first().cloned(),
        }
    }
}

/// Product fields captured when an item is put in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub discounted_percentage: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// Input for creating a product (or the full state after an edit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub discounted_percentage: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub category: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub offer: bool,
    #[serde(default)]
    pub badge: bool,
    #[serde(rename = "_type", default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub tags: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl ProductDraft {
    /// Trim text fields and drop blank tags and an empty brand.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_owned();
        self.description = self.description.trim().to_owned();
        self.category = self.category.trim().to_owned();
        self.brand = self
            .brand
            .map(|b| b.trim().to_owned())
            .filter(|b| !b.is_empty());
        self.images = self.images.into_iter().map(|i| i.trim().to_owned()).collect();
        self.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    /// Check the catalog invariants: price ≥ 0, discount in 0..=100,
    /// stock ≥ 0, 1-4 non-blank images, name and category present.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`ProductError`].
    pub fn validate(&self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() {
            return Err(ProductError::MissingName);
        }
        if self.category.trim().is_empty() {
            return Err(ProductError::MissingCategory);
        }
        validate_price(self.price)?;
        validate_discount(self.discounted_percentage)?;
        if self.stock < 0 {
            return Err(ProductError::NegativeStock);
        }
        if self.images.is_empty() || self.images.len() > MAX_IMAGES {
            return Err(ProductError::ImageCount(self.images.len()));
        }
        if self.images.iter().any(|i| i.trim().is_empty()) {
            return Err(ProductError::BlankImage);
        }
        Ok(())
    }
}

impl From<Product> for ProductDraft {
    fn from(p: Product) -> Self {
        Self {
            name: p.name,
            description: p.description,
            price: p.price,
            discounted_percentage: p.discounted_percentage,
            stock: p.stock,
            category: p.category,
            brand: p.brand,
            images: p.images,
            is_available: p.is_available,
            offer: p.offer,
            badge: p.badge,
            product_type: p.product_type,
            tags: p.tags,
        }
    }
}

/// Partial update for an existing product. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub discounted_percentage: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub images: Option<Vec<String>>,
    pub is_available: Option<bool>,
    pub offer: Option<bool>,
    pub badge: Option<bool>,
    #[serde(rename = "_type")]
    pub product_type: Option<ProductType>,
    pub tags: Option<Vec<String>>,
}

impl ProductPatch {
    /// Apply the patch on top of `draft`, returning the normalized result.
    ///
    /// An empty `brand` string clears the brand.
    #[must_use]
    pub fn apply(self, mut draft: ProductDraft) -> ProductDraft {
        if let Some(v) = self.name {
            draft.name = v;
        }
        if let Some(v) = self.description {
            draft.description = v;
        }
        if let Some(v) = self.price {
            draft.price = v;
        }
        if let Some(v) = self.discounted_percentage {
            draft.discounted_percentage = v;
        }
        if let Some(v) = self.stock {
            draft.stock = v;
        }
        if let Some(v) = self.category {
            draft.category = v;
        }
        if let Some(v) = self.brand {
            draft.brand = Some(v);
        }
        if let Some(v) = self.images {
            draft.images = v;
        }
        if let Some(v) = self.is_available {
            draft.is_available = v;
        }
        if let Some(v) = self.offer {
            draft.offer = v;
        }
        if let Some(v) = self.badge {
            draft.badge = v;
        }
        if let Some(v) = self.product_type {
            draft.product_type = v;
        }
        if let Some(v) = self.tags {
            draft.tags = v;
        }
        draft.normalized()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Sony WH-1000XM5 Headphones".to_owned(),
            description: "Noise cancelling".to_owned(),
            price: Decimal::from(29990),
            discounted_percentage: Decimal::from(10),
            stock: 100,
            category: "Electronics".to_owned(),
            brand: Some("Sony".to_owned()),
            images: vec!["https://media.example/wh1000xm5.jpg".to_owned()],
            is_available: true,
            offer: false,
            badge: false,
            product_type: ProductType::BestSellers,
            tags: vec!["audio".to_owned()],
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_invariants() {
        let mut d = draft();
        d.stock = -1;
        assert_eq!(d.validate(), Err(ProductError::NegativeStock));

        let mut d = draft();
        d.price = Decimal::from(-10);
        assert_eq!(
            d.validate(),
            Err(ProductError::Money(MoneyError::NegativePrice))
        );

        let mut d = draft();
        d.discounted_percentage = Decimal::from(101);
        assert_eq!(
            d.validate(),
            Err(ProductError::Money(MoneyError::DiscountOutOfRange))
        );

        let mut d = draft();
        d.images = Vec::new();
        assert_eq!(d.validate(), Err(ProductError::ImageCount(0)));

        let mut d = draft();
        d.images = vec!["a".to_owned(); 5];
        assert_eq!(d.validate(), Err(ProductError::ImageCount(5)));

        let mut d = draft();
        d.category = "  ".to_owned();
        assert_eq!(d.validate(), Err(ProductError::MissingCategory));
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let patch = ProductPatch {
            stock: Some(3),
            brand: Some("  ".to_owned()),
            tags: Some(vec![" Music ".to_owned(), String::new()]),
            ..ProductPatch::default()
        };
        let updated = patch.apply(draft());
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.brand, None);
        assert_eq!(updated.tags, vec!["music".to_owned()]);
        assert_eq!(updated.name, "Sony WH-1000XM5 Headphones");
    }

    #[test]
    fn test_draft_deserializes_legacy_type() {
        let json = r#"{
            "name": "PlayStation 5 Console",
            "price": 54990,
            "category": "Electronics",
            "images": ["https://media.example/ps5.jpg"],
            "_type": "bestseller"
        }"#;
        let d: ProductDraft = serde_json::from_str(json).unwrap();
        assert_eq!(d.product_type, ProductType::BestSellers);
        assert!(d.is_available);
        assert_eq!(d.discounted_percentage, Decimal::ZERO);
    }
}
