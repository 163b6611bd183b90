//! Product repository: catalog reads, admin writes and stock movements.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use storehouse_core::product::{Product, ProductDraft};
use storehouse_core::{ProductId, ProductType};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, name, description, price, discounted_percentage, stock, \
     category, brand, images, is_available, offer, badge, product_type, tags, created_at, updated_at";

/// Largest page size accepted by [`ProductRepository::list`].
pub const MAX_PER_PAGE: i64 = 100;
/// Page size when none is requested.
pub const DEFAULT_PER_PAGE: i64 = 20;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    discounted_percentage: Decimal,
    stock: i32,
    category: String,
    brand: Option<String>,
    images: Vec<String>,
    is_available: bool,
    offer: bool,
    badge: bool,
    product_type: ProductType,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            discounted_percentage: row.discounted_percentage,
            stock: row.stock,
            category: row.category,
            brand: row.brand,
            images: row.images,
            is_available: row.is_available,
            offer: row.offer,
            badge: row.badge,
            product_type: row.product_type,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Catalog ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceLow,
    PriceHigh,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY created_at DESC, id DESC",
            Self::PriceLow => " ORDER BY price ASC, id ASC",
            Self::PriceHigh => " ORDER BY price DESC, id ASC",
            Self::Name => " ORDER BY lower(name) ASC, id ASC",
        }
    }
}

impl std::str::FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "newest" => Ok(Self::Newest),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "name" => Ok(Self::Name),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Catalog listing filters. Text filters are case-insensitive substrings.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub product_type: Option<ProductType>,
    pub sort: ProductSort,
    /// 1-based page number
    pub page: i64,
    pub per_page: i64,
}

impl ProductFilter {
    /// Clamp paging to `1 ≤ per_page ≤ MAX_PER_PAGE` and to a page whose
    /// offset fits in an `i64`.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.per_page = match self.per_page {
            n if n <= 0 => DEFAULT_PER_PAGE,
            n => n.min(MAX_PER_PAGE),
        };
        self.page = self.page.clamp(1, i64::MAX / self.per_page);
        self
    }

    /// Rows skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(category) = &self.category {
            qb.push(" AND category ILIKE ").push_bind(like_pattern(category));
        }
        if let Some(brand) = &self.brand {
            qb.push(" AND brand ILIKE ").push_bind(like_pattern(brand));
        }
        if let Some(search) = &self.search {
            let pattern = like_pattern(search);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE ")
                .push_bind(pattern)
                .push("))");
        }
        if let Some(product_type) = self.product_type {
            qb.push(" AND product_type = ").push_bind(product_type);
        }
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of the filtered catalog and the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        filter.push_where(&mut count);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        filter.push_where(&mut select);
        select
            .push(filter.sort.order_by())
            .push(" LIMIT ")
            .push_bind(filter.per_page)
            .push(" OFFSET ")
            .push_bind(filter.offset());
        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Insert a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products (name, description, price, discounted_percentage, stock,
                                  category, brand, images, is_available, offer, badge,
                                  product_type, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.discounted_percentage)
        .bind(draft.stock)
        .bind(&draft.category)
        .bind(&draft.brand)
        .bind(&draft.images)
        .bind(draft.is_available)
        .bind(draft.offer)
        .bind(draft.badge)
        .bind(draft.product_type)
        .bind(&draft.tags)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// Overwrite a product with a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn update(&self, id: ProductId, draft: &ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products
            SET name = $2, description = $3, price = $4, discounted_percentage = $5,
                stock = $6, category = $7, brand = $8, images = $9, is_available = $10,
                offer = $11, badge = $12, product_type = $13, tags = $14, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(draft.discounted_percentage)
        .bind(draft.stock)
        .bind(&draft.category)
        .bind(&draft.brand)
        .bind(&draft.images)
        .bind(draft.is_available)
        .bind(draft.offer)
        .bind(draft.badge)
        .bind(draft.product_type)
        .bind(&draft.tags)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete several products, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_many(&self, ids: &[ProductId]) -> Result<u64, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let result = sqlx::query("DELETE FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete the whole catalog, returning how many products were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM products").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Lock and load the given products inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_order(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, Product>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(&ids)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let product = Product::from(row);
            (product.id, product)
        })
        .collect())
}

/// Take `quantity` units out of stock unless that would go negative.
///
/// Returns `false` when the stock was insufficient and nothing changed.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn decrement_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: u32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2",
    )
    .bind(id)
    .bind(i64::from(quantity))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Put `quantity` units back into stock. Deleted products are skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn restore_stock(
    conn: &mut PgConnection,
    id: ProductId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(i64::from(quantity))
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" Kitchen "), "%Kitchen%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!("".parse::<ProductSort>().unwrap(), ProductSort::Newest);
        assert_eq!("price-high".parse::<ProductSort>().unwrap(), ProductSort::PriceHigh);
        assert!("cheapest".parse::<ProductSort>().is_err());
    }

    #[test]
    fn test_filter_paging_clamped() {
        let filter = ProductFilter {
            page: 0,
            per_page: 500,
            ..ProductFilter::default()
        }
        .clamped();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.per_page, MAX_PER_PAGE);

        let filter = ProductFilter::default().clamped();
        assert_eq!(filter.per_page, DEFAULT_PER_PAGE);
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_huge_page_offset_does_not_overflow() {
        for per_page in [0, 1, 7, MAX_PER_PAGE] {
            let filter = ProductFilter {
                page: i64::MAX,
                per_page,
                ..ProductFilter::default()
            }
            .clamped();
            assert!(filter.page >= 1);
            assert!(filter.offset() >= 0);
            assert!(filter.offset() <= i64::MAX - filter.per_page);
        }

        let filter = ProductFilter {
            page: 3,
            per_page: 20,
            ..ProductFilter::default()
        }
        .clamped();
        assert_eq!(filter.offset(), 40);
    }
}
