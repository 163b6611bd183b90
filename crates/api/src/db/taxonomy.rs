//! Category and brand repositories.
//!
//! Products reference categories and brands by name, not by id, so renaming
//! or deleting one here leaves existing products untouched.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use storehouse_core::{BrandId, CategoryId};

use super::{RepositoryError, conflict_on_unique};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: BrandId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY lower(name)",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, name: &str) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id or
    /// `RepositoryError::Conflict` if the new name is taken.
    pub async fn rename(&self, id: CategoryId, name: &str) -> Result<Category, RepositoryError> {
        sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "category already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Repository for brands.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All brands by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Brand>, RepositoryError> {
        let rows =
            sqlx::query_as::<_, Brand>("SELECT id, name, created_at FROM brands ORDER BY lower(name)")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(&self, name: &str) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>("INSERT INTO brands (name) VALUES ($1) RETURNING id, name, created_at")
            .bind(name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "brand already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: BrandId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
