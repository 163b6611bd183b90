//! Admin documentation pages.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storehouse_core::DocId;
use storehouse_core::content::{Doc, DocInput};

use super::RepositoryError;

const DOC_COLUMNS: &str = "id, title, category, content, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct DocRow {
    id: DocId,
    title: String,
    category: String,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocRow> for Doc {
    fn from(row: DocRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            category: row.category,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for documentation pages.
pub struct DocRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DocRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All docs, most recently edited first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Doc>, RepositoryError> {
        let rows = sqlx::query_as::<_, DocRow>(&format!(
            "SELECT {DOC_COLUMNS} FROM docs ORDER BY updated_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, input: &DocInput) -> Result<Doc, RepositoryError> {
        let row = sqlx::query_as::<_, DocRow>(&format!(
            "INSERT INTO docs (title, category, content) VALUES ($1, $2, $3) RETURNING {DOC_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(&input.category)
        .bind(&input.content)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn update(&self, id: DocId, input: &DocInput) -> Result<Doc, RepositoryError> {
        let row = sqlx::query_as::<_, DocRow>(&format!(
            r"
            UPDATE docs SET title = $2, category = $3, content = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {DOC_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.title)
        .bind(&input.category)
        .bind(&input.content)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: DocId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM docs WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
