//! Contact inbox repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use storehouse_core::{ContactId, Email};
use storehouse_core::content::{ContactMessage, NewContact};

use super::RepositoryError;

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: ContactId,
    client_name: String,
    email: Email,
    messages: String,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for ContactMessage {
    fn from(row: ContactRow) -> Self {
        Self {
            id: row.id,
            client_name: row.client_name,
            email: row.email,
            messages: row.messages,
            created_at: row.created_at,
        }
    }
}

/// Repository for contact-form messages.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, contact: &NewContact) -> Result<ContactMessage, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r"
            INSERT INTO contacts (client_name, email, messages)
            VALUES ($1, $2, $3)
            RETURNING id, client_name, email, messages, created_at
            ",
        )
        .bind(&contact.client_name)
        .bind(&contact.email)
        .bind(&contact.messages)
        .fetch_one(self.pool)
        .await?;
        Ok(row.into())
    }

    /// All messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ContactMessage>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            "SELECT id, client_name, email, messages, created_at FROM contacts ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: ContactId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
