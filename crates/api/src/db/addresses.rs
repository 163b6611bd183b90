//! Address-book repository.
//!
//! A user has at most one default address. Every write that can change the
//! default runs in a transaction that locks the owner's row and clears the
//! previous default first. The partial unique index
//! `addresses_one_default_idx` backs this up; a violation surfaces as a
//! conflict.

use sqlx::{PgConnection, PgPool};

use storehouse_core::account::{AddressBookEntry, AddressInput};
use storehouse_core::{AddressId, UserId};

use super::{RepositoryError, conflict_on_unique};

const DEFAULT_CONFLICT: &str = "Another default address was saved at the same time, try again";

const ADDRESS_COLUMNS: &str = "id, label, street, city, state, zip, country, phone, is_default";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    label: String,
    street: String,
    city: String,
    state: String,
    zip: String,
    country: String,
    phone: String,
    is_default: bool,
}

impl From<AddressRow> for AddressBookEntry {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            label: row.label,
            street: row.street,
            city: row.city,
            state: row.state,
            zip: row.zip,
            country: row.country,
            phone: row.phone,
            is_default: row.is_default,
        }
    }
}

/// Repository for address-book entries.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses of a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user: UserId) -> Result<Vec<AddressBookEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, id"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add an address. The user's first address always becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a concurrent write claimed the
    /// default, `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user: UserId,
        input: &AddressInput,
    ) -> Result<AddressBookEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses WHERE user_id = $1")
            .bind(user)
            .fetch_one(&mut *tx)
            .await?;
        let is_default = input.is_default || existing == 0;
        if is_default {
            clear_default(&mut tx, user).await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            INSERT INTO addresses (user_id, label, street, city, state, zip, country, phone, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(default_conflict)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Replace an address's fields.
    ///
    /// Setting `is_default` makes it the default; clearing it on the current
    /// default leaves the user without one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to
    /// the user.
    pub async fn update(
        &self,
        user: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<AddressBookEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if input.is_default {
            lock_owner(&mut tx, user).await?;
            clear_default(&mut tx, user).await?;
        }

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            UPDATE addresses
            SET label = $3, street = $4, city = $5, state = $6, zip = $7,
                country = $8, phone = $9, is_default = $10
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.zip)
        .bind(&input.country)
        .bind(&input.phone)
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await
        .map_err(default_conflict)?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Make one address the user's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to
    /// the user.
    pub async fn set_default(
        &self,
        user: UserId,
        id: AddressId,
    ) -> Result<AddressBookEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        lock_owner(&mut tx, user).await?;
        clear_default(&mut tx, user).await?;

        let row = sqlx::query_as::<_, AddressRow>(&format!(
            r"
            UPDATE addresses SET is_default = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user)
        .fetch_optional(&mut *tx)
        .await
        .map_err(default_conflict)?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Insert or replace the user's default address (profile update).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_default(
        &self,
        user: UserId,
        input: &AddressInput,
    ) -> Result<AddressBookEntry, RepositoryError> {
        let current: Option<AddressId> =
            sqlx::query_scalar("SELECT id FROM addresses WHERE user_id = $1 AND is_default")
                .bind(user)
                .fetch_optional(self.pool)
                .await?;

        let input = AddressInput {
            is_default: true,
            ..input.clone()
        };
        match current {
            Some(id) => self.update(user, id, &input).await,
            None => self.create(user, &input).await,
        }
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not belong to
    /// the user.
    pub async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

async fn clear_default(conn: &mut PgConnection, user: UserId) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE addresses SET is_default = FALSE WHERE user_id = $1 AND is_default")
        .bind(user)
        .execute(conn)
        .await?;
    Ok(())
}

/// Serialize default-changing writes of one user's address book.
async fn lock_owner(conn: &mut PgConnection, user: UserId) -> Result<(), RepositoryError> {
    sqlx::query("SELECT 1 FROM users WHERE id = $1 FOR UPDATE")
        .bind(user)
        .execute(conn)
        .await?;
    Ok(())
}

fn default_conflict(e: sqlx::Error) -> RepositoryError {
    conflict_on_unique(e, DEFAULT_CONFLICT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::borrow::Cow;
    use std::error::Error as StdError;

    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    #[derive(Debug)]
    struct IndexViolation {
        unique: bool,
    }

    impl std::fmt::Display for IndexViolation {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("duplicate key value violates unique constraint")
        }
    }

    impl StdError for IndexViolation {}

    impl DatabaseError for IndexViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some("addresses_one_default_idx")
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_racing_default_is_a_conflict() {
        let err = default_conflict(sqlx::Error::Database(Box::new(IndexViolation {
            unique: true,
        })));
        assert!(matches!(err, RepositoryError::Conflict(ref msg) if msg == DEFAULT_CONFLICT));

        let err = default_conflict(sqlx::Error::Database(Box::new(IndexViolation {
            unique: false,
        })));
        assert!(matches!(err, RepositoryError::Database(_)));

        assert!(matches!(
            default_conflict(sqlx::Error::RowNotFound),
            RepositoryError::Database(_)
        ));
    }
}
