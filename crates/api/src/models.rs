//! Server-side models that never leave the API crate unconverted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use storehouse_core::account::{AddressBookEntry, UserProfile};
use storehouse_core::order::Order;
use storehouse_core::{Email, UserId, UserRole};

/// A stored user account (without its password hash).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    /// Public profile including the address book.
    #[must_use]
    pub fn into_profile(self, addresses: Vec<AddressBookEntry>) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role: self.role,
            addresses,
            created_at: self.created_at,
        }
    }
}

/// Owner details attached to orders in admin listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderOwner {
    pub name: String,
    pub email: String,
}

/// An order together with its owner, for admin views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithOwner {
    #[serde(flatten)]
    pub order: Order,
    pub user: OrderOwner,
}

/// A recently registered user on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub created_at: DateTime<Utc>,
}
