//! User accounts and address-book entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AddressId, Email, UserId, UserRole};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Account input failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("password must be at least 8 characters")]
    WeakPassword,
    #[error("phone number must be 10 digits")]
    InvalidPhone,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub addresses: Vec<AddressBookEntry>,
    pub created_at: DateTime<Utc>,
}

/// A saved delivery address. At most one entry per user is the default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookEntry {
    #[serde(rename = "_id")]
    pub id: AddressId,
    pub label: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}

/// Create or replace an address-book entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInput {
    pub label: String,
    pub street: String,
    pub city: String,
    pub state: String,
    #[serde(alias = "zipcode", alias = "zipCode")]
    pub zip: String,
    pub country: String,
    pub phone: String,
    pub is_default: bool,
}

impl AddressInput {
    /// Trim fields, default the label to "Home" and the country to "India".
    #[must_use]
    pub fn normalized(self) -> Self {
        let label = self.label.trim();
        let country = self.country.trim();
        Self {
            label: if label.is_empty() { "Home" } else { label }.to_owned(),
            street: self.street.trim().to_owned(),
            city: self.city.trim().to_owned(),
            state: self.state.trim().to_owned(),
            zip: self.zip.trim().to_owned(),
            country: if country.is_empty() { "India" } else { country }.to_owned(),
            phone: self.phone.trim().to_owned(),
            is_default: self.is_default,
        }
    }

    /// # Errors
    ///
    /// [`AccountError::MissingField`] naming the first blank field, or
    /// [`AccountError::InvalidPhone`].
    pub fn validate(&self) -> Result<(), AccountError> {
        for (name, value) in [
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(AccountError::MissingField(name));
            }
        }
        validate_phone(&self.phone)
    }
}

/// Body of `PUT /api/user/profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Upserted as the default address-book entry.
    pub address: Option<AddressInput>,
}

impl ProfileUpdate {
    /// # Errors
    ///
    /// [`AccountError`] for a blank name, a malformed phone or an invalid
    /// address.
    pub fn validate(&self) -> Result<(), AccountError> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(AccountError::MissingField("name"));
        }
        if let Some(phone) = &self.phone {
            validate_phone(phone)?;
        }
        if let Some(address) = &self.address {
            address.validate()?;
        }
        Ok(())
    }
}

/// Registration input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl Registration {
    /// # Errors
    ///
    /// [`AccountError::MissingField`] for a blank name or
    /// [`AccountError::WeakPassword`].
    pub fn validate(&self) -> Result<(), AccountError> {
        if self.name.trim().is_empty() {
            return Err(AccountError::MissingField("name"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AccountError::WeakPassword);
        }
        Ok(())
    }
}

/// Ten ASCII digits.
///
/// # Errors
///
/// [`AccountError::InvalidPhone`] otherwise.
pub fn validate_phone(phone: &str) -> Result<(), AccountError> {
    let phone = phone.trim();
    if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AccountError::InvalidPhone)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_input_defaults_and_validation() {
        let input: AddressInput = serde_json::from_str(
            r#"{"street": " 221B Baker St ", "city": "Mumbai", "state": "MH", "zipcode": "400001", "phone": "9123456789"}"#,
        )
        .unwrap();
        let input = input.normalized();
        assert_eq!(input.label, "Home");
        assert_eq!(input.country, "India");
        assert_eq!(input.street, "221B Baker St");
        assert!(input.validate().is_ok());

        let missing = AddressInput {
            city: String::new(),
            ..input.clone()
        };
        assert_eq!(missing.validate(), Err(AccountError::MissingField("city")));

        let bad_phone = AddressInput {
            phone: "12345".to_owned(),
            ..input
        };
        assert_eq!(bad_phone.validate(), Err(AccountError::InvalidPhone));
    }

    #[test]
    fn test_registration_rules() {
        let reg = Registration {
            name: "Meera".to_owned(),
            email: Email::parse("meera@example.com").unwrap(),
            password: "short".to_owned(),
        };
        assert_eq!(reg.validate(), Err(AccountError::WeakPassword));

        let reg = Registration {
            password: "long enough".to_owned(),
            ..reg
        };
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn test_profile_update_checks_given_fields_only() {
        assert!(ProfileUpdate::default().validate().is_ok());
        let update = ProfileUpdate {
            phone: Some("98765".to_owned()),
            ..ProfileUpdate::default()
        };
        assert_eq!(update.validate(), Err(AccountError::InvalidPhone));
    }
}
