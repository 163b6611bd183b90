//! Contact-form messages and admin documentation pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ContactId, DocId, Email, EmailError};

/// Content input failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Email(#[from] EmailError),
}

/// A message left through the storefront contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: ContactId,
    pub client_name: String,
    pub email: Email,
    pub messages: String,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInput {
    pub client_name: String,
    pub email: String,
    pub messages: String,
}

/// A contact message that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub client_name: String,
    pub email: Email,
    pub messages: String,
}

impl ContactInput {
    /// # Errors
    ///
    /// [`ContentError::MissingField`] or [`ContentError::Email`].
    pub fn validate(self) -> Result<NewContact, ContentError> {
        let client_name = required("clientName", &self.client_name)?;
        if self.email.trim().is_empty() {
            return Err(ContentError::MissingField("email"));
        }
        let email = Email::parse(&self.email)?;
        let messages = required("messages", &self.messages)?;
        Ok(NewContact {
            client_name,
            email,
            messages,
        })
    }
}

/// An internal documentation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doc {
    #[serde(rename = "_id")]
    pub id: DocId,
    pub title: String,
    pub category: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/doc/add`; also the full state written by an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocInput {
    pub title: String,
    pub category: String,
    pub content: String,
}

impl DocInput {
    /// Trim fields; category defaults to "General".
    ///
    /// # Errors
    ///
    /// [`ContentError::MissingField`] for a blank title or content.
    pub fn validate(self) -> Result<Self, ContentError> {
        let title = required("title", &self.title)?;
        let content = required("content", &self.content)?;
        let category = match self.category.trim() {
            "" => "General".to_owned(),
            c => c.to_owned(),
        };
        Ok(Self {
            title,
            category,
            content,
        })
    }
}

fn required(name: &'static str, value: &str) -> Result<String, ContentError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ContentError::MissingField(name))
    } else {
        Ok(value.to_owned())
    }
}
