//! User account model.
//!
//! # Invariants
//! - `email` is unique per live account; uniqueness is checked by callers
//!   through `get_by_email`, not by the store.
//! - `username`, when set, is lowercase and 3-32 characters.

use super::validation::{self, ValidationError, NAME_MAX_CHARS};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

const IMAGE_URL_MAX_CHARS: usize = 2_048;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub email: String,
    /// When the address was confirmed, if ever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Identified for User {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("name", &self.name, NAME_MAX_CHARS)?;
        validation::email("email", &self.email)?;
        if let Some(username) = &self.username {
            validation::username("username", username)?;
        }
        if let Some(image) = &self.image {
            validation::bounded_text("image", image, IMAGE_URL_MAX_CHARS)?;
        }
        Ok(())
    }
}

/// Create payload for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewUser {
    pub name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<Timestamp>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: None,
            email: email.into(),
            email_verified: None,
            image: None,
        }
    }
}

/// Partial update for a user. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub username: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub email_verified: Option<Option<Timestamp>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub image: Option<Option<String>>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(Some(username)) = &self.username {
            validation::username("username", username)?;
        }
        if let Some(Some(image)) = &self.image {
            validation::bounded_text("image", image, IMAGE_URL_MAX_CHARS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct UserFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub include_deleted: bool,
}
