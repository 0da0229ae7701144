//! Workspace (tenant) model.

use super::reference::Ref;
use super::user::User;
use super::validation::{self, ValidationError, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

const SLUG_MAX_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    /// URL-safe handle, lowercase kebab-case.
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator: Ref<User>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Identified for Workspace {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl Workspace {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("name", &self.name, NAME_MAX_CHARS)?;
        validate_slug(&self.slug)?;
        if let Some(description) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        Ok(())
    }
}

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    validation::bounded_text("slug", slug, SLUG_MAX_CHARS)?;
    validation::slug("slug", slug)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewWorkspace {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub creator: Ref<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WorkspacePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<Ref<User>>,
}

impl WorkspacePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        if let Some(Some(description)) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WorkspaceFilter {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub creator: Option<DocumentId>,
    pub include_deleted: bool,
}
