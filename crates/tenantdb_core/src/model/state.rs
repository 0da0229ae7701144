//! Saved visualization state of a project.

use super::project::Project;
use super::reference::Ref;
use super::user::User;
use super::validation::{self, ValidationError, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Map;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: f64,
    pub height: f64,
}

impl AspectRatio {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (value, label) in [(self.width, "width"), (self.height, "height")] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::OutOfRange {
                    field: "aspectRatio",
                    message: format!("{label} must be a positive number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project: Ref<Project>,
    pub created_by: Ref<User>,
    pub aspect_ratio: AspectRatio,
    /// Opaque client snapshot; stored and returned as-is.
    #[serde(default)]
    pub snapshot: Map<String, serde_json::Value>,
    /// Hex digest of the rendered preview image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_hash: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Identified for State {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl State {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("name", &self.name, NAME_MAX_CHARS)?;
        if let Some(description) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        self.aspect_ratio.validate()?;
        if let Some(image_hash) = &self.image_hash {
            validation::hex_digest("imageHash", image_hash)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewState {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub project: Ref<Project>,
    pub created_by: Ref<User>,
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub snapshot: Map<String, serde_json::Value>,
    #[serde(default)]
    pub image_hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Map<String, serde_json::Value>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub image_hash: Option<Option<String>>,
}

impl StatePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(Some(description)) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        if let Some(aspect_ratio) = &self.aspect_ratio {
            aspect_ratio.validate()?;
        }
        if let Some(Some(image_hash)) = &self.image_hash {
            validation::hex_digest("imageHash", image_hash)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct StateFilter {
    pub name: Option<String>,
    pub project: Option<DocumentId>,
    pub created_by: Option<DocumentId>,
    pub include_deleted: bool,
}
