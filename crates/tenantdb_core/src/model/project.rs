//! Project model: a workspace-scoped container for states and data files.
//!
//! # Invariants
//! - `states`, `members` and `files` are ordered sets: no id appears twice.
//! - `tags` are non-blank and bounded.

use super::file_stats::FileStats;
use super::member::Member;
use super::reference::Ref;
use super::state::State;
use super::user::User;
use super::validation::{self, ValidationError, DESCRIPTION_MAX_CHARS, NAME_MAX_CHARS};
use super::workspace::Workspace;
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const TAG_MAX_CHARS: usize = 40;
const MAX_TAGS: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub workspace: Ref<Workspace>,
    pub owner: Ref<User>,
    #[serde(default)]
    pub members: Vec<Ref<Member>>,
    #[serde(default)]
    pub states: Vec<Ref<State>>,
    #[serde(default)]
    pub files: Vec<Ref<FileStats>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl Identified for Project {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl Project {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("name", &self.name, NAME_MAX_CHARS)?;
        if let Some(description) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        validate_tags(&self.tags)?;
        unique_refs("members", &self.members)?;
        unique_refs("states", &self.states)?;
        unique_refs("files", &self.files)
    }

    pub fn state_ids(&self) -> Vec<DocumentId> {
        self.states.iter().map(Ref::id).collect()
    }
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(ValidationError::OutOfRange {
            field: "tags",
            message: format!("at most {MAX_TAGS} tags are allowed"),
        });
    }
    for tag in tags {
        validation::require_text("tags", tag, TAG_MAX_CHARS)?;
    }
    Ok(())
}

pub(crate) fn unique_refs<T: Identified>(
    field: &'static str,
    references: &[Ref<T>],
) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(references.len());
    for reference in references {
        if !seen.insert(reference.id()) {
            return Err(ValidationError::InvalidFormat {
                field,
                value: format!("duplicate id {}", reference.id()),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub workspace: Ref<Workspace>,
    pub owner: Ref<User>,
    #[serde(default)]
    pub members: Vec<Ref<Member>>,
    #[serde(default)]
    pub states: Vec<Ref<State>>,
    #[serde(default)]
    pub files: Vec<Ref<FileStats>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, workspace: DocumentId, owner: DocumentId) -> Self {
        Self {
            name: name.into(),
            description: None,
            workspace: Ref::Id(workspace),
            owner: Ref::Id(owner),
            members: Vec::new(),
            states: Vec::new(),
            files: Vec::new(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Ref<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Ref<Member>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<Vec<Ref<State>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<Ref<FileStats>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ProjectPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(Some(description)) = &self.description {
            validation::bounded_text("description", description, DESCRIPTION_MAX_CHARS)?;
        }
        if let Some(tags) = &self.tags {
            validate_tags(tags)?;
        }
        if let Some(members) = &self.members {
            unique_refs("members", members)?;
        }
        if let Some(states) = &self.states {
            unique_refs("states", states)?;
        }
        if let Some(files) = &self.files {
            unique_refs("files", files)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProjectFilter {
    pub name: Option<String>,
    pub workspace: Option<DocumentId>,
    pub owner: Option<DocumentId>,
    /// Projects whose `members` list contains this member id.
    pub member: Option<DocumentId>,
    pub tag: Option<String>,
    pub include_deleted: bool,
}
