//! Audit log entry.
//!
//! Activities are append-only in practice: only `location` and `userAgent`
//! may be amended after the fact.

use super::project::Project;
use super::reference::Ref;
use super::user::User;
use super::validation::{self, ValidationError};
use super::workspace::Workspace;
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

const LOCATION_MAX_CHARS: usize = 200;
const USER_AGENT_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    Deleted,
    Invited,
    Joined,
    Left,
    SignedIn,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::Invited => "invited",
            Self::Joined => "joined",
            Self::Left => "left",
            Self::SignedIn => "signed_in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Workspace,
    Member,
    Project,
    State,
    FileStats,
    Threshold,
}

/// What an activity acted on. Not checked for existence: the resource may
/// have been deleted by the very action being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceKind,
    pub id: DocumentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub actor: Ref<User>,
    pub action: ActivityAction,
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Ref<Workspace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Ref<Project>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identified for Activity {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl Activity {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_client_fields(self.location.as_deref(), self.user_agent.as_deref())
    }
}

fn check_client_fields(
    location: Option<&str>,
    user_agent: Option<&str>,
) -> Result<(), ValidationError> {
    if let Some(location) = location {
        validation::bounded_text("location", location, LOCATION_MAX_CHARS)?;
    }
    if let Some(user_agent) = user_agent {
        validation::bounded_text("userAgent", user_agent, USER_AGENT_MAX_CHARS)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewActivity {
    pub actor: Ref<User>,
    pub action: ActivityAction,
    pub resource: Resource,
    #[serde(default)]
    pub workspace: Option<Ref<Workspace>>,
    #[serde(default)]
    pub project: Option<Ref<Project>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl NewActivity {
    pub fn new(actor: DocumentId, action: ActivityAction, resource: Resource) -> Self {
        Self {
            actor: Ref::Id(actor),
            action,
            resource,
            workspace: None,
            project: None,
            location: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ActivityPatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub location: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub user_agent: Option<Option<String>>,
}

impl ActivityPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_client_fields(
            self.location.as_ref().and_then(Option::as_deref),
            self.user_agent.as_ref().and_then(Option::as_deref),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ActivityFilter {
    pub actor: Option<DocumentId>,
    pub action: Option<ActivityAction>,
    pub workspace: Option<DocumentId>,
    pub project: Option<DocumentId>,
}
