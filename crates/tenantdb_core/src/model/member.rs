//! Workspace membership and invitation model.
//!
//! A member document exists from the moment an invitation is sent. `member`
//! stays empty until the invitee signs up and accepts.

use super::reference::Ref;
use super::user::User;
use super::validation::{self, ValidationError, NAME_MAX_CHARS};
use super::workspace::Workspace;
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
    Guest,
}

impl MemberRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }

    /// Whether this role may manage other members.
    pub fn can_manage_members(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Address the invitation was sent to.
    pub email: String,
    /// Display name of whoever sent the invitation.
    pub inviter: String,
    pub workspace: Ref<Workspace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Ref<User>>,
    pub role: MemberRole,
    pub status: InvitationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identified for Member {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl Member {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::email("email", &self.email)?;
        validation::require_text("inviter", &self.inviter, NAME_MAX_CHARS)?;
        if self.status == InvitationStatus::Accepted && self.member.is_none() {
            return Err(ValidationError::Required("member"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMember {
    pub email: String,
    pub inviter: String,
    pub workspace: Ref<Workspace>,
    #[serde(default)]
    pub member: Option<Ref<User>>,
    pub role: MemberRole,
    #[serde(default = "default_status")]
    pub status: InvitationStatus,
    #[serde(default)]
    pub joined_at: Option<Timestamp>,
}

fn default_status() -> InvitationStatus {
    InvitationStatus::Pending
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemberPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inviter: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub member: Option<Option<Ref<User>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InvitationStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub joined_at: Option<Option<Timestamp>>,
}

impl MemberPatch {
    /// Patch that accepts a pending invitation on behalf of `user`.
    pub fn accept(user: DocumentId, now: Timestamp) -> Self {
        Self {
            member: Some(Some(Ref::Id(user))),
            status: Some(InvitationStatus::Accepted),
            joined_at: Some(Some(now)),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.email {
            validation::email("email", email)?;
        }
        if let Some(inviter) = &self.inviter {
            validation::require_text("inviter", inviter, NAME_MAX_CHARS)?;
        }
        if self.status == Some(InvitationStatus::Accepted) && matches!(self.member, Some(None)) {
            return Err(ValidationError::Required("member"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MemberFilter {
    pub workspace: Option<DocumentId>,
    pub member: Option<DocumentId>,
    pub email: Option<String>,
    pub role: Option<MemberRole>,
    pub status: Option<InvitationStatus>,
}

#[cfg(test)]
mod tests {
    use super::{InvitationStatus, MemberPatch, MemberRole};
    use uuid::Uuid;

    #[test]
    fn roles_and_statuses_use_snake_case_on_the_wire() {
        assert_eq!(serde_json::to_value(MemberRole::Admin).unwrap(), "admin");
        assert_eq!(
            serde_json::from_value::<InvitationStatus>(serde_json::json!("declined")).unwrap(),
            InvitationStatus::Declined
        );
        assert_eq!(MemberRole::Guest.as_str(), "guest");
        assert!(MemberRole::Owner.can_manage_members());
        assert!(!MemberRole::Member.can_manage_members());
    }

    #[test]
    fn accepting_without_a_user_is_rejected() {
        let patch = MemberPatch {
            member: Some(None),
            status: Some(InvitationStatus::Accepted),
            ..MemberPatch::default()
        };
        assert!(patch.validate().is_err());
        assert!(MemberPatch::accept(Uuid::new_v4(), 10).validate().is_ok());
    }
}
