//! One-time sign-in verification token.

use super::validation::{self, ValidationError};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

const IDENTIFIER_MAX_CHARS: usize = 320;
const TOKEN_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationToken {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Usually the email address the token was sent to.
    pub identifier: String,
    pub token: String,
    /// Expiry, epoch milliseconds.
    pub expires: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identified for VerificationToken {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl VerificationToken {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("identifier", &self.identifier, IDENTIFIER_MAX_CHARS)?;
        validation::require_text("token", &self.token, TOKEN_MAX_CHARS)?;
        check_expiry(self.expires)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires <= now
    }
}

fn check_expiry(expires: Timestamp) -> Result<(), ValidationError> {
    if expires > 0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "expires",
            message: format!("must be a positive timestamp, got {expires}"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewVerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VerificationTokenPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<Timestamp>,
}

impl VerificationTokenPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.expires {
            Some(expires) => check_expiry(expires),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct VerificationTokenFilter {
    pub identifier: Option<String>,
    pub token: Option<String>,
}
