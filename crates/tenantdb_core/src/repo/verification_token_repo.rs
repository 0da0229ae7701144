//! Verification token repository.
//!
//! # Invariants
//! - A token can be consumed at most once; consuming deletes it.
//! - Lookup and delete run in one transaction, so concurrent consumers of
//!   the same token see exactly one success.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{RepoError, RepoResult};
use super::repository::Repository;
use crate::db::{DbError, Filter};
use crate::model::validation::ValidationError;
use crate::model::verification_token::{
    NewVerificationToken, VerificationToken, VerificationTokenFilter, VerificationTokenPatch,
};
use crate::model::{DocumentId, Timestamp};
use log::info;

const OP_CONSUME: &str = "consume";

pub type VerificationTokenRepository<'s> = Repository<'s, VerificationToken>;

impl Document for VerificationToken {
    const COLLECTION: &'static str = "verification_tokens";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    type Input = NewVerificationToken;
    type Patch = VerificationTokenPatch;
    type Filter = VerificationTokenFilter;

    fn assemble(id: DocumentId, input: NewVerificationToken, now: Timestamp) -> Self {
        Self {
            id,
            identifier: input.identifier,
            token: input.token,
            expires: input.expires,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        VerificationToken::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl DocumentPatch for VerificationTokenPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        VerificationTokenPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl QueryFilter for VerificationTokenFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("identifier", self.identifier.as_deref())
            .eq_opt("token", self.token.as_deref())
    }
}

impl VerificationTokenRepository<'_> {
    /// Looks up the token for `identifier` and deletes it.
    ///
    /// Returns `None` when no such token exists. Expired tokens are still
    /// deleted and returned; callers check `is_expired`.
    pub fn consume(
        &self,
        identifier: &str,
        token: &str,
    ) -> RepoResult<Option<VerificationToken>> {
        let filter = VerificationTokenFilter {
            identifier: Some(identifier.to_string()),
            token: Some(token.to_string()),
        }
        .to_filter();

        self.instrument(OP_CONSUME, || {
            let store = self.store();
            let db_error = |err: DbError| RepoError::database(VerificationToken::COLLECTION, OP_CONSUME, err);

            let tx = store.transaction().map_err(db_error)?;
            let Some(raw) = store
                .find(VerificationToken::COLLECTION, &filter, 0, 1)
                .map_err(db_error)?
                .pop()
            else {
                return Ok(None);
            };
            let found: VerificationToken = raw.into_document().map_err(db_error)?;

            if store
                .delete_one(VerificationToken::COLLECTION, found.id)
                .map_err(db_error)?
                == 0
            {
                return Ok(None);
            }
            tx.commit().map_err(|err| db_error(err.into()))?;

            info!(
                "event=token_consume module=repo status=ok collection={} id={}",
                VerificationToken::COLLECTION,
                found.id
            );
            Ok(Some(found))
        })
    }
}
