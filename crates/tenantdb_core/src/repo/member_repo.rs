//! Member repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{RepoResult, RepoResultExt};
use super::repository::Repository;
use crate::db::Filter;
use crate::model::member::{Member, MemberFilter, MemberPatch, NewMember};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type MemberRepository<'s> = Repository<'s, Member>;

impl Document for Member {
    const COLLECTION: &'static str = "members";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    type Input = NewMember;
    type Patch = MemberPatch;
    type Filter = MemberFilter;

    fn assemble(id: DocumentId, input: NewMember, now: Timestamp) -> Self {
        Self {
            id,
            email: input.email,
            inviter: input.inviter,
            workspace: input.workspace,
            member: input.member,
            role: input.role,
            status: input.status,
            joined_at: input.joined_at,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Member::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("workspace", &mut self.workspace)?;
        visitor.visit_opt("member", &mut self.member)
    }
}

impl DocumentPatch for MemberPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        MemberPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        match &mut self.member {
            Some(member) => visitor.visit_opt("member", member),
            None => Ok(()),
        }
    }
}

impl QueryFilter for MemberFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("workspace", self.workspace)
            .eq_opt("member", self.member)
            .eq_opt("email", self.email.as_deref())
            .eq_opt("role", self.role.map(|role| role.as_str()))
            .eq_opt("status", self.status.map(|status| status.as_str()))
    }
}

impl MemberRepository<'_> {
    /// Returns the membership linking `user` to `workspace`, if any.
    pub fn find_membership(
        &self,
        workspace: DocumentId,
        user: DocumentId,
    ) -> RepoResult<Option<Member>> {
        let filter = MemberFilter {
            workspace: Some(workspace),
            member: Some(user),
            ..MemberFilter::default()
        };
        let page = self.query(&filter, 0, 1).found()?;
        Ok(page.and_then(|mut page| page.results.pop()))
    }
}
