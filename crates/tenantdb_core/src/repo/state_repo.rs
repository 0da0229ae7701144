//! State repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::RepoResult;
use super::repository::Repository;
use crate::db::Filter;
use crate::model::state::{NewState, State, StateFilter, StatePatch};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type StateRepository<'s> = Repository<'s, State>;

impl Document for State {
    const COLLECTION: &'static str = "states";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    type Input = NewState;
    type Patch = StatePatch;
    type Filter = StateFilter;

    fn assemble(id: DocumentId, input: NewState, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            project: input.project,
            created_by: input.created_by,
            aspect_ratio: input.aspect_ratio,
            snapshot: input.snapshot,
            image_hash: input.image_hash,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        State::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("project", &mut self.project)?;
        visitor.visit("createdBy", &mut self.created_by)
    }
}

impl DocumentPatch for StatePatch {
    fn validate(&self) -> Result<(), ValidationError> {
        StatePatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl QueryFilter for StateFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("name", self.name.as_deref())
            .eq_opt("project", self.project)
            .eq_opt("createdBy", self.created_by)
            .include_deleted(self.include_deleted)
    }
}
