//! Activity log repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::RepoResult;
use super::repository::Repository;
use crate::db::Filter;
use crate::model::activity::{
    Activity, ActivityAction, ActivityFilter, ActivityPatch, NewActivity, Resource,
};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type ActivityRepository<'s> = Repository<'s, Activity>;

impl Document for Activity {
    const COLLECTION: &'static str = "activities";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    type Input = NewActivity;
    type Patch = ActivityPatch;
    type Filter = ActivityFilter;

    fn assemble(id: DocumentId, input: NewActivity, now: Timestamp) -> Self {
        Self {
            id,
            actor: input.actor,
            action: input.action,
            resource: input.resource,
            workspace: input.workspace,
            project: input.project,
            location: input.location,
            user_agent: input.user_agent,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Activity::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("actor", &mut self.actor)?;
        visitor.visit_opt("workspace", &mut self.workspace)?;
        visitor.visit_opt("project", &mut self.project)
    }
}

impl DocumentPatch for ActivityPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        ActivityPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl QueryFilter for ActivityFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("actor", self.actor)
            .eq_opt("action", self.action.map(ActivityAction::as_str))
            .eq_opt("workspace", self.workspace)
            .eq_opt("project", self.project)
    }
}

impl ActivityRepository<'_> {
    /// Appends one entry to the activity log.
    pub fn record(
        &self,
        actor: DocumentId,
        action: ActivityAction,
        resource: Resource,
    ) -> RepoResult<Activity> {
        self.create(NewActivity::new(actor, action, resource))
    }
}
