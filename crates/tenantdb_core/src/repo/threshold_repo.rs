//! Threshold repository.
//!
//! # Invariants
//! - A threshold scoped to a state belongs to that state's project, on
//!   create and after every update.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{RepoError, RepoResult};
use super::repository::Repository;
use crate::db::{DocumentStore, Filter};
use crate::model::state::State;
use crate::model::threshold::{NewThreshold, Threshold, ThresholdFilter, ThresholdPatch};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type ThresholdRepository<'s> = Repository<'s, Threshold>;

impl Document for Threshold {
    const COLLECTION: &'static str = "thresholds";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    type Input = NewThreshold;
    type Patch = ThresholdPatch;
    type Filter = ThresholdFilter;

    fn assemble(id: DocumentId, input: NewThreshold, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            project: input.project,
            state: input.state,
            column: input.column,
            min: input.min,
            max: input.max,
            color: input.color,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Threshold::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("project", &mut self.project)?;
        visitor.visit_opt("state", &mut self.state)
    }

    fn check_relations(&self, store: DocumentStore<'_>, operation: &'static str) -> RepoResult<()> {
        let Some(state) = &self.state else {
            return Ok(());
        };
        // Dangling ids are reported by the reference check.
        let Some(scoped) = Repository::<State>::new(store)
            .without_population()
            .load(state.id())?
        else {
            return Ok(());
        };

        let state_project = scoped.project.id();
        if state_project == self.project.id() {
            return Ok(());
        }
        Err(RepoError::invalid_operation(
            Self::COLLECTION,
            operation,
            "state",
            state.id(),
            format!("state belongs to project {state_project}"),
        ))
    }
}

impl DocumentPatch for ThresholdPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        ThresholdPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        match &mut self.state {
            Some(state) => visitor.visit_opt("state", state),
            None => Ok(()),
        }
    }
}

impl QueryFilter for ThresholdFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("project", self.project)
            .eq_opt("state", self.state)
            .eq_opt("column", self.column.as_deref())
    }
}
