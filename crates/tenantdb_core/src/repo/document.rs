//! Contracts an entity implements to get a repository.

use super::error::RepoResult;
use crate::db::{DocumentStore, Filter};
use crate::model::reference::Ref;
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Identified, Timestamp};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// How `delete_by_id` removes a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// The row is physically removed.
    Hard,
    /// `deletedAt` is set and the row is hidden from reads.
    Soft,
}

/// A persisted entity type.
pub trait Document: Identified + Serialize + DeserializeOwned + Clone + Debug {
    /// Collection name in the backing store.
    const COLLECTION: &'static str;
    const DELETE_MODE: DeleteMode;

    /// Create payload: every field except id and timestamps.
    type Input: DeserializeOwned + Debug;
    type Patch: DocumentPatch;
    type Filter: QueryFilter;

    /// Builds the full document from a payload and server-assigned fields.
    fn assemble(id: DocumentId, input: Self::Input, now: Timestamp) -> Self;

    /// Checks schema rules on the fully assembled document.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Walks every reference field.
    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()>;

    /// Checks rules spanning several documents once references resolve.
    ///
    /// Runs on create and on the merged result of an update.
    fn check_relations(
        &self,
        _store: DocumentStore<'_>,
        _operation: &'static str,
    ) -> RepoResult<()> {
        Ok(())
    }
}

/// Statically typed partial update for one entity.
///
/// Absent fields are `None` and never serialized.
pub trait DocumentPatch: Serialize + DeserializeOwned + Default + Debug {
    fn validate(&self) -> Result<(), ValidationError>;

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()>;
}

/// Typed query filter lowered to a store filter.
pub trait QueryFilter: DeserializeOwned + Default + Debug {
    fn to_filter(&self) -> Filter;
}

/// Visits reference fields, keyed by their JSON field name.
pub trait RefVisitor {
    fn visit<T: Document>(&mut self, field: &'static str, reference: &mut Ref<T>)
        -> RepoResult<()>;

    fn visit_many<T: Document>(
        &mut self,
        field: &'static str,
        references: &mut [Ref<T>],
    ) -> RepoResult<()> {
        for reference in references {
            self.visit(field, reference)?;
        }
        Ok(())
    }

    fn visit_opt<T: Document>(
        &mut self,
        field: &'static str,
        reference: &mut Option<Ref<T>>,
    ) -> RepoResult<()> {
        match reference {
            Some(reference) => self.visit(field, reference),
            None => Ok(()),
        }
    }
}

/// Replaces embedded documents with their ids before a write.
pub struct Collapse;

impl RefVisitor for Collapse {
    fn visit<T: Document>(&mut self, _field: &'static str, reference: &mut Ref<T>) -> RepoResult<()> {
        reference.collapse();
        Ok(())
    }
}
