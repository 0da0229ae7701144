//! Workspace repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{LookupKey, RepoError, RepoResult};
use super::repository::Repository;
use crate::db::Filter;
use crate::model::validation::ValidationError;
use crate::model::workspace::{NewWorkspace, Workspace, WorkspaceFilter, WorkspacePatch};
use crate::model::{DocumentId, Timestamp};

pub type WorkspaceRepository<'s> = Repository<'s, Workspace>;

impl Document for Workspace {
    const COLLECTION: &'static str = "workspaces";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    type Input = NewWorkspace;
    type Patch = WorkspacePatch;
    type Filter = WorkspaceFilter;

    fn assemble(id: DocumentId, input: NewWorkspace, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            slug: input.slug,
            description: input.description,
            creator: input.creator,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Workspace::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("creator", &mut self.creator)
    }
}

impl DocumentPatch for WorkspacePatch {
    fn validate(&self) -> Result<(), ValidationError> {
        WorkspacePatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit_opt("creator", &mut self.creator)
    }
}

impl QueryFilter for WorkspaceFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("name", self.name.as_deref())
            .eq_opt("slug", self.slug.as_deref())
            .eq_opt("creator", self.creator)
            .include_deleted(self.include_deleted)
    }
}

impl WorkspaceRepository<'_> {
    pub fn get_by_slug(&self, slug: &str) -> RepoResult<Workspace> {
        let filter = WorkspaceFilter {
            slug: Some(slug.to_string()),
            ..WorkspaceFilter::default()
        };
        let not_found = || {
            RepoError::not_found(
                Workspace::COLLECTION,
                "get_by_slug",
                LookupKey::Filter(filter.to_filter().to_string()),
            )
        };
        match self.query(&filter, 0, 1) {
            Ok(mut page) => page.results.pop().ok_or_else(not_found),
            Err(err) if err.is_not_found() => Err(not_found()),
            Err(err) => Err(err),
        }
    }
}
