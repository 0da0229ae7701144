//! Project repository.
//!
//! # Responsibility
//! - Wire projects into the generic repository.
//! - Maintain the ordered `states` list without a read-modify-write race
//!   against concurrent writers on the same connection.
//!
//! # Invariants
//! - `add_states` / `remove_states` run inside one transaction and bump
//!   `updatedAt` exactly like a regular update.
//! - Added state ids must resolve to live states.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::{RepoError, RepoResult};
use super::relations::ReferenceCheck;
use super::repository::Repository;
use crate::db::{now_epoch_ms, Filter};
use crate::model::project::{NewProject, Project, ProjectFilter, ProjectPatch};
use crate::model::reference::Ref;
use crate::model::state::State;
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};
use log::info;
use serde_json::Value;

pub type ProjectRepository<'s> = Repository<'s, Project>;

const OP_ADD_STATES: &str = "add_states";
const OP_REMOVE_STATES: &str = "remove_states";

impl Document for Project {
    const COLLECTION: &'static str = "projects";
    const DELETE_MODE: DeleteMode = DeleteMode::Soft;

    type Input = NewProject;
    type Patch = ProjectPatch;
    type Filter = ProjectFilter;

    fn assemble(id: DocumentId, input: NewProject, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            workspace: input.workspace,
            owner: input.owner,
            members: input.members,
            states: input.states,
            files: input.files,
            tags: input.tags,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Project::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit("workspace", &mut self.workspace)?;
        visitor.visit("owner", &mut self.owner)?;
        visitor.visit_many("members", &mut self.members)?;
        visitor.visit_many("states", &mut self.states)?;
        visitor.visit_many("files", &mut self.files)
    }
}

impl DocumentPatch for ProjectPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        ProjectPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, visitor: &mut V) -> RepoResult<()> {
        visitor.visit_opt("owner", &mut self.owner)?;
        if let Some(members) = &mut self.members {
            visitor.visit_many("members", members)?;
        }
        if let Some(states) = &mut self.states {
            visitor.visit_many("states", states)?;
        }
        if let Some(files) = &mut self.files {
            visitor.visit_many("files", files)?;
        }
        Ok(())
    }
}

impl QueryFilter for ProjectFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("name", self.name.as_deref())
            .eq_opt("workspace", self.workspace)
            .eq_opt("owner", self.owner)
            .contains_opt("members", self.member)
            .contains_opt("tags", self.tag.as_deref())
            .include_deleted(self.include_deleted)
    }
}

impl ProjectRepository<'_> {
    /// Appends states to the project, skipping ids already present.
    pub fn add_states(&self, id: DocumentId, states: &[DocumentId]) -> RepoResult<Project> {
        self.instrument(OP_ADD_STATES, || {
            let mut references: Vec<Ref<State>> = states.iter().copied().map(Ref::Id).collect();
            ReferenceCheck::new(self.store(), Project::COLLECTION, OP_ADD_STATES)
                .visit_many("states", &mut references)?;

            self.edit_states(id, OP_ADD_STATES, |current| {
                for state in states {
                    let value = Value::String(state.to_string());
                    if !current.contains(&value) {
                        current.push(value);
                    }
                }
            })
        })
    }

    /// Removes states from the project. Unknown ids are ignored.
    pub fn remove_states(&self, id: DocumentId, states: &[DocumentId]) -> RepoResult<Project> {
        self.instrument(OP_REMOVE_STATES, || {
            self.edit_states(id, OP_REMOVE_STATES, |current| {
                current.retain(|value| {
                    !states
                        .iter()
                        .any(|state| value.as_str() == Some(state.to_string().as_str()))
                });
            })
        })
    }

    fn edit_states(
        &self,
        id: DocumentId,
        operation: &'static str,
        edit: impl FnOnce(&mut Vec<Value>),
    ) -> RepoResult<Project> {
        let store = self.store();
        let db_error = |err: crate::db::DbError| RepoError::database(Project::COLLECTION, operation, err);

        let tx = store.transaction().map_err(db_error)?;

        let Some(mut raw) = store
            .find_one(Project::COLLECTION, id)
            .map_err(db_error)?
        else {
            return Err(RepoError::invalid_argument(
                Project::COLLECTION,
                operation,
                "id",
                id,
                "no document matched the identifier",
            ));
        };

        let mut current = match raw.body.remove("states") {
            Some(Value::Array(values)) => values,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(RepoError::unexpected(
                    Project::COLLECTION,
                    operation,
                    format!("stored `states` is not an array: {other}"),
                ))
            }
        };
        edit(&mut current);
        let count = current.len();
        raw.body.insert("states".to_string(), Value::Array(current));

        store
            .replace_body(Project::COLLECTION, id, &raw.body, now_epoch_ms())
            .map_err(db_error)?;
        tx.commit().map_err(|err| db_error(err.into()))?;

        info!(
            "event=project_states module=repo status=ok operation={operation} id={id} states={count}"
        );
        self.reload(id, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::ProjectRepository;
    use crate::db::{open_db_in_memory, DocumentStore};
    use crate::model::project::NewProject;
    use crate::model::state::{AspectRatio, NewState};
    use crate::model::user::NewUser;
    use crate::model::workspace::NewWorkspace;
    use crate::repo::error::ErrorKind;
    use crate::repo::{StateRepository, UserRepository, WorkspaceRepository};
    use serde_json::Map;
    use uuid::Uuid;

    #[test]
    fn add_and_remove_states_keep_an_ordered_set() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();

        let owner = UserRepository::new(store)
            .create(NewUser::new("Ada", "ada@example.com"))
            .unwrap();
        let workspace = WorkspaceRepository::new(store)
            .create(NewWorkspace {
                name: "Analytics".to_string(),
                slug: "analytics".to_string(),
                description: None,
                creator: owner.id.into(),
            })
            .unwrap();
        let projects = ProjectRepository::new(store).without_population();
        let project = projects
            .create(NewProject::new("Churn", workspace.id, owner.id))
            .unwrap();

        let states = StateRepository::new(store);
        let mut state_ids = Vec::new();
        for name in ["baseline", "q3"] {
            let state = states
                .create(NewState {
                    name: name.to_string(),
                    description: None,
                    project: project.id.into(),
                    created_by: owner.id.into(),
                    aspect_ratio: AspectRatio {
                        width: 16.0,
                        height: 9.0,
                    },
                    snapshot: Map::new(),
                    image_hash: None,
                })
                .unwrap();
            state_ids.push(state.id);
        }

        let updated = projects
            .add_states(project.id, &[state_ids[0], state_ids[1], state_ids[0]])
            .unwrap();
        assert_eq!(updated.state_ids(), state_ids);
        assert!(updated.updated_at > project.updated_at);

        let updated = projects.remove_states(project.id, &[state_ids[0]]).unwrap();
        assert_eq!(updated.state_ids(), vec![state_ids[1]]);

        let err = projects
            .add_states(project.id, &[Uuid::new_v4()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.operation(), "add_states");
    }

    #[test]
    fn editing_states_of_unknown_projects_is_an_invalid_argument() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();
        let projects = ProjectRepository::new(store);

        let err = projects.add_states(Uuid::new_v4(), &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.operation(), "add_states");

        let err = projects
            .remove_states(Uuid::new_v4(), &[Uuid::new_v4()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.operation(), "remove_states");

        // A failed edit leaves no transaction open behind it.
        assert!(conn.is_autocommit());
    }
}
