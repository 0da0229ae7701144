use serde_json::json;
use tenantdb_core::db::{open_db_in_memory, DocumentStore};
use tenantdb_core::model::member::{InvitationStatus, MemberPatch, MemberRole, NewMember};
use tenantdb_core::model::project::{NewProject, Project, ProjectPatch};
use tenantdb_core::model::state::{AspectRatio, NewState, State};
use tenantdb_core::model::threshold::{NewThreshold, ThresholdPatch};
use tenantdb_core::model::user::{NewUser, User};
use tenantdb_core::model::workspace::{NewWorkspace, Workspace};
use tenantdb_core::{
    ErrorKind, MemberRepository, ProjectRepository, Ref, RepoError, StateRepository,
    ThresholdRepository, UserRepository, WorkspaceRepository,
};
use uuid::Uuid;

fn seed(store: DocumentStore<'_>) -> (User, Workspace) {
    let user = UserRepository::new(store)
        .create(NewUser::new("Ada", "ada@example.com"))
        .unwrap();
    let workspace = WorkspaceRepository::new(store)
        .create(NewWorkspace {
            name: "Analytics".to_string(),
            slug: "analytics".to_string(),
            description: None,
            creator: Ref::Id(user.id),
        })
        .unwrap();
    (user, workspace)
}

fn seed_project(store: DocumentStore<'_>, user: &User, workspace: &Workspace, name: &str) -> Project {
    ProjectRepository::new(store)
        .without_population()
        .create(NewProject::new(name, workspace.id, user.id))
        .unwrap()
}

fn seed_state(store: DocumentStore<'_>, user: &User, project: &Project, name: &str) -> State {
    StateRepository::new(store)
        .without_population()
        .create(NewState {
            name: name.to_string(),
            description: None,
            project: Ref::Id(project.id),
            created_by: Ref::Id(user.id),
            aspect_ratio: AspectRatio {
                width: 16.0,
                height: 9.0,
            },
            snapshot: serde_json::Map::new(),
            image_hash: None,
        })
        .unwrap()
}

fn revenue_threshold(project: &Project, state: Option<&State>) -> NewThreshold {
    NewThreshold {
        name: "Revenue band".to_string(),
        project: Ref::Id(project.id),
        state: state.map(|state| Ref::Id(state.id)),
        column: "revenue".to_string(),
        min: 10.0,
        max: 20.0,
        color: None,
    }
}

#[test]
fn create_rejects_dangling_references() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let workspaces = WorkspaceRepository::new(store);

    let missing = Uuid::new_v4();
    let err = workspaces
        .create(NewWorkspace {
            name: "Ghost".to_string(),
            slug: "ghost".to_string(),
            description: None,
            creator: Ref::Id(missing),
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    match err {
        RepoError::InvalidOperation { field, value, .. } => {
            assert_eq!(field, "creator");
            assert_eq!(value, missing.to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents WHERE collection = 'workspaces';", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn get_by_id_populates_references_one_level_deep() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    let projects = ProjectRepository::new(store);
    let project = projects
        .create(NewProject::new("Churn", workspace.id, user.id))
        .unwrap();

    let owner = project.owner.as_doc().expect("owner is populated");
    assert_eq!(owner.email, "ada@example.com");

    let embedded_workspace = project.workspace.as_doc().expect("workspace is populated");
    assert_eq!(embedded_workspace.slug, "analytics");
    // Second level stays a bare id.
    assert_eq!(embedded_workspace.creator, Ref::Id(user.id));

    let raw = projects.without_population().get_by_id(project.id).unwrap();
    assert_eq!(raw.owner, Ref::Id(user.id));
    assert_eq!(raw.workspace, Ref::Id(workspace.id));
}

#[test]
fn populated_documents_are_stored_as_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    // Feed a populated workspace back into a write.
    let populated = WorkspaceRepository::new(store).get_by_id(workspace.id).unwrap();
    assert!(populated.creator.is_populated());
    let projects = ProjectRepository::new(store);
    let mut payload = NewProject::new("Churn", workspace.id, user.id);
    payload.workspace = Ref::Doc(Box::new(populated));
    let project = projects.create(payload).unwrap();

    let body: String = conn
        .query_row(
            "SELECT body FROM documents WHERE collection = 'projects' AND id = ?1;",
            [project.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    let body: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["workspace"], json!(workspace.id.to_string()));
    assert_eq!(body["owner"], json!(user.id.to_string()));
}

#[test]
fn update_checks_every_reference_in_a_list() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    let members = MemberRepository::new(store);
    let member = members
        .create(NewMember {
            email: "grace@example.com".to_string(),
            inviter: "Ada".to_string(),
            workspace: Ref::Id(workspace.id),
            member: None,
            role: MemberRole::Member,
            status: InvitationStatus::Pending,
            joined_at: None,
        })
        .unwrap();

    let projects = ProjectRepository::new(store).without_population();
    let project = projects
        .create(NewProject::new("Churn", workspace.id, user.id))
        .unwrap();

    let missing = Uuid::new_v4();
    let mut patch = ProjectPatch {
        members: Some(vec![Ref::Id(member.id), Ref::Id(missing)]),
        ..ProjectPatch::default()
    };
    let err = projects.validate_update_object(&mut patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(err.to_string().contains(&missing.to_string()));
    assert!(!err.to_string().contains(&member.id.to_string()));

    let err = projects.update_by_id(project.id, patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);

    let updated = projects
        .update_by_id_json(project.id, json!({"members": [member.id]}))
        .unwrap();
    assert_eq!(updated.members, vec![Ref::Id(member.id)]);
}

#[test]
fn soft_deleted_targets_no_longer_satisfy_references() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    WorkspaceRepository::new(store)
        .delete_by_id(workspace.id)
        .unwrap();

    let err = ProjectRepository::new(store)
        .create(NewProject::new("Churn", workspace.id, user.id))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn references_to_deleted_documents_stay_as_ids_on_read() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    let project = ProjectRepository::new(store)
        .create(NewProject::new("Churn", workspace.id, user.id))
        .unwrap();
    let thresholds = ThresholdRepository::new(store);
    let threshold = thresholds
        .create(NewThreshold {
            name: "Revenue floor".to_string(),
            project: Ref::Id(project.id),
            state: None,
            column: "revenue".to_string(),
            min: 0.0,
            max: 1_000.0,
            color: Some("#ff0000".to_string()),
        })
        .unwrap();
    assert!(threshold.project.is_populated());

    ProjectRepository::new(store).delete_by_id(project.id).unwrap();
    let reloaded = thresholds.get_by_id(threshold.id).unwrap();
    assert_eq!(reloaded.project, Ref::Id(project.id));

    // Clearing an optional reference skips the check entirely.
    let cleared = thresholds
        .update_by_id(
            threshold.id,
            ThresholdPatch {
                state: Some(None),
                ..ThresholdPatch::default()
            },
        )
        .unwrap();
    assert_eq!(cleared.state, None);
}

#[test]
fn find_membership_links_users_to_workspaces() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);

    let members = MemberRepository::new(store);
    assert_eq!(members.find_membership(workspace.id, user.id).unwrap(), None);

    let invite = members
        .create(NewMember {
            email: user.email.clone(),
            inviter: "system".to_string(),
            workspace: Ref::Id(workspace.id),
            member: None,
            role: MemberRole::Owner,
            status: InvitationStatus::Pending,
            joined_at: None,
        })
        .unwrap();
    members
        .update_by_id(invite.id, MemberPatch::accept(user.id, 1_700_000_000_000))
        .unwrap();

    let membership = members
        .find_membership(workspace.id, user.id)
        .unwrap()
        .expect("membership exists after accepting");
    assert_eq!(membership.id, invite.id);
    assert_eq!(membership.status, InvitationStatus::Accepted);
    assert_eq!(membership.member.map(|member| member.id()), Some(user.id));
}

#[test]
fn one_sided_bound_changes_keep_min_below_max() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);
    let project = seed_project(store, &user, &workspace, "Churn");

    let thresholds = ThresholdRepository::new(store).without_population();
    let threshold = thresholds
        .create(revenue_threshold(&project, None))
        .unwrap();

    let err = thresholds
        .update_by_id(
            threshold.id,
            ThresholdPatch {
                max: Some(1.0),
                ..ThresholdPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);

    let err = thresholds
        .update_by_id_json(threshold.id, json!({"min": 25.0}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);

    let stored = thresholds.get_by_id(threshold.id).unwrap();
    assert_eq!((stored.min, stored.max), (10.0, 20.0));
    assert!(conn.is_autocommit());

    let narrowed = thresholds
        .update_by_id(
            threshold.id,
            ThresholdPatch {
                max: Some(15.0),
                ..ThresholdPatch::default()
            },
        )
        .unwrap();
    assert_eq!((narrowed.min, narrowed.max), (10.0, 15.0));
}

#[test]
fn threshold_state_must_belong_to_the_threshold_project() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let (user, workspace) = seed(store);
    let churn = seed_project(store, &user, &workspace, "Churn");
    let growth = seed_project(store, &user, &workspace, "Growth");
    let churn_baseline = seed_state(store, &user, &churn, "baseline");
    let growth_baseline = seed_state(store, &user, &growth, "baseline");

    let thresholds = ThresholdRepository::new(store).without_population();
    let err = thresholds
        .create(revenue_threshold(&churn, Some(&growth_baseline)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    match err {
        RepoError::InvalidOperation { field, value, .. } => {
            assert_eq!(field, "state");
            assert_eq!(value, growth_baseline.id.to_string());
        }
        other => panic!("unexpected error: {other}"),
    }

    let threshold = thresholds
        .create(revenue_threshold(&churn, Some(&churn_baseline)))
        .unwrap();
    assert_eq!(threshold.state, Some(Ref::Id(churn_baseline.id)));

    let err = thresholds
        .update_by_id(
            threshold.id,
            ThresholdPatch {
                state: Some(Some(Ref::Id(growth_baseline.id))),
                ..ThresholdPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(
        thresholds.get_by_id(threshold.id).unwrap().state,
        Some(Ref::Id(churn_baseline.id))
    );
}
