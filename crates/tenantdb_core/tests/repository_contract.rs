use serde_json::json;
use std::error::Error;
use tenantdb_core::db::{now_epoch_ms, open_db_in_memory, DocumentStore};
use tenantdb_core::model::file_stats::{ColumnInfo, FileStatsPatch, NewFileStats};
use tenantdb_core::model::user::{NewUser, UserFilter, UserPatch};
use tenantdb_core::{ErrorKind, FileStatsRepository, LookupKey, RepoError, UserRepository};
use uuid::Uuid;

fn sales_file() -> NewFileStats {
    NewFileStats {
        file_name: "sales.csv".to_string(),
        table_name: "sales_2024".to_string(),
        file_size: 2_048,
        num_rows: 120,
        num_columns: 2,
        columns: vec![
            ColumnInfo {
                name: "region".to_string(),
                data_type: "VARCHAR".to_string(),
            },
            ColumnInfo {
                name: "revenue".to_string(),
                data_type: "DOUBLE".to_string(),
            },
        ],
    }
}

#[test]
fn id_exists_is_true_right_after_create_and_false_for_unknown_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let created = files.create(sales_file()).unwrap();
    assert!(files.id_exists(created.id).unwrap());
    assert!(!files.id_exists(Uuid::new_v4()).unwrap());
}

#[test]
fn create_then_get_round_trips_scalar_fields_with_equal_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let before = now_epoch_ms();
    let created = files.create(sales_file()).unwrap();
    let after = now_epoch_ms();

    let loaded = files.get_by_id(created.id).unwrap();
    let payload = sales_file();
    assert_eq!(loaded.file_name, payload.file_name);
    assert_eq!(loaded.table_name, payload.table_name);
    assert_eq!(loaded.file_size, payload.file_size);
    assert_eq!(loaded.num_rows, payload.num_rows);
    assert_eq!(loaded.columns, payload.columns);
    assert_eq!(loaded.created_at, loaded.updated_at);
    assert!(before <= loaded.created_at && loaded.created_at <= after);
}

#[test]
fn consecutive_reads_are_identical() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let created = files.create(sales_file()).unwrap();
    assert_eq!(
        files.get_by_id(created.id).unwrap(),
        files.get_by_id(created.id).unwrap()
    );
}

#[test]
fn all_ids_exist_reports_only_the_missing_ids() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let present = files.create(sales_file()).unwrap().id;
    let missing = Uuid::new_v4();

    assert!(files.all_ids_exist(&[present]).unwrap());
    assert!(files.all_ids_exist(&[]).unwrap());

    let err = files
        .all_ids_exist(&[present, missing, missing])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataNotFound);
    assert_eq!(err.missing_ids(), Some([missing].as_slice()));
    match err {
        RepoError::DataNotFound { key, .. } => assert_eq!(key, LookupKey::Ids(vec![missing])),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_replaces_fields_and_strictly_increases_updated_at() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);

    let created = users.create(NewUser::new("a", "a@example.com")).unwrap();
    let updated = users
        .update_by_id(
            created.id,
            UserPatch {
                name: Some("b".to_string()),
                ..UserPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "b");
    let loaded = users.get_by_id(created.id).unwrap();
    assert_eq!(loaded.name, "b");
    assert_eq!(loaded.email, "a@example.com");
    assert!(loaded.updated_at > created.updated_at);
    assert_eq!(loaded.created_at, created.created_at);

    // Back-to-back updates within one millisecond still move forward.
    let first = users.update_by_id_json(created.id, json!({"name": "c"})).unwrap();
    let second = users.update_by_id_json(created.id, json!({"name": "d"})).unwrap();
    assert!(second.updated_at > first.updated_at);
}

#[test]
fn update_with_null_clears_optional_fields() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);

    let mut payload = NewUser::new("Ada", "ada@example.com");
    payload.image = Some("https://example.com/ada.png".to_string());
    let created = users.create(payload).unwrap();

    let updated = users
        .update_by_id_json(created.id, json!({"image": null}))
        .unwrap();
    assert_eq!(updated.image, None);
    assert_eq!(updated.name, "Ada");
}

#[test]
fn reserved_keys_are_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);
    let created = users.create(NewUser::new("a", "a@example.com")).unwrap();

    for key in ["_id", "createdAt", "updatedAt", "deletedAt"] {
        let mut payload = json!({"name": "changed"});
        payload[key] = json!(1);
        let err = users.update_by_id_json(created.id, payload).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation, "key {key}");
    }

    assert_eq!(users.get_by_id(created.id).unwrap(), created);
}

#[test]
fn unknown_update_fields_are_invalid_arguments() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);
    let created = users.create(NewUser::new("a", "a@example.com")).unwrap();

    let err = users
        .update_by_id_json(created.id, json!({"nickname": "x"}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = users.update_by_id_json(created.id, json!(["name"])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn schema_violations_fail_as_data_validation() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);
    let files = FileStatsRepository::new(store);

    let err = users.create(NewUser::new("  ", "a@example.com")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);
    assert_eq!(err.operation(), "create");

    let created = files.create(sales_file()).unwrap();
    let mut patch = FileStatsPatch {
        table_name: Some("Not A Table".to_string()),
        ..FileStatsPatch::default()
    };
    let err = files.validate_update_object(&mut patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);

    let err = files.update_by_id(created.id, patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);
    assert_eq!(files.get_by_id(created.id).unwrap(), created);
}

#[test]
fn updating_or_deleting_unknown_ids_is_an_invalid_argument() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let err = files
        .update_by_id(Uuid::new_v4(), FileStatsPatch::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = files.delete_by_id(Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn hard_delete_removes_the_document() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);

    let created = files.create(sales_file()).unwrap();
    files.delete_by_id(created.id).unwrap();

    let err = files.get_by_id(created.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataNotFound);
    assert!(!files.id_exists(created.id).unwrap());

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
}

#[test]
fn soft_delete_hides_the_document_but_keeps_the_row() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);

    let created = users.create(NewUser::new("Ada", "ada@example.com")).unwrap();
    users.delete_by_id(created.id).unwrap();

    assert!(!users.id_exists(created.id).unwrap());
    assert_eq!(
        users.get_by_id(created.id).unwrap_err().kind(),
        ErrorKind::DataNotFound
    );
    assert_eq!(
        users.query(&UserFilter::default(), 0, 10).unwrap_err().kind(),
        ErrorKind::DataNotFound
    );

    let with_deleted = UserFilter {
        include_deleted: true,
        ..UserFilter::default()
    };
    let page = users.query(&with_deleted, 0, 10).unwrap();
    assert_eq!(page.number_of_items, 1);
    assert!(page.results[0].deleted_at.is_some());

    // A second delete finds nothing live to remove.
    assert_eq!(
        users.delete_by_id(created.id).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        users
            .update_by_id_json(created.id, json!({"name": "Grace"}))
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidArgument
    );
}

#[test]
fn one_sided_patches_are_checked_against_the_stored_document() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let files = FileStatsRepository::new(store);
    let created = files.create(sales_file()).unwrap();

    let err = files
        .update_by_id_json(created.id, json!({"numColumns": 3}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);
    assert_eq!(err.operation(), "update_by_id");

    let err = files
        .update_by_id(
            created.id,
            FileStatsPatch {
                columns: Some(vec![ColumnInfo {
                    name: "region".to_string(),
                    data_type: "VARCHAR".to_string(),
                }]),
                ..FileStatsPatch::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataValidation);

    assert_eq!(files.get_by_id(created.id).unwrap(), created);
    assert!(conn.is_autocommit());

    let updated = files
        .update_by_id_json(created.id, json!({"numRows": 240}))
        .unwrap();
    assert_eq!(updated.num_rows, 240);
}

#[test]
fn store_failures_are_wrapped_with_store_and_operation_names() {
    let conn = open_db_in_memory().unwrap();
    let store = DocumentStore::try_new(&conn).unwrap();
    let users = UserRepository::new(store);
    let created = users.create(NewUser::new("Ada", "ada@example.com")).unwrap();

    conn.execute(
        "UPDATE documents SET body = '{\"name\": 5}' WHERE id = ?1;",
        [created.id.to_string()],
    )
    .unwrap();

    let err = users.get_by_id(created.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatabaseOperation);
    assert!(
        err.to_string().starts_with("sqlite users.get_by_id failed"),
        "{err}"
    );
    assert!(err.source().is_some());

    let err = users.query(&UserFilter::default(), 0, 10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatabaseOperation);
    assert!(err.to_string().starts_with("sqlite users.query failed"), "{err}");
    assert!(err.source().is_some());

    let err = users
        .update_by_id_json(created.id, json!({"name": "Grace"}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatabaseOperation);
    assert_eq!(err.operation(), "update_by_id");
}
