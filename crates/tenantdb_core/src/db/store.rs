//! Collection-level document operations over the `documents` table.
//!
//! # Responsibility
//! - Find, count, insert, update and delete JSON documents by collection.
//! - Split documents into body and bookkeeping columns on write, and merge
//!   them back on read.
//!
//! # Invariants
//! - `_id`, `createdAt`, `updatedAt` and `deletedAt` live in columns, never
//!   in the stored body.
//! - The `version` column is internal and never returned to callers.
//! - Every update is a single statement and bumps `updated_at` to at least
//!   one millisecond past its previous value.

use super::filter::Filter;
use super::migrations::{current_user_version, latest_version};
use super::{DbError, DbResult};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Map;
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub const ID_KEY: &str = "_id";
pub const CREATED_AT_KEY: &str = "createdAt";
pub const UPDATED_AT_KEY: &str = "updatedAt";
pub const DELETED_AT_KEY: &str = "deletedAt";

const DOCUMENT_COLUMNS: &str = "id, body, created_at, updated_at, deleted_at";

/// Current wall clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// One stored document split into body and bookkeeping columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: Uuid,
    pub body: Map<String, serde_json::Value>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl RawDocument {
    /// Serializes a typed document and lifts bookkeeping keys into columns.
    pub fn from_document<T: Serialize>(document: &T) -> DbResult<Self> {
        let mut body = match serde_json::to_value(document)? {
            serde_json::Value::Object(body) => body,
            other => {
                return Err(DbError::InvalidData(format!(
                    "document must serialize to an object, got `{other}`"
                )))
            }
        };

        let id = match body.remove(ID_KEY) {
            Some(serde_json::Value::String(text)) => parse_id(&text)?,
            other => {
                return Err(DbError::InvalidData(format!(
                    "document `{ID_KEY}` must be a string, got `{other:?}`"
                )))
            }
        };
        let created_at = take_timestamp(&mut body, CREATED_AT_KEY)?.ok_or_else(|| {
            DbError::InvalidData(format!("document is missing `{CREATED_AT_KEY}`"))
        })?;
        let updated_at = take_timestamp(&mut body, UPDATED_AT_KEY)?.ok_or_else(|| {
            DbError::InvalidData(format!("document is missing `{UPDATED_AT_KEY}`"))
        })?;
        let deleted_at = take_timestamp(&mut body, DELETED_AT_KEY)?;

        Ok(Self {
            id,
            body,
            created_at,
            updated_at,
            deleted_at,
        })
    }

    /// Merges bookkeeping columns back into the body and decodes it.
    pub fn into_document<T: DeserializeOwned>(self) -> DbResult<T> {
        let mut object = self.body;
        object.insert(ID_KEY.to_string(), self.id.to_string().into());
        object.insert(CREATED_AT_KEY.to_string(), self.created_at.into());
        object.insert(UPDATED_AT_KEY.to_string(), self.updated_at.into());
        if let Some(deleted_at) = self.deleted_at {
            object.insert(DELETED_AT_KEY.to_string(), deleted_at.into());
        }
        Ok(serde_json::from_value(serde_json::Value::Object(object))?)
    }
}

/// Borrowed handle over a migrated connection.
///
/// Cheap to copy; every repository receives one at construction.
#[derive(Clone, Copy)]
pub struct DocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DocumentStore<'conn> {
    /// Wraps a connection after checking it carries the current schema.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(DbError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_table: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = 'documents'
            );",
            [],
            |row| row.get(0),
        )?;
        if has_table != 1 {
            return Err(DbError::MissingRequiredTable("documents"));
        }

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Begins an `IMMEDIATE` transaction on the shared connection.
    ///
    /// Dropping the returned guard without `commit` rolls back.
    pub fn transaction(&self) -> DbResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    /// Looks up one live id, projecting only the id column.
    pub fn contains_id(&self, collection: &str, id: Uuid) -> DbResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT id
                 FROM documents
                 WHERE collection = ?1
                   AND id = ?2
                   AND deleted_at IS NULL;",
                params![collection, id.to_string()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Returns which of `ids` exist as live documents, in one lookup.
    pub fn existing_ids(&self, collection: &str, ids: &[Uuid]) -> DbResult<HashSet<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM documents
             WHERE collection = ?1
               AND deleted_at IS NULL
               AND id IN (SELECT value FROM json_each(?2));",
        )?;
        let mut rows = stmt.query(params![collection, ids_as_json(ids)])?;
        let mut found = HashSet::new();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            found.insert(parse_id(&text)?);
        }
        Ok(found)
    }

    pub fn find_one(&self, collection: &str, id: Uuid) -> DbResult<Option<RawDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM documents
             WHERE collection = ?1
               AND id = ?2
               AND deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query(params![collection, id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_document_row(row)?)),
            None => Ok(None),
        }
    }

    /// Loads live documents for `ids`; absent ids are skipped.
    pub fn find_by_ids(&self, collection: &str, ids: &[Uuid]) -> DbResult<Vec<RawDocument>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM documents
             WHERE collection = ?1
               AND deleted_at IS NULL
               AND id IN (SELECT value FROM json_each(?2));"
        ))?;
        let mut rows = stmt.query(params![collection, ids_as_json(ids)])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> DbResult<u64> {
        let (where_sql, binds) = filter.to_sql(collection);
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM documents WHERE {where_sql};"),
            params_from_iter(binds),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Fetches one window ordered by `updated_at DESC, id ASC`.
    pub fn find(
        &self,
        collection: &str,
        filter: &Filter,
        skip: u64,
        limit: u64,
    ) -> DbResult<Vec<RawDocument>> {
        let (where_sql, mut binds) = filter.to_sql(collection);
        binds.push(Value::Integer(to_sql_int(limit)));
        binds.push(Value::Integer(to_sql_int(skip)));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS}
             FROM documents
             WHERE {where_sql}
             ORDER BY updated_at DESC, id ASC
             LIMIT ? OFFSET ?;"
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(row)?);
        }
        Ok(documents)
    }

    /// Inserts one document and returns the identifier the store recorded.
    pub fn insert(&self, collection: &str, document: &RawDocument) -> DbResult<Option<Uuid>> {
        let body = serde_json::Value::Object(document.body.clone()).to_string();
        let stored: Option<String> = self
            .conn
            .query_row(
                "INSERT INTO documents (
                    collection,
                    id,
                    body,
                    created_at,
                    updated_at,
                    deleted_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING id;",
                params![
                    collection,
                    document.id.to_string(),
                    body,
                    document.created_at,
                    document.updated_at,
                    document.deleted_at,
                ],
                |row| row.get(0),
            )
            .optional()?;

        stored.map(|text| parse_id(&text)).transpose()
    }

    /// Replaces top-level body fields of one live document.
    ///
    /// `null` values remove the field. Returns the number of matched rows.
    pub fn update_one(
        &self,
        collection: &str,
        id: Uuid,
        fields: &Map<String, serde_json::Value>,
        now: i64,
    ) -> DbResult<usize> {
        let mut body_sql = String::from("body");
        let mut binds: Vec<Value> = Vec::new();

        let (removed, replaced): (Vec<_>, Vec<_>) =
            fields.iter().partition(|(_, value)| value.is_null());

        if !replaced.is_empty() {
            let pairs = vec!["?, json(?)"; replaced.len()].join(", ");
            body_sql = format!("json_set({body_sql}, {pairs})");
            for (key, value) in &replaced {
                binds.push(Value::Text(field_path(key)));
                binds.push(Value::Text(value.to_string()));
            }
        }
        if !removed.is_empty() {
            let paths = vec!["?"; removed.len()].join(", ");
            body_sql = format!("json_remove({body_sql}, {paths})");
            for (key, _) in &removed {
                binds.push(Value::Text(field_path(key)));
            }
        }

        binds.push(Value::Integer(now));
        binds.push(Value::Text(collection.to_string()));
        binds.push(Value::Text(id.to_string()));

        let changed = self.conn.execute(
            &format!(
                "UPDATE documents
                 SET
                    body = {body_sql},
                    version = version + 1,
                    updated_at = MAX(?, updated_at + 1)
                 WHERE collection = ?
                   AND id = ?
                   AND deleted_at IS NULL;"
            ),
            params_from_iter(binds),
        )?;
        Ok(changed)
    }

    /// Replaces the whole body of one live document.
    pub fn replace_body(
        &self,
        collection: &str,
        id: Uuid,
        body: &Map<String, serde_json::Value>,
        now: i64,
    ) -> DbResult<usize> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                body = ?1,
                version = version + 1,
                updated_at = MAX(?2, updated_at + 1)
             WHERE collection = ?3
               AND id = ?4
               AND deleted_at IS NULL;",
            params![
                serde_json::Value::Object(body.clone()).to_string(),
                now,
                collection,
                id.to_string()
            ],
        )?;
        Ok(changed)
    }

    /// Sets `deleted_at` on one live document.
    pub fn mark_deleted(&self, collection: &str, id: Uuid, now: i64) -> DbResult<usize> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET
                deleted_at = ?1,
                version = version + 1,
                updated_at = MAX(?1, updated_at + 1)
             WHERE collection = ?2
               AND id = ?3
               AND deleted_at IS NULL;",
            params![now, collection, id.to_string()],
        )?;
        Ok(changed)
    }

    /// Physically removes one document.
    pub fn delete_one(&self, collection: &str, id: Uuid) -> DbResult<usize> {
        let changed = self.conn.execute(
            "DELETE FROM documents
             WHERE collection = ?1
               AND id = ?2;",
            params![collection, id.to_string()],
        )?;
        Ok(changed)
    }
}

fn parse_document_row(row: &Row<'_>) -> DbResult<RawDocument> {
    let id_text: String = row.get("id")?;
    let body_text: String = row.get("body")?;
    let body = match serde_json::from_str(&body_text)? {
        serde_json::Value::Object(body) => body,
        _ => {
            return Err(DbError::InvalidData(format!(
                "document `{id_text}` body is not an object"
            )))
        }
    };

    Ok(RawDocument {
        id: parse_id(&id_text)?,
        body,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}

fn parse_id(value: &str) -> DbResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| DbError::InvalidData(format!("invalid document id `{value}`")))
}

fn take_timestamp(
    body: &mut Map<String, serde_json::Value>,
    key: &str,
) -> DbResult<Option<i64>> {
    match body.remove(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            DbError::InvalidData(format!("`{key}` must be epoch milliseconds, got `{value}`"))
        }),
    }
}

fn ids_as_json(ids: &[Uuid]) -> String {
    serde_json::Value::Array(
        ids.iter()
            .map(|id| serde_json::Value::String(id.to_string()))
            .collect(),
    )
    .to_string()
}

fn field_path(key: &str) -> String {
    format!("$.\"{key}\"")
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{DocumentStore, RawDocument};
    use crate::db::{open_db_in_memory, Filter};
    use serde_json::json;
    use uuid::Uuid;

    fn raw(id: Uuid, body: serde_json::Value, at: i64) -> RawDocument {
        RawDocument {
            id,
            body: body.as_object().cloned().unwrap(),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn from_document_moves_bookkeeping_into_columns() {
        let id = Uuid::new_v4();
        let doc = json!({
            "_id": id.to_string(),
            "name": "a",
            "createdAt": 10,
            "updatedAt": 11
        });
        let raw = RawDocument::from_document(&doc).unwrap();
        assert_eq!(raw.id, id);
        assert_eq!(raw.created_at, 10);
        assert_eq!(raw.updated_at, 11);
        assert_eq!(raw.deleted_at, None);
        assert_eq!(raw.body.len(), 1);
        assert_eq!(raw.body["name"], "a");
    }

    #[test]
    fn update_one_sets_and_removes_fields() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();
        let id = Uuid::new_v4();
        store
            .insert("things", &raw(id, json!({"name": "a", "note": "x"}), 100))
            .unwrap();

        let fields = json!({"name": "b", "note": null, "tags": ["t"]});
        let changed = store
            .update_one("things", id, fields.as_object().unwrap(), 50)
            .unwrap();
        assert_eq!(changed, 1);

        let stored = store.find_one("things", id).unwrap().unwrap();
        assert_eq!(stored.body["name"], "b");
        assert_eq!(stored.body["tags"], json!(["t"]));
        assert!(!stored.body.contains_key("note"));
        assert_eq!(stored.updated_at, 101);
    }

    #[test]
    fn soft_deleted_rows_are_hidden_from_lookups() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();
        let id = Uuid::new_v4();
        store.insert("things", &raw(id, json!({}), 1)).unwrap();

        assert_eq!(store.mark_deleted("things", id, 2).unwrap(), 1);
        assert_eq!(store.mark_deleted("things", id, 3).unwrap(), 0);
        assert!(!store.contains_id("things", id).unwrap());
        assert!(store.find_one("things", id).unwrap().is_none());
        assert_eq!(store.count("things", &Filter::new()).unwrap(), 0);
        assert_eq!(
            store
                .count("things", &Filter::new().include_deleted(true))
                .unwrap(),
            1
        );
    }

    #[test]
    fn collections_are_isolated() {
        let conn = open_db_in_memory().unwrap();
        let store = DocumentStore::try_new(&conn).unwrap();
        let id = Uuid::new_v4();
        store.insert("left", &raw(id, json!({}), 1)).unwrap();

        assert!(store.contains_id("left", id).unwrap());
        assert!(!store.contains_id("right", id).unwrap());
        assert!(store.existing_ids("right", &[id]).unwrap().is_empty());
    }
}
