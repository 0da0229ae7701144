//! Generic validated document repository.
//!
//! # Responsibility
//! - Implement the shared entity contract once: existence checks, create,
//!   get-by-id, paginated query, partial update and delete.
//! - Classify every failure into the repository error taxonomy.
//!
//! # Invariants
//! - `_id`, `createdAt`, `updatedAt` and `deletedAt` never reach a write
//!   through an update payload.
//! - Validation (fields, then references) completes before any write.
//! - Updates validate the stored document merged with the patch, inside the
//!   same transaction as the write.
//! - Writes are re-read from the store so callers see stored state.
//! - Existence checks return `false` for absence; direct reads raise
//!   `DataNotFound`.

use super::document::{Collapse, DeleteMode, Document, DocumentPatch, QueryFilter};
use super::error::{LookupKey, RepoError, RepoResult};
use super::relations::{Populator, ReferenceCheck};
use crate::db::store::{CREATED_AT_KEY, DELETED_AT_KEY, ID_KEY, UPDATED_AT_KEY};
use crate::db::{now_epoch_ms, DbError, DocumentStore, RawDocument};
use crate::model::DocumentId;
use log::{debug, info};
use serde::Serialize;
use serde_json::Map;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::time::Instant;
use uuid::Uuid;

/// Default page size for `query`.
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

const OP_ID_EXISTS: &str = "id_exists";
const OP_ALL_IDS_EXIST: &str = "all_ids_exist";
const OP_VALIDATE_UPDATE: &str = "validate_update_object";
const OP_CREATE: &str = "create";
const OP_GET_BY_ID: &str = "get_by_id";
const OP_QUERY: &str = "query";
const OP_UPDATE_BY_ID: &str = "update_by_id";
const OP_DELETE_BY_ID: &str = "delete_by_id";

/// Keys an update payload may never carry, with the reason why.
const RESERVED_UPDATE_KEYS: &[(&str, &str)] = &[
    (ID_KEY, "document id is immutable"),
    ("id", "document id is immutable"),
    (CREATED_AT_KEY, "creation timestamp is immutable"),
    (UPDATED_AT_KEY, "update timestamp is managed internally"),
    (DELETED_AT_KEY, "deletion marker is managed by delete"),
];

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    /// Total documents matching the filter, across all pages.
    pub number_of_items: u64,
    pub page: u32,
    pub items_per_page: u32,
}

/// Repository for one document type over a shared store handle.
pub struct Repository<'s, T> {
    store: DocumentStore<'s>,
    populate: bool,
    _document: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Repository<'_, T> {}

impl<'s, T: Document> Repository<'s, T> {
    /// Creates a repository that populates references on read.
    pub fn new(store: DocumentStore<'s>) -> Self {
        Self {
            store,
            populate: true,
            _document: PhantomData,
        }
    }

    /// Returns a copy that leaves references as bare ids on read.
    pub fn without_population(mut self) -> Self {
        self.populate = false;
        self
    }

    pub fn store(&self) -> DocumentStore<'s> {
        self.store
    }

    /// Returns whether a live document with `id` exists.
    pub fn id_exists(&self, id: DocumentId) -> RepoResult<bool> {
        self.store
            .contains_id(T::COLLECTION, id)
            .map_err(|err| self.db_error(OP_ID_EXISTS, err))
    }

    /// Returns `true` when every id exists; otherwise raises `DataNotFound`
    /// listing all missing ids in request order.
    pub fn all_ids_exist(&self, ids: &[DocumentId]) -> RepoResult<bool> {
        if ids.is_empty() {
            return Ok(true);
        }

        let found = self
            .store
            .existing_ids(T::COLLECTION, ids)
            .map_err(|err| self.db_error(OP_ALL_IDS_EXIST, err))?;

        let mut reported = HashSet::new();
        let missing: Vec<DocumentId> = ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id) && reported.insert(*id))
            .collect();

        if missing.is_empty() {
            Ok(true)
        } else {
            Err(RepoError::not_found(
                T::COLLECTION,
                OP_ALL_IDS_EXIST,
                LookupKey::Ids(missing),
            ))
        }
    }

    /// Checks a partial update before any write is attempted.
    ///
    /// Reserved keys fail with `InvalidOperation`, field rules with
    /// `DataValidation`, dangling references with `InvalidOperation`.
    pub fn validate_update_object(&self, patch: &mut T::Patch) -> RepoResult<()> {
        self.instrument(OP_VALIDATE_UPDATE, || self.check_patch(patch))
    }

    fn check_patch(&self, patch: &mut T::Patch) -> RepoResult<()> {
        let fields = self.patch_fields(patch, OP_VALIDATE_UPDATE)?;
        reject_reserved_keys::<T>(&fields)?;
        patch
            .validate()
            .map_err(|err| RepoError::validation(T::COLLECTION, OP_VALIDATE_UPDATE, err))?;
        patch.visit_refs(&mut ReferenceCheck::new(
            self.store,
            T::COLLECTION,
            OP_VALIDATE_UPDATE,
        ))
    }

    /// Validates and persists a new document, then returns it as stored.
    pub fn create(&self, input: T::Input) -> RepoResult<T> {
        self.instrument(OP_CREATE, || {
            let now = now_epoch_ms();
            let mut document = T::assemble(Uuid::new_v4(), input, now);
            document
                .validate()
                .map_err(|err| RepoError::validation(T::COLLECTION, OP_CREATE, err))?;
            document.visit_refs(&mut ReferenceCheck::new(self.store, T::COLLECTION, OP_CREATE))?;
            document.visit_refs(&mut Collapse)?;
            document.check_relations(self.store, OP_CREATE)?;

            let raw = RawDocument::from_document(&document)
                .map_err(|err| self.db_error(OP_CREATE, err))?;
            let stored_id = self
                .store
                .insert(T::COLLECTION, &raw)
                .map_err(|err| self.db_error(OP_CREATE, err))?;
            let Some(id) = stored_id else {
                return Err(RepoError::unexpected(
                    T::COLLECTION,
                    OP_CREATE,
                    "insert succeeded without returning an identifier",
                ));
            };

            info!(
                "event=doc_create module=repo status=ok collection={} id={id}",
                T::COLLECTION
            );
            self.reload(id, OP_CREATE)
        })
    }

    /// Reads one live document, populating references when enabled.
    pub fn get_by_id(&self, id: DocumentId) -> RepoResult<T> {
        self.instrument(OP_GET_BY_ID, || self.reload(id, OP_GET_BY_ID))
    }

    /// Returns one page of documents matching `filter`.
    ///
    /// Results are ordered by `updatedAt` descending, then id.
    pub fn query(
        &self,
        filter: &T::Filter,
        page: u32,
        items_per_page: u32,
    ) -> RepoResult<Page<T>> {
        self.instrument(OP_QUERY, || {
            if items_per_page == 0 {
                return Err(RepoError::invalid_argument(
                    T::COLLECTION,
                    OP_QUERY,
                    "items_per_page",
                    items_per_page,
                    "page size must be at least 1",
                ));
            }

            let filter = filter.to_filter();
            let count = self
                .store
                .count(T::COLLECTION, &filter)
                .map_err(|err| self.db_error(OP_QUERY, err))?;
            if count == 0 {
                return Err(RepoError::not_found(
                    T::COLLECTION,
                    OP_QUERY,
                    LookupKey::Filter(filter.to_string()),
                ));
            }

            let skip = u64::from(items_per_page) * u64::from(page);
            if skip > count {
                let last_page = count / u64::from(items_per_page);
                return Err(RepoError::invalid_argument(
                    T::COLLECTION,
                    OP_QUERY,
                    "page",
                    page,
                    format!("page is out of range; the last page is {last_page}"),
                ));
            }

            let raws = self
                .store
                .find(T::COLLECTION, &filter, skip, u64::from(items_per_page))
                .map_err(|err| self.db_error(OP_QUERY, err))?;
            let mut results = Vec::with_capacity(raws.len());
            for raw in raws {
                results.push(self.materialize(raw, OP_QUERY)?);
            }

            Ok(Page {
                results,
                number_of_items: count,
                page,
                items_per_page,
            })
        })
    }

    /// Applies a validated partial update and returns the stored document.
    ///
    /// The patch is merged into the stored document and the result must pass
    /// the same rules as `create` before the write commits.
    pub fn update_by_id(&self, id: DocumentId, mut patch: T::Patch) -> RepoResult<T> {
        self.instrument(OP_UPDATE_BY_ID, || {
            self.check_patch(&mut patch)?;
            patch.visit_refs(&mut Collapse)?;
            let fields = self.patch_fields(&patch, OP_UPDATE_BY_ID)?;

            let tx = self
                .store
                .transaction()
                .map_err(|err| self.db_error(OP_UPDATE_BY_ID, err))?;
            let merged = self.merge_patch(id, &fields)?;
            merged
                .validate()
                .map_err(|err| RepoError::validation(T::COLLECTION, OP_UPDATE_BY_ID, err))?;
            merged.check_relations(self.store, OP_UPDATE_BY_ID)?;

            let changed = self
                .store
                .update_one(T::COLLECTION, id, &fields, now_epoch_ms())
                .map_err(|err| self.db_error(OP_UPDATE_BY_ID, err))?;
            if changed == 0 {
                return Err(no_match::<T>(OP_UPDATE_BY_ID, id));
            }
            tx.commit()
                .map_err(|err| self.db_error(OP_UPDATE_BY_ID, err.into()))?;

            debug!(
                "event=doc_update module=repo status=ok collection={} id={id} fields={}",
                T::COLLECTION,
                fields.len()
            );
            self.reload(id, OP_UPDATE_BY_ID)
        })
    }

    /// Applies an untyped JSON update payload.
    ///
    /// Reserved keys are rejected before decoding; unknown fields fail as
    /// `InvalidArgument`.
    pub fn update_by_id_json(&self, id: DocumentId, payload: serde_json::Value) -> RepoResult<T> {
        let fields = match payload {
            serde_json::Value::Object(fields) => fields,
            other => {
                let err = RepoError::invalid_argument(
                    T::COLLECTION,
                    OP_UPDATE_BY_ID,
                    "update",
                    other,
                    "update payload must be a JSON object",
                );
                err.publish();
                return Err(err);
            }
        };
        if let Err(err) = reject_reserved_keys::<T>(&fields) {
            err.publish();
            return Err(err);
        }

        let patch: T::Patch =
            match serde_json::from_value(serde_json::Value::Object(fields)) {
                Ok(patch) => patch,
                Err(err) => {
                    let err = RepoError::invalid_argument(
                        T::COLLECTION,
                        OP_UPDATE_BY_ID,
                        "update",
                        "<payload>",
                        err.to_string(),
                    );
                    err.publish();
                    return Err(err);
                }
            };
        self.update_by_id(id, patch)
    }

    /// Removes a document using the entity's delete convention.
    pub fn delete_by_id(&self, id: DocumentId) -> RepoResult<()> {
        self.instrument(OP_DELETE_BY_ID, || {
            let removed = match T::DELETE_MODE {
                DeleteMode::Hard => self.store.delete_one(T::COLLECTION, id),
                DeleteMode::Soft => self.store.mark_deleted(T::COLLECTION, id, now_epoch_ms()),
            }
            .map_err(|err| self.db_error(OP_DELETE_BY_ID, err))?;

            if removed == 0 {
                return Err(no_match::<T>(OP_DELETE_BY_ID, id));
            }

            info!(
                "event=doc_delete module=repo status=ok collection={} id={id} mode={:?}",
                T::COLLECTION,
                T::DELETE_MODE
            );
            Ok(())
        })
    }

    /// Reads one live document without raising on absence.
    pub(crate) fn load(&self, id: DocumentId) -> RepoResult<Option<T>> {
        let raw = self
            .store
            .find_one(T::COLLECTION, id)
            .map_err(|err| self.db_error(OP_GET_BY_ID, err))?;
        raw.map(|raw| self.materialize(raw, OP_GET_BY_ID))
            .transpose()
    }

    /// Reads a live document that must exist, without instrumenting.
    pub(crate) fn reload(&self, id: DocumentId, operation: &'static str) -> RepoResult<T> {
        self.load(id)?
            .ok_or_else(|| RepoError::not_found(T::COLLECTION, operation, LookupKey::Id(id)))
    }

    /// Reads live documents for `ids`, skipping absent ones.
    pub(crate) fn load_many(&self, ids: &[DocumentId]) -> RepoResult<Vec<T>> {
        let raws = self
            .store
            .find_by_ids(T::COLLECTION, ids)
            .map_err(|err| self.db_error(OP_GET_BY_ID, err))?;
        raws.into_iter()
            .map(|raw| self.materialize(raw, OP_GET_BY_ID))
            .collect()
    }

    fn materialize(&self, raw: RawDocument, operation: &'static str) -> RepoResult<T> {
        let mut document: T = raw
            .into_document()
            .map_err(|err| self.db_error(operation, err))?;
        if self.populate {
            document.visit_refs(&mut Populator::new(self.store))?;
        }
        Ok(document)
    }

    /// Applies patch fields to the stored document in memory.
    ///
    /// References stay as bare ids; `null` removes the field.
    fn merge_patch(
        &self,
        id: DocumentId,
        fields: &Map<String, serde_json::Value>,
    ) -> RepoResult<T> {
        let Some(mut raw) = self
            .store
            .find_one(T::COLLECTION, id)
            .map_err(|err| self.db_error(OP_UPDATE_BY_ID, err))?
        else {
            return Err(no_match::<T>(OP_UPDATE_BY_ID, id));
        };

        for (key, value) in fields {
            if value.is_null() {
                raw.body.remove(key);
            } else {
                raw.body.insert(key.clone(), value.clone());
            }
        }
        raw.into_document()
            .map_err(|err| self.db_error(OP_UPDATE_BY_ID, err))
    }

    fn patch_fields(
        &self,
        patch: &T::Patch,
        operation: &'static str,
    ) -> RepoResult<Map<String, serde_json::Value>> {
        match serde_json::to_value(patch) {
            Ok(serde_json::Value::Object(fields)) => Ok(fields),
            Ok(other) => Err(RepoError::unexpected(
                T::COLLECTION,
                operation,
                format!("patch serialized to a non-object value `{other}`"),
            )),
            Err(err) => Err(RepoError::unexpected(
                T::COLLECTION,
                operation,
                format!("patch could not be serialized: {err}"),
            )),
        }
    }

    fn db_error(&self, operation: &'static str, err: DbError) -> RepoError {
        RepoError::database(T::COLLECTION, operation, err)
    }

    /// Times one public operation and publishes its failure.
    pub(crate) fn instrument<R>(
        &self,
        operation: &'static str,
        run: impl FnOnce() -> RepoResult<R>,
    ) -> RepoResult<R> {
        let started_at = Instant::now();
        let result = run();
        match &result {
            Ok(_) => debug!(
                "event=repo_op module=repo status=ok collection={} operation={operation} duration_ms={}",
                T::COLLECTION,
                started_at.elapsed().as_millis()
            ),
            Err(err) => {
                debug!(
                    "event=repo_op module=repo status=error collection={} operation={operation} duration_ms={}",
                    T::COLLECTION,
                    started_at.elapsed().as_millis()
                );
                err.publish();
            }
        }
        result
    }
}

fn no_match<T: Document>(operation: &'static str, id: DocumentId) -> RepoError {
    RepoError::invalid_argument(
        T::COLLECTION,
        operation,
        "id",
        id,
        "no document matched the identifier",
    )
}

fn reject_reserved_keys<T: Document>(fields: &Map<String, serde_json::Value>) -> RepoResult<()> {
    for (key, reason) in RESERVED_UPDATE_KEYS {
        if let Some(value) = fields.get(*key) {
            return Err(RepoError::invalid_operation(
                T::COLLECTION,
                OP_VALIDATE_UPDATE,
                *key,
                value,
                *reason,
            ));
        }
    }
    Ok(())
}
