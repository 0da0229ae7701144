//! Cross-repository reference checks and populate-on-read.
//!
//! # Invariants
//! - Only bare-id references are checked; embedded documents are taken
//!   as given.
//! - Checks go through the referenced entity's own repository
//!   (`id_exists` / `all_ids_exist`), never straight to the store.
//! - Population is one level deep; references to documents that no longer
//!   exist stay as bare ids.

use super::document::{Document, RefVisitor};
use super::error::{RepoError, RepoResult};
use super::repository::Repository;
use crate::db::DocumentStore;
use crate::model::reference::Ref;
use crate::model::{DocumentId, Identified};
use std::collections::HashMap;

/// Fails on the first reference that does not resolve.
pub struct ReferenceCheck<'s> {
    store: DocumentStore<'s>,
    collection: &'static str,
    operation: &'static str,
}

impl<'s> ReferenceCheck<'s> {
    pub fn new(store: DocumentStore<'s>, collection: &'static str, operation: &'static str) -> Self {
        Self {
            store,
            collection,
            operation,
        }
    }

    fn dangling(&self, field: &'static str, value: impl std::fmt::Display, target: &str) -> RepoError {
        RepoError::invalid_operation(
            self.collection,
            self.operation,
            field,
            value,
            format!("referenced {target} document does not exist"),
        )
    }
}

impl RefVisitor for ReferenceCheck<'_> {
    fn visit<T: Document>(&mut self, field: &'static str, reference: &mut Ref<T>) -> RepoResult<()> {
        let Some(id) = reference.as_bare_id() else {
            return Ok(());
        };
        if Repository::<T>::new(self.store).id_exists(id)? {
            Ok(())
        } else {
            Err(self.dangling(field, id, T::COLLECTION))
        }
    }

    fn visit_many<T: Document>(
        &mut self,
        field: &'static str,
        references: &mut [Ref<T>],
    ) -> RepoResult<()> {
        let ids: Vec<DocumentId> = references.iter().filter_map(Ref::as_bare_id).collect();
        if ids.is_empty() {
            return Ok(());
        }

        match Repository::<T>::new(self.store).all_ids_exist(&ids) {
            Ok(_) => Ok(()),
            Err(err) => match err.missing_ids() {
                Some(missing) => {
                    let rendered = missing
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    Err(self.dangling(field, format!("[{rendered}]"), T::COLLECTION))
                }
                None => Err(err),
            },
        }
    }
}

/// Expands bare-id references into their documents.
pub struct Populator<'s> {
    store: DocumentStore<'s>,
}

impl<'s> Populator<'s> {
    pub fn new(store: DocumentStore<'s>) -> Self {
        Self { store }
    }
}

impl RefVisitor for Populator<'_> {
    fn visit<T: Document>(&mut self, _field: &'static str, reference: &mut Ref<T>) -> RepoResult<()> {
        let Some(id) = reference.as_bare_id() else {
            return Ok(());
        };
        let repo = Repository::<T>::new(self.store).without_population();
        if let Some(document) = repo.load(id)? {
            *reference = Ref::Doc(Box::new(document));
        }
        Ok(())
    }

    fn visit_many<T: Document>(
        &mut self,
        _field: &'static str,
        references: &mut [Ref<T>],
    ) -> RepoResult<()> {
        let ids: Vec<DocumentId> = references.iter().filter_map(Ref::as_bare_id).collect();
        if ids.is_empty() {
            return Ok(());
        }

        let repo = Repository::<T>::new(self.store).without_population();
        let loaded: HashMap<DocumentId, T> = repo
            .load_many(&ids)?
            .into_iter()
            .map(|document| (document.id(), document))
            .collect();

        for reference in references.iter_mut() {
            let Some(id) = reference.as_bare_id() else {
                continue;
            };
            // Duplicate references each get their own copy.
            if let Some(document) = loaded.get(&id) {
                *reference = Ref::Doc(Box::new(document.clone()));
            }
        }
        Ok(())
    }
}
