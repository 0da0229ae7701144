//! Repository error taxonomy.
//!
//! # Invariants
//! - Every variant names the collection and operation that raised it.
//! - Store failures are wrapped exactly once, at the repository boundary,
//!   keeping the store error as `source()`.
//! - Domain variants raised one layer down are passed through unchanged.

use crate::db::DbError;
use crate::model::validation::ValidationError;
use crate::model::DocumentId;
use log::{error, info};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Name of the backing store, reported with wrapped store failures.
pub const STORE_NAME: &str = "sqlite";

/// Key that a failed lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Id(DocumentId),
    /// Ids that were requested but not found.
    Ids(Vec<DocumentId>),
    /// Rendered query filter.
    Filter(String),
}

impl Display for LookupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Ids(ids) => {
                write!(f, "ids [")?;
                for (index, id) in ids.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{id}")?;
                }
                write!(f, "]")
            }
            Self::Filter(filter) => write!(f, "filter {filter}"),
        }
    }
}

/// Coarse error class callers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DataNotFound,
    InvalidArgument,
    InvalidOperation,
    DataValidation,
    DatabaseOperation,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataNotFound => "data_not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::InvalidOperation => "invalid_operation",
            Self::DataValidation => "data_validation",
            Self::DatabaseOperation => "database_operation",
            Self::Unexpected => "unexpected",
        }
    }
}

#[derive(Debug, Error)]
pub enum RepoError {
    /// The requested document(s) do not exist.
    #[error("{collection}.{operation}: no document matches {key}")]
    DataNotFound {
        collection: &'static str,
        operation: &'static str,
        key: LookupKey,
    },
    /// A caller-supplied value does not fit the operation.
    #[error("{collection}.{operation}: invalid argument `{argument}` = {value}: {message}")]
    InvalidArgument {
        collection: &'static str,
        operation: &'static str,
        argument: &'static str,
        value: String,
        message: String,
    },
    /// A disallowed mutation: immutable field or dangling reference.
    #[error("{collection}.{operation}: cannot write `{field}` = {value}: {reason}")]
    InvalidOperation {
        collection: &'static str,
        operation: &'static str,
        field: String,
        value: String,
        reason: String,
    },
    /// The assembled document failed schema validation.
    #[error("{collection}.{operation}: document failed validation: {source}")]
    DataValidation {
        collection: &'static str,
        operation: &'static str,
        #[source]
        source: ValidationError,
    },
    /// The backing store failed.
    #[error("{store} {collection}.{operation} failed: {source}")]
    DatabaseOperation {
        store: &'static str,
        collection: &'static str,
        operation: &'static str,
        #[source]
        source: DbError,
    },
    /// An internally inconsistent state.
    #[error("{collection}.{operation}: unexpected state: {message}")]
    Unexpected {
        collection: &'static str,
        operation: &'static str,
        message: String,
    },
}

impl RepoError {
    pub fn not_found(collection: &'static str, operation: &'static str, key: LookupKey) -> Self {
        Self::DataNotFound {
            collection,
            operation,
            key,
        }
    }

    pub fn invalid_argument(
        collection: &'static str,
        operation: &'static str,
        argument: &'static str,
        value: impl Display,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            collection,
            operation,
            argument,
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_operation(
        collection: &'static str,
        operation: &'static str,
        field: impl Into<String>,
        value: impl Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOperation {
            collection,
            operation,
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn validation(
        collection: &'static str,
        operation: &'static str,
        source: ValidationError,
    ) -> Self {
        Self::DataValidation {
            collection,
            operation,
            source,
        }
    }

    pub fn database(collection: &'static str, operation: &'static str, source: DbError) -> Self {
        Self::DatabaseOperation {
            store: STORE_NAME,
            collection,
            operation,
            source,
        }
    }

    pub fn unexpected(
        collection: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Unexpected {
            collection,
            operation,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataNotFound { .. } => ErrorKind::DataNotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::DataValidation { .. } => ErrorKind::DataValidation,
            Self::DatabaseOperation { .. } => ErrorKind::DatabaseOperation,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::DataNotFound
    }

    pub fn collection(&self) -> &'static str {
        match self {
            Self::DataNotFound { collection, .. }
            | Self::InvalidArgument { collection, .. }
            | Self::InvalidOperation { collection, .. }
            | Self::DataValidation { collection, .. }
            | Self::DatabaseOperation { collection, .. }
            | Self::Unexpected { collection, .. } => *collection,
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            Self::DataNotFound { operation, .. }
            | Self::InvalidArgument { operation, .. }
            | Self::InvalidOperation { operation, .. }
            | Self::DataValidation { operation, .. }
            | Self::DatabaseOperation { operation, .. }
            | Self::Unexpected { operation, .. } => *operation,
        }
    }

    /// Ids reported missing by a batched existence check.
    pub fn missing_ids(&self) -> Option<&[DocumentId]> {
        match self {
            Self::DataNotFound {
                key: LookupKey::Ids(ids),
                ..
            } => Some(ids),
            _ => None,
        }
    }

    /// Writes this error to the log sink.
    ///
    /// Not-found is logged at `info`; callers often treat it as non-fatal.
    pub fn publish(&self) {
        let kind = self.kind().as_str();
        let collection = self.collection();
        let operation = self.operation();
        if self.is_not_found() {
            info!(
                "event=repo_error module=repo status=not_found collection={collection} operation={operation} error_kind={kind} error={self}"
            );
        } else {
            error!(
                "event=repo_error module=repo status=error collection={collection} operation={operation} error_kind={kind} error={self}"
            );
        }
    }
}

/// Helpers for callers that treat not-found as a legitimate negative result.
pub trait RepoResultExt<T> {
    /// Maps `DataNotFound` to `Ok(None)`; other errors pass through.
    ///
    /// Every error is published before it is mapped or returned.
    fn found(self) -> RepoResult<Option<T>>;
}

impl<T> RepoResultExt<T> for RepoResult<T> {
    fn found(self) -> RepoResult<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                err.publish();
                if err.is_not_found() {
                    Ok(None)
                } else {
                    Err(err)
                }
            }
        }
    }
}
