//! Document models for every persisted entity.
//!
//! # Responsibility
//! - Declare each entity's shape, create payload, partial-update payload,
//!   and typed query filter.
//! - Enforce field-level schema rules independent of storage.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId` (`_id`).
//! - `createdAt`/`updatedAt`/`deletedAt` are assigned by the repository,
//!   never by payloads.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub mod activity;
pub mod file_stats;
pub mod member;
pub mod project;
pub mod reference;
pub mod state;
pub mod threshold;
pub mod user;
pub mod validation;
pub mod verification_token;
pub mod workspace;

/// Opaque document identifier, assigned once at creation.
pub type DocumentId = Uuid;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Anything that carries a stable document identifier.
pub trait Identified {
    fn id(&self) -> DocumentId;
}

/// Deserializes a present field (including `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]`, this lets patch fields tell "absent"
/// (`None`) apart from "clear this value" (`Some(None)`).
pub fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
