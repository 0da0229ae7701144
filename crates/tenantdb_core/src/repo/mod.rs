//! Validated repositories over the document store.
//!
//! # Responsibility
//! - Give every entity the same contract: existence checks, create,
//!   get-by-id, paginated query, partial update and delete.
//! - Classify failures into `RepoError` kinds at this boundary.
//!
//! # Invariants
//! - Writes validate fields and references before touching the store.
//! - Cross-entity reference checks go through the referenced entity's
//!   repository.
//! - Repositories borrow the store handle; they never open connections.

pub mod activity_repo;
pub mod document;
pub mod error;
pub mod file_stats_repo;
pub mod member_repo;
pub mod project_repo;
pub mod relations;
pub mod repository;
pub mod state_repo;
pub mod threshold_repo;
pub mod user_repo;
pub mod verification_token_repo;
pub mod workspace_repo;

pub use activity_repo::ActivityRepository;
pub use document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
pub use error::{ErrorKind, LookupKey, RepoError, RepoResult, RepoResultExt};
pub use file_stats_repo::FileStatsRepository;
pub use member_repo::MemberRepository;
pub use project_repo::ProjectRepository;
pub use repository::{Page, Repository, DEFAULT_ITEMS_PER_PAGE};
pub use state_repo::StateRepository;
pub use threshold_repo::ThresholdRepository;
pub use user_repo::UserRepository;
pub use verification_token_repo::VerificationTokenRepository;
pub use workspace_repo::WorkspaceRepository;
