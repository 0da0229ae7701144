//! Validated document repositories for a multi-tenant workspace backend.
//! Every entity gets the same contract: existence checks, create, get-by-id,
//! paginated query, partial update and hard or soft delete.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig, QueryConfig};
pub use db::{open_db, open_db_in_memory, open_with_config, DbError, DocumentStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::reference::Ref;
pub use model::validation::ValidationError;
pub use model::{DocumentId, Identified, Timestamp};
pub use repo::{
    ActivityRepository, DeleteMode, Document, ErrorKind, FileStatsRepository, LookupKey,
    MemberRepository, Page, ProjectRepository, RepoError, RepoResult, RepoResultExt, Repository,
    StateRepository, ThresholdRepository, UserRepository, VerificationTokenRepository,
    WorkspaceRepository,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
