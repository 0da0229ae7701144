//! File statistics repository.

use super::document::{DeleteMode, Document, DocumentPatch, QueryFilter, RefVisitor};
use super::error::RepoResult;
use super::repository::Repository;
use crate::db::Filter;
use crate::model::file_stats::{FileStats, FileStatsFilter, FileStatsPatch, NewFileStats};
use crate::model::validation::ValidationError;
use crate::model::{DocumentId, Timestamp};

pub type FileStatsRepository<'s> = Repository<'s, FileStats>;

impl Document for FileStats {
    const COLLECTION: &'static str = "file_stats";
    const DELETE_MODE: DeleteMode = DeleteMode::Hard;

    type Input = NewFileStats;
    type Patch = FileStatsPatch;
    type Filter = FileStatsFilter;

    fn assemble(id: DocumentId, input: NewFileStats, now: Timestamp) -> Self {
        Self {
            id,
            file_name: input.file_name,
            table_name: input.table_name,
            file_size: input.file_size,
            num_rows: input.num_rows,
            num_columns: input.num_columns,
            columns: input.columns,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        FileStats::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl DocumentPatch for FileStatsPatch {
    fn validate(&self) -> Result<(), ValidationError> {
        FileStatsPatch::validate(self)
    }

    fn visit_refs<V: RefVisitor>(&mut self, _visitor: &mut V) -> RepoResult<()> {
        Ok(())
    }
}

impl QueryFilter for FileStatsFilter {
    fn to_filter(&self) -> Filter {
        Filter::new()
            .eq_opt("fileName", self.file_name.as_deref())
            .eq_opt("tableName", self.table_name.as_deref())
    }
}
