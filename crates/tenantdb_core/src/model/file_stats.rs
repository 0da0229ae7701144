//! Statistics for an uploaded tabular data file.

use super::validation::{self, ValidationError, NAME_MAX_CHARS};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

const FILE_NAME_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub file_name: String,
    /// Name of the table the file was loaded into.
    pub table_name: String,
    /// Size in bytes.
    pub file_size: u64,
    pub num_rows: u64,
    pub num_columns: u32,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identified for FileStats {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl FileStats {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("fileName", &self.file_name, FILE_NAME_MAX_CHARS)?;
        validation::table_name("tableName", &self.table_name)?;
        validate_columns(&self.columns)?;
        check_column_count(self.num_columns, &self.columns)
    }
}

fn validate_columns(columns: &[ColumnInfo]) -> Result<(), ValidationError> {
    for column in columns {
        validation::require_text("columns", &column.name, NAME_MAX_CHARS)?;
        validation::require_text("columns", &column.data_type, NAME_MAX_CHARS)?;
    }
    Ok(())
}

/// An empty column list means the columns were not profiled.
fn check_column_count(num_columns: u32, columns: &[ColumnInfo]) -> Result<(), ValidationError> {
    if columns.is_empty() || columns.len() == num_columns as usize {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field: "numColumns",
        message: format!(
            "{num_columns} declared but {} columns listed",
            columns.len()
        ),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewFileStats {
    pub file_name: String,
    pub table_name: String,
    pub file_size: u64,
    pub num_rows: u64,
    pub num_columns: u32,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileStatsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_rows: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<ColumnInfo>>,
}

impl FileStatsPatch {
    /// Column count is cross-checked here when both fields are present; a
    /// one-sided change is checked against the stored document on update.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(file_name) = &self.file_name {
            validation::require_text("fileName", file_name, FILE_NAME_MAX_CHARS)?;
        }
        if let Some(table_name) = &self.table_name {
            validation::table_name("tableName", table_name)?;
        }
        if let Some(columns) = &self.columns {
            validate_columns(columns)?;
            if let Some(num_columns) = self.num_columns {
                check_column_count(num_columns, columns)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FileStatsFilter {
    pub file_name: Option<String>,
    pub table_name: Option<String>,
}
