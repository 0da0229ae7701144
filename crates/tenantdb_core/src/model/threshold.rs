//! Alert threshold on one column of a project's data.
//!
//! # Invariants
//! - `min` and `max` are finite and `min <= max`.
//! - A threshold scoped to a state belongs to that state's project.

use super::project::Project;
use super::reference::Ref;
use super::state::State;
use super::validation::{self, ValidationError, NAME_MAX_CHARS};
use super::{DocumentId, Identified, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threshold {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub name: String,
    pub project: Ref<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Ref<State>>,
    pub column: String,
    pub min: f64,
    pub max: f64,
    /// Highlight color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Identified for Threshold {
    fn id(&self) -> DocumentId {
        self.id
    }
}

impl Threshold {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::require_text("name", &self.name, NAME_MAX_CHARS)?;
        validation::require_text("column", &self.column, NAME_MAX_CHARS)?;
        check_bounds(Some(self.min), Some(self.max))?;
        if let Some(color) = &self.color {
            validation::hex_color("color", color)?;
        }
        Ok(())
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

fn check_bounds(min: Option<f64>, max: Option<f64>) -> Result<(), ValidationError> {
    for (field, value) in [("min", min), ("max", max)] {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(ValidationError::OutOfRange {
                    field,
                    message: format!("must be finite, got {value}"),
                });
            }
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ValidationError::OutOfRange {
                field: "min",
                message: format!("{min} is greater than max {max}"),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewThreshold {
    pub name: String,
    pub project: Ref<Project>,
    #[serde(default)]
    pub state: Option<Ref<State>>,
    pub column: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThresholdPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub state: Option<Option<Ref<State>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::model::deserialize_nullable"
    )]
    pub color: Option<Option<String>>,
}

impl ThresholdPatch {
    /// Bounds are ordered against each other when both are present; a
    /// one-sided change is checked against the stored bound on update.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::require_text("name", name, NAME_MAX_CHARS)?;
        }
        if let Some(column) = &self.column {
            validation::require_text("column", column, NAME_MAX_CHARS)?;
        }
        check_bounds(self.min, self.max)?;
        if let Some(Some(color)) = &self.color {
            validation::hex_color("color", color)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ThresholdFilter {
    pub project: Option<DocumentId>,
    pub state: Option<DocumentId>,
    pub column: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::ThresholdPatch;

    #[test]
    fn inverted_or_non_finite_bounds_are_rejected() {
        let inverted = ThresholdPatch {
            min: Some(10.0),
            max: Some(1.0),
            ..ThresholdPatch::default()
        };
        assert!(inverted.validate().is_err());

        let infinite = ThresholdPatch {
            max: Some(f64::INFINITY),
            ..ThresholdPatch::default()
        };
        assert!(infinite.validate().is_err());

        let bad_color = ThresholdPatch {
            color: Some(Some("red".to_string())),
            ..ThresholdPatch::default()
        };
        assert!(bad_color.validate().is_err());
    }
}
