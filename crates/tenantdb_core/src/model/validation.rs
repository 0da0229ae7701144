//! Field-level schema rules shared by entity models.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});
static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));
static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_-]{3,32}$").expect("valid username regex"));
static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,62}$").expect("valid table name regex"));
static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{8,128}$").expect("valid hex regex"));
static COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"));

pub const NAME_MAX_CHARS: usize = 120;
pub const DESCRIPTION_MAX_CHARS: usize = 2_000;

/// Schema violation found before a document is persisted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("`{0}` is required")]
    Required(&'static str),
    #[error("`{field}` exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("`{field}` has an invalid format: `{value}`")]
    InvalidFormat { field: &'static str, value: String },
    #[error("`{field}` is out of range: {message}")]
    OutOfRange { field: &'static str, message: String },
}

/// Non-blank text bounded by `max` characters.
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    bounded_text(field, value, max)
}

pub fn bounded_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &EMAIL_RE)
}

pub fn slug(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &SLUG_RE)
}

pub fn username(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &USERNAME_RE)
}

pub fn table_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &TABLE_NAME_RE)
}

pub fn hex_digest(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &HEX_RE)
}

pub fn hex_color(field: &'static str, value: &str) -> Result<(), ValidationError> {
    matches(field, value, &COLOR_RE)
}

fn matches(field: &'static str, value: &str, pattern: &Regex) -> Result<(), ValidationError> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field,
            value: value.to_string(),
        })
    }
}
