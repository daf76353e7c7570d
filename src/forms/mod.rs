//! Untrusted input payloads and their conversion into domain values.

use thiserror::Error;
use validator::ValidationErrors;

pub mod fiscal_year;
pub mod forecast_target;
pub mod forecast_type;
pub mod opportunity;
pub mod opportunity_split;
pub mod shortcut_key;
pub mod user;

#[derive(Debug, Error)]
/// Errors that can occur when processing form data.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid name")]
    InvalidName,

    #[error("invalid {0} id")]
    InvalidId(&'static str),

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid probability")]
    InvalidProbability,

    #[error("invalid {field}: {message}")]
    InvalidChoice {
        field: &'static str,
        message: String,
    },

    #[error("invalid condition row {row}: {message}")]
    InvalidCondition { row: u32, message: String },

    #[error("invalid fiscal calendar: {0}")]
    InvalidCalendar(String),

    #[error("invalid page url")]
    InvalidPage,

    #[error("invalid shortcut key: {0}")]
    InvalidShortcut(String),

    #[error("invalid split: {0}")]
    InvalidSplit(String),
}

/// Parses a text code into one of the domain enums.
pub(crate) fn parse_choice<T>(field: &'static str, value: &str) -> Result<T, FormError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| FormError::InvalidChoice {
        field,
        message: e.to_string(),
    })
}

/// Treats missing and blank text alike.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
