//! Fleet domain model.
//!
//! # Responsibility
//! - Define the records shared by repositories and services.
//! - Own field-level validation that does not need storage access.
//!
//! # Invariants
//! - Every aggregate is identified by a stable `Uuid`.
//! - A vehicle's operator list is derived from user assignments, never stored twice.

pub mod catalog;
pub mod inventory;
pub mod notification;
pub mod user;
pub mod vehicle;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Text field does not match its expected shape.
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
    },
    /// Text field is shorter than required.
    TooShort { field: &'static str, min_chars: usize },
    /// Quantity must be strictly positive.
    NonPositiveQuantity,
    /// Requested use exceeds stock on hand.
    InsufficientStock { requested: u32, available: u32 },
    /// Password and confirmation differ.
    PasswordMismatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvalidFormat { field, expected } => {
                write!(f, "`{field}` is invalid; expected {expected}")
            }
            Self::TooShort { field, min_chars } => {
                write!(f, "`{field}` must have at least {min_chars} characters")
            }
            Self::NonPositiveQuantity => write!(f, "quantity must be greater than 0"),
            Self::InsufficientStock {
                requested,
                available,
            } => write!(
                f,
                "requested quantity {requested} exceeds available stock {available}"
            ),
            Self::PasswordMismatch => write!(f, "password confirmation does not match"),
        }
    }
}

impl Error for ValidationError {}

/// Trims a required text field, rejecting blank input.
pub(crate) fn required_text(
    field: &'static str,
    value: &str,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{required_text, ValidationError};

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("name", "  Alpha ").unwrap(), "Alpha");
        assert_eq!(
            required_text("name", " \t"),
            Err(ValidationError::BlankField("name"))
        );
    }
}
