//! Validation rules for stock quantities and movement notes
//!
//! Error messages are bilingual (English and Brazilian Portuguese) to match
//! the warehouse operators' locale.

use rust_decimal::Decimal;
use thiserror::Error;

/// Maximum accepted length for movement notes, in characters
pub const NOTES_MAX_LEN: usize = 500;

/// A domain-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed for {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub message_pt: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        message: impl Into<String>,
        message_pt: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            message_pt: message_pt.into(),
        }
    }
}

/// Validate that a quantity is strictly positive
pub fn require_positive(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value <= Decimal::ZERO {
        return Err(ValidationError::new(
            field,
            "Quantity must be positive",
            "Quantidade deve ser maior que zero",
        ));
    }
    Ok(())
}

/// Validate that a quantity is not negative
pub fn require_non_negative(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::ZERO {
        return Err(ValidationError::new(
            field,
            "Quantity cannot be negative",
            "Quantidade não pode ser negativa",
        ));
    }
    Ok(())
}

/// Trim movement notes and enforce the length cap.
///
/// Empty or whitespace-only notes collapse to `None`.
pub fn normalize_notes(notes: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(notes) = notes else {
        return Ok(None);
    };
    let trimmed = notes.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > NOTES_MAX_LEN {
        return Err(ValidationError::new(
            "notes",
            format!("Notes must be at most {} characters", NOTES_MAX_LEN),
            format!("Observações devem ter no máximo {} caracteres", NOTES_MAX_LEN),
        ));
    }
    Ok(Some(trimmed.to_string()))
}
