//! Error handling for the Warehouse Stock Ledger
//!
//! Provides a single error taxonomy for the posting engine. Messages are
//! bilingual (English and Brazilian Portuguese). The HTTP layer is outside
//! this crate; it maps each variant to a response via [`AppError::detail`].

use serde::Serialize;
use thiserror::Error;

use shared::validation::ValidationError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Caller-fixable input errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_pt: String,
    },

    // Referential errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Entity is inactive: {0}")]
    Inactive(String),

    // Business rule errors
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_pt: String,
    },

    // Infrastructure errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

/// Error response structure for the API layer
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_pt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Inactive(_) => "INACTIVE_ENTITY",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Bilingual detail the API layer serializes into its error body
    pub fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Validation {
                field,
                message,
                message_pt,
            } => ErrorDetail {
                code: self.code().to_string(),
                message_en: message.clone(),
                message_pt: message_pt.clone(),
                field: Some(field.clone()),
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: self.code().to_string(),
                message_en: format!("{} not found", resource),
                message_pt: format!("{} não encontrado", resource),
                field: None,
            },
            AppError::Inactive(resource) => ErrorDetail {
                code: self.code().to_string(),
                message_en: format!("{} is inactive", resource),
                message_pt: format!("{} está inativo", resource),
                field: None,
            },
            AppError::InsufficientStock(msg) => ErrorDetail {
                code: self.code().to_string(),
                message_en: msg.clone(),
                message_pt: "Quantidade insuficiente em estoque".to_string(),
                field: None,
            },
            AppError::Conflict {
                resource,
                message,
                message_pt,
            } => ErrorDetail {
                code: self.code().to_string(),
                message_en: message.clone(),
                message_pt: message_pt.clone(),
                field: Some(resource.clone()),
            },
            AppError::Configuration(msg) => ErrorDetail {
                code: self.code().to_string(),
                message_en: format!("Configuration error: {}", msg),
                message_pt: format!("Erro de configuração: {}", msg),
                field: None,
            },
            AppError::Database(_) => ErrorDetail {
                code: self.code().to_string(),
                message_en: "A database error occurred".to_string(),
                message_pt: "Ocorreu um erro de banco de dados".to_string(),
                field: None,
            },
            AppError::Internal(_) => ErrorDetail {
                code: self.code().to_string(),
                message_en: "An internal error occurred".to_string(),
                message_pt: "Ocorreu um erro interno".to_string(),
                field: None,
            },
        }
    }

    /// Whether retrying the same call could succeed without caller changes.
    /// Infrastructure failures qualify, as does losing the race on lazy item
    /// creation; retry policy itself lives with the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Conflict { .. })
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation {
            field: err.field,
            message: err.message,
            message_pt: err.message_pt,
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
