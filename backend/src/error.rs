//! Error handling for the School Food Supply platform
//!
//! Provides consistent error details in Portuguese and English

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_pt: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // External stored-procedure failure during average recalculation
    #[error("Computation failed for school {school_id}: {message}")]
    Computation { school_id: uuid::Uuid, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error")]
    InternalError(#[from] anyhow::Error),
}

/// Error detail exposed to thin callers
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_pt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    /// Message in the caller's language
    pub fn localized_message(&self, language: &shared::Language) -> &str {
        match language {
            shared::Language::Portuguese => &self.message_pt,
            shared::Language::English => &self.message_en,
        }
    }
}

impl AppError {
    /// Map the error to its caller-facing detail
    pub fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Validation {
                field,
                message,
                message_pt,
            } => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: message.clone(),
                message_pt: message_pt.clone(),
                field: Some(field.clone()),
            },
            AppError::ValidationError(msg) => ErrorDetail {
                code: "VALIDATION_ERROR".to_string(),
                message_en: msg.clone(),
                message_pt: format!("Dados inválidos: {}", msg),
                field: None,
            },
            AppError::NotFound(resource) => ErrorDetail {
                code: "NOT_FOUND".to_string(),
                message_en: format!("{} not found", resource),
                message_pt: format!("{} não encontrado", resource),
                field: None,
            },
            AppError::InvalidStateTransition(msg) => ErrorDetail {
                code: "INVALID_STATE_TRANSITION".to_string(),
                message_en: msg.clone(),
                message_pt: format!("Transição de situação inválida: {}", msg),
                field: None,
            },
            AppError::Computation { school_id, message } => ErrorDetail {
                code: "COMPUTATION_ERROR".to_string(),
                message_en: format!("Computation failed for school {}: {}", school_id, message),
                message_pt: format!("Falha no cálculo para a escola {}: {}", school_id, message),
                field: None,
            },
            AppError::Configuration(msg) => ErrorDetail {
                code: "CONFIGURATION_ERROR".to_string(),
                message_en: format!("Configuration error: {}", msg),
                message_pt: format!("Erro de configuração: {}", msg),
                field: None,
            },
            AppError::DatabaseError(_) => ErrorDetail {
                code: "DATABASE_ERROR".to_string(),
                message_en: "A database error occurred".to_string(),
                message_pt: "Ocorreu um erro de banco de dados".to_string(),
                field: None,
            },
            AppError::Internal(msg) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: msg.clone(),
                message_pt: "Ocorreu um erro interno".to_string(),
                field: None,
            },
            AppError::InternalError(_) => ErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message_en: "An internal error occurred".to_string(),
                message_pt: "Ocorreu um erro interno".to_string(),
                field: None,
            },
        }
    }
}

/// Result type alias for services
pub type AppResult<T> = Result<T, AppError>;
