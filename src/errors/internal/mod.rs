use thiserror::Error;

pub mod credential;

pub use credential::CredentialError;

use crate::types::internal::auth::TokenRejection;

/// Internal error type for store, service and coordinator operations
///
/// Hybrid design separates infrastructure errors (shared by both store
/// backends) from domain errors. Not exposed via API - endpoints must
/// convert to AuthError explicitly.
#[derive(Error, Debug)]
pub enum InternalError {
    #[error("Database error: {operation} failed: {source}")]
    Database {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    #[error("Transaction error: {operation} failed: {source}")]
    Transaction {
        operation: String,
        #[source]
        source: sea_orm::DbErr,
    },

    /// Backend cannot be reached (pool exhausted, connection refused, not initialized)
    #[error("Store unavailable: {operation}: {message}")]
    StoreUnavailable { operation: String, message: String },

    #[error("I/O error: {operation} failed: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: failed to parse {value_type}: {message}")]
    Parse { value_type: String, message: String },

    #[error("Crypto error: {operation} failed: {message}")]
    Crypto { operation: String, message: String },

    /// The active backend does not provide this capability
    #[error("Unsupported by active store: {capability}")]
    Unsupported { capability: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Token(#[from] TokenRejection),
}

impl InternalError {
    /// Create a database error, classifying connectivity failures as unavailability
    pub fn database(operation: impl Into<String>, source: sea_orm::DbErr) -> Self {
        let operation = operation.into();
        match source {
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
                Self::StoreUnavailable {
                    operation,
                    message: source.to_string(),
                }
            }
            source => Self::Database { operation, source },
        }
    }

    pub fn transaction(operation: impl Into<String>, source: sea_orm::DbErr) -> Self {
        let operation = operation.into();
        match source {
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
                Self::StoreUnavailable {
                    operation,
                    message: source.to_string(),
                }
            }
            source => Self::Transaction { operation, source },
        }
    }

    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn parse(value_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            value_type: value_type.into(),
            message: message.into(),
        }
    }

    pub fn crypto(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Crypto {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported {
            capability: capability.into(),
        }
    }

    /// True when the failure means the backend itself is unreachable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
