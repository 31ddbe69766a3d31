use std::collections::BTreeMap;
use thiserror::Error;

/// Field-keyed validation messages, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Everything that can go wrong while serving a request.
///
/// Every variant is request-scoped; nothing here is fatal to the process.
/// The HTTP layer maps each variant to a status code and a JSON envelope.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown entity: '{0}'")]
    EntityNotFound(String),

    #[error("No {entity} record with id {id}")]
    RecordNotFound { entity: String, id: u64 },

    #[error("Validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Table for '{0}' is missing")]
    TableMissing(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Locked: {0}")]
    Locked(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl EngineError {
    pub fn record_not_found(entity: &str, id: u64) -> Self {
        Self::RecordNotFound {
            entity: entity.to_string(),
            id,
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation(errors)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for EngineError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for EngineError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Snapshot(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
