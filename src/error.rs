use serde::Serialize;

use crate::identity::TenantId;
use crate::store::StoreError;
use crate::workflows::lending::domain::LoanId;

/// Crate-level error taxonomy. Every public operation returns one of these;
/// validation and conflict failures never escape as generic panics.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("record not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl CoreError {
    /// User-visible shape of a rejected operation.
    pub fn payload(&self) -> ErrorPayload {
        match self {
            CoreError::Validation(err) => ErrorPayload {
                message: err.message.clone(),
                field: err.field.clone(),
            },
            other => ErrorPayload {
                message: other.to_string(),
                field: None,
            },
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => CoreError::NotFound,
            StoreError::DuplicateKey { collection, id } => {
                CoreError::Conflict(format!("{collection} record {id} already exists"))
            }
            StoreError::VersionConflict { collection, id } => {
                CoreError::Conflict(format!("{collection} record {id} changed concurrently"))
            }
            StoreError::Unavailable(message) => CoreError::Dependency(message),
        }
    }
}

/// Malformed or out-of-range input, with optional field-level detail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub field: Option<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn on_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// The Financial Engine derived an impossible state. Indicates a tenant or
/// segment misconfiguration rather than bad user input; logged at error
/// severity before surfacing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invariant violation on loan {loan_id} (tenant {tenant_id}): {detail}")]
pub struct InvariantViolation {
    pub loan_id: LoanId,
    pub tenant_id: TenantId,
    pub detail: String,
}

/// Structured `{message, field?}` payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
