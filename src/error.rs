use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::requests::{RequestType, WorkflowStatus};
use crate::db::models::user::Role;

/// Failures raised by a request or mission store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("role '{role}' may not {action}")]
    Forbidden { role: Role, action: &'static str },

    #[error("cannot move a request from {from} to {to}")]
    InvalidTransition {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    #[error("request {0} is already assigned")]
    AlreadyAssigned(Uuid),

    #[error("request {0} is not in a pool this role can claim from")]
    WrongPool(Uuid),

    #[error("request {0} is assigned to someone else")]
    NotOwner(Uuid),

    #[error("request {0} changed while this update was in flight")]
    Conflict(Uuid),

    #[error("details of type {found} cannot replace a {expected} request")]
    TypeChange {
        expected: RequestType,
        found: RequestType,
    },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden { .. } | WorkflowError::NotOwner(_) => StatusCode::FORBIDDEN,
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::AlreadyAssigned(_)
            | WorkflowError::WrongPool(_)
            | WorkflowError::Conflict(_) => StatusCode::CONFLICT,
            WorkflowError::TypeChange { .. } | WorkflowError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn request_not_found(id: Uuid) -> Self {
        WorkflowError::NotFound { entity: "request", id }
    }

    pub(crate) fn mission_not_found(id: Uuid) -> Self {
        WorkflowError::NotFound { entity: "mission", id }
    }
}
