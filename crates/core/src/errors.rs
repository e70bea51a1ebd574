use thiserror::Error;

use crate::domain::actor::Role;
use crate::domain::approval::ApprovalAction;
use crate::domain::request::{RequestId, RequestStatus};

/// Typed failure surface of every workflow operation. Callers can match on
/// the variant to decide whether to correct input, re-fetch, or retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("purchase request `{0}` was not found")]
    NotFound(RequestId),
    #[error("{action} is not allowed while the request is {status}: {detail}")]
    InvalidState { status: RequestStatus, action: ApprovalAction, detail: String },
    #[error("actor `{actor_id}` is not authorized: {reason}")]
    Unauthorized { actor_id: String, reason: String },
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("storage failure: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Retrying the same call without changing anything can only succeed
    /// for storage failures; the transition itself is idempotent-safe.
    pub fn is_retry_safe(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Reasons used in `Unauthorized` errors, kept as constructors so the
/// wording stays consistent across transition operations.
pub fn not_assigned_manager(actor_id: &str) -> WorkflowError {
    WorkflowError::Unauthorized {
        actor_id: actor_id.to_string(),
        reason: "only the assigned manager may act on this request at the approval stage"
            .to_string(),
    }
}

pub fn role_required(actor_id: &str, required: Role) -> WorkflowError {
    WorkflowError::Unauthorized {
        actor_id: actor_id.to_string(),
        reason: format!("this transition requires the `{required}` role"),
    }
}

/// User-facing error shape: a safe message plus a correlation id for
/// support lookup. Raw storage detail never crosses this boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::Forbidden { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. } => message,
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. It is safe to retry this action shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl WorkflowError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Validation { field, message } => InterfaceError::BadRequest {
                message: format!("invalid `{field}`: {message}"),
                correlation_id,
            },
            Self::Unauthorized { reason, .. } => {
                InterfaceError::Forbidden { message: reason, correlation_id }
            }
            Self::NotFound(id) => InterfaceError::NotFound {
                message: format!("purchase request `{id}` does not exist"),
                correlation_id,
            },
            Self::InvalidState { status, action, .. } => InterfaceError::Conflict {
                message: format!(
                    "the request is `{status}` and cannot accept `{action}`; refresh and review \
                     its current state"
                ),
                correlation_id,
            },
            Self::Storage(detail) => {
                // Full detail stays server-side with the correlation id.
                InterfaceError::ServiceUnavailable { message: detail, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{InterfaceError, WorkflowError};
    use crate::domain::approval::ApprovalAction;
    use crate::domain::request::{RequestId, RequestStatus};

    #[test]
    fn validation_maps_to_bad_request_with_correlation_id() {
        let interface = WorkflowError::validation("amount", "must be greater than zero")
            .into_interface("req-7");

        assert!(matches!(interface, InterfaceError::BadRequest { .. }));
        assert_eq!(interface.correlation_id(), "req-7");
        assert!(interface.user_message().contains("amount"));
    }

    #[test]
    fn storage_error_is_not_shown_to_users() {
        let interface = WorkflowError::Storage("disk I/O error at page 42".to_string())
            .into_interface("req-8");

        assert!(!interface.user_message().contains("page 42"));
        assert!(interface.user_message().contains("retry"));
    }

    #[test]
    fn invalid_state_maps_to_conflict() {
        let interface = WorkflowError::InvalidState {
            status: RequestStatus::Completed,
            action: ApprovalAction::ConfirmDelivery,
            detail: "terminal".to_string(),
        }
        .into_interface("req-9");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn only_storage_errors_are_retry_safe() {
        assert!(WorkflowError::Storage("timeout".to_string()).is_retry_safe());
        assert!(!WorkflowError::NotFound(RequestId("PR-1".to_string())).is_retry_safe());
        assert!(!WorkflowError::validation("comments", "required").is_retry_safe());
    }
}
