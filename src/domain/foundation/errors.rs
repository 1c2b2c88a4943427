//! Error types for the domain layer.

use std::error::Error;
use std::fmt;

/// Error codes organized by category.
///
/// User-correctable conditions (`NoActiveProject`, `QuotaExceeded`) are
/// distinguished from system faults so callers can phrase guidance instead
/// of apologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found / invalid state
    UserNotFound,
    ProjectNotFound,
    NoActiveProject,
    SubscriptionNotFound,
    InvalidStateTransition,

    // Policy rejections
    QuotaExceeded,

    // External services
    ServiceUnavailable,
    ModelRejected,

    // Infrastructure
    StorageError,
    InternalError,
}

impl ErrorCode {
    /// Returns true if the condition is correctable by the end user
    /// rather than a system fault.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NoActiveProject
                | ErrorCode::ProjectNotFound
                | ErrorCode::QuotaExceeded
                | ErrorCode::ValidationFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::ProjectNotFound => "PROJECT_NOT_FOUND",
            ErrorCode::NoActiveProject => "NO_ACTIVE_PROJECT",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::ModelRejected => "MODEL_REJECTED",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code and message.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid state transition error.
    pub fn invalid_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidStateTransition, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}
