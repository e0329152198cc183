//! Error types
//!
//! Two layers of errors live here:
//!
//! - [`TransportError`] is what the transport collaborator surfaces. It carries a
//!   machine-readable [`TransportErrorCode`].
//! - [`ErrorCode`] is the result-level taxonomy reported inside a
//!   [`ProgressResult`](crate::provisioner::ProgressResult). Transport codes are
//!   translated exactly once, by [`ErrorCode::from_transport`].
//!
//! [`EngineError`] is reserved for failures that are not business outcomes
//! (unknown resource type, poisoned registry lock, serialization bugs).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result-level error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    NotUpdatable,
    AlreadyExists,
    AccessDenied,
    Throttling,
    NetworkFailure,
    ServiceInternalError,
    GeneralServiceException,
}

impl ErrorCode {
    /// Translate a transport failure into the result taxonomy
    pub fn from_transport(code: TransportErrorCode) -> Self {
        match code {
            TransportErrorCode::NotFound => ErrorCode::NotFound,
            TransportErrorCode::InvalidRequest => ErrorCode::InvalidRequest,
            TransportErrorCode::Conflict => ErrorCode::AlreadyExists,
            TransportErrorCode::Unauthorized | TransportErrorCode::Forbidden => {
                ErrorCode::AccessDenied
            }
            TransportErrorCode::Throttled => ErrorCode::Throttling,
            TransportErrorCode::Network => ErrorCode::NetworkFailure,
            TransportErrorCode::ServiceUnavailable | TransportErrorCode::Internal => {
                ErrorCode::ServiceInternalError
            }
            TransportErrorCode::InvalidResponse | TransportErrorCode::Cancelled => {
                ErrorCode::GeneralServiceException
            }
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::InvalidRequest => "InvalidRequest",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::NotUpdatable => "NotUpdatable",
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::AccessDenied => "AccessDenied",
            ErrorCode::Throttling => "Throttling",
            ErrorCode::NetworkFailure => "NetworkFailure",
            ErrorCode::ServiceInternalError => "ServiceInternalError",
            ErrorCode::GeneralServiceException => "GeneralServiceException",
        };
        write!(f, "{}", s)
    }
}

/// Machine-readable transport failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorCode {
    InvalidRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Throttled,
    ServiceUnavailable,
    Internal,
    Network,
    InvalidResponse,
    Cancelled,
}

impl TransportErrorCode {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => TransportErrorCode::InvalidRequest,
            401 => TransportErrorCode::Unauthorized,
            403 => TransportErrorCode::Forbidden,
            404 | 410 => TransportErrorCode::NotFound,
            409 => TransportErrorCode::Conflict,
            429 => TransportErrorCode::Throttled,
            502..=504 => TransportErrorCode::ServiceUnavailable,
            _ => TransportErrorCode::Internal,
        }
    }
}

/// Error surfaced by a [`Transport`](crate::transport::Transport)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code:?}: {message}")]
pub struct TransportError {
    pub code: TransportErrorCode,
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(code: TransportErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: TransportErrorCode::from_status(status),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(TransportErrorCode::NotFound, message)
    }

    pub fn cancelled() -> Self {
        Self::new(TransportErrorCode::Cancelled, "request cancelled")
    }

    pub fn is_not_found(&self) -> bool {
        self.code == TransportErrorCode::NotFound
    }
}

/// Engine-level failures (not business outcomes)
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("Resource type already registered: {0}")]
    DuplicateResourceType(String),

    #[error("Registry lock poisoned")]
    RegistryPoisoned,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
