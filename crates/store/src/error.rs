//! Error types for the resource store.
//!
//! This module defines all error types used by the store, organized by
//! category: validation errors, resource state errors, concurrency errors,
//! and backend errors.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::kind::ResourceKind;

/// The primary error type for all store operations.
///
/// Every operation on the store is terminal for the current call; the store
/// performs no internal retry beyond the bounded compare-and-swap loop on
/// update and delete. Callers inspect the category to decide their own
/// retry or response-mapping policy.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Payload and kind validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Concurrency and versioning errors
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl StoreError {
    /// Returns `true` if the error originates from backend transport or
    /// storage failure rather than store logic.
    ///
    /// Callers use this to apply their own retry/backoff policy; the store
    /// never masks a backend outage as a logic error such as `NotFound`.
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

/// Errors raised while validating a kind tag or payload.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The kind tag is not in the supported-kind set.
    #[error("unsupported resource kind: {kind}")]
    UnsupportedKind { kind: String },

    /// The payload is absent or malformed.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// The payload carries a kind tag that does not match the operation.
    #[error("kind mismatch: expected {expected}, payload is tagged {found}")]
    KindMismatch {
        expected: ResourceKind,
        found: String,
    },

    /// A kind that requires an owner reference was submitted without one.
    #[error("missing owner reference for {kind} payload")]
    MissingOwner { kind: ResourceKind },
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested resource was not found.
    #[error("resource not found: {kind}/{id}")]
    NotFound { kind: ResourceKind, id: String },

    /// A resource with the given identity already exists.
    #[error("resource already exists: {kind}/{id}")]
    AlreadyExists { kind: ResourceKind, id: String },

    /// The requested version of the resource was not found.
    #[error("version not found: {kind}/{id}/_history/{version}")]
    VersionNotFound {
        kind: ResourceKind,
        id: String,
        version: u64,
    },
}

/// Errors related to concurrency control.
#[derive(Error, Debug)]
pub enum ConcurrencyError {
    /// The compare-and-swap on the current row kept failing under
    /// contention and the bounded retry budget was exhausted.
    #[error("write conflict on {kind}/{id} after {attempts} attempts")]
    Conflict {
        kind: ResourceKind,
        id: String,
        attempts: u32,
    },
}

/// Errors originating from the key-value/index backend.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The backend is currently unavailable.
    #[error("backend unavailable: {backend}: {message}")]
    Unavailable { backend: String, message: String },

    /// Serialization/deserialization of a stored row failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal backend error.
    #[error("internal error in {backend}: {message}")]
    Internal {
        backend: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(BackendError::Serialization {
            message: err.to_string(),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(BackendError::Internal {
            backend: "sqlite".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(feature = "sqlite")]
impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Backend(BackendError::Unavailable {
            backend: "sqlite".to_string(),
            message: err.to_string(),
        })
    }
}
