//! Domain error taxonomy.
//!
//! Every rejected operation in the workflow engine is reported through one of
//! these variants; nothing is silently swallowed or auto-corrected. The API
//! layer maps them onto HTTP statuses (`labelkit-api/src/error.rs`).

use crate::types::DbId;

/// Core domain error type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entity lookup failed, or a queue index was out of range.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Malformed or incomplete input; the caller can correct and resubmit.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A uniqueness/exclusivity invariant was violated; the caller should
    /// re-fetch current state and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An illegal lifecycle transition for the record's current state; the
    /// caller must resync before retrying.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Missing or invalid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Role or lock violation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
