//! Error type for repository operations.

use labelkit_core::error::CoreError;

/// Error from a repository call: either a lifecycle/validation verdict
/// from the domain guards, or a database failure.
///
/// Guard verdicts surface unchanged so the API layer can map them to
/// their proper status codes; `Sqlx` covers everything else, including
/// constraint violations the API classifies separately.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type DbResult<T> = Result<T, DbError>;
