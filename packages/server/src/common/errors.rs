use thiserror::Error;

/// Error kinds surfaced by the membership core.
///
/// `NotFound` is recoverable per item inside a slug batch; `Storage` always
/// aborts the current call and is never retried.
#[derive(Error, Debug)]
pub enum MembershipError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for MembershipError {
    fn from(err: sqlx::Error) -> Self {
        MembershipError::Storage(err.into())
    }
}

impl MembershipError {
    pub fn not_found(what: impl Into<String>) -> Self {
        MembershipError::NotFound(what.into())
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        MembershipError::InvalidInput(reason.into())
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, MembershipError::Storage(_))
    }
}

/// True when an `anyhow` error wraps a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}

pub type MembershipResult<T> = Result<T, MembershipError>;
