use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("not authorized")]
    NotAuthorized,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("user already owns this pantry")]
    AlreadyOwner,

    #[error("not found")]
    NotFound,

    #[error("timed out: {0}")]
    Timeout(&'static str),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("credential error: {0}")]
    Credential(String),
}

/// Coarse classification of [`Error`] for callers that branch on the failure
/// rather than display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotAuthorized,
    UserNotFound,
    InvalidTarget,
    AlreadyOwner,
    NotFound,
    Timeout,
    Persistence,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::InvalidTokenFormat => ErrorKind::Validation,
            Error::NotAuthorized => ErrorKind::NotAuthorized,
            Error::UserNotFound => ErrorKind::UserNotFound,
            Error::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Error::AlreadyOwner => ErrorKind::AlreadyOwner,
            Error::NotFound => ErrorKind::NotFound,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::Persistence(_)
            | Error::Database(_)
            | Error::AlreadyExists
            | Error::TokenLookupCollision
            | Error::Io(_)
            | Error::Config(_)
            | Error::Credential(_) => ErrorKind::Persistence,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
