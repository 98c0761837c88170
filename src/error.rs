//! Error types shared across the library.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input (negative radius, non-finite coordinate).
    /// Always detected locally, before any network call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Transport failure, non-success HTTP status, or a malformed response
    /// body from the boundary service.
    #[error("boundary service: {0}")]
    RemoteService(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Error::RemoteService(msg.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::RemoteService(e.to_string())
    }
}
