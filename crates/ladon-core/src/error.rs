//! Shared error type across ladon crates.

use thiserror::Error;

/// Stable error categories (safe to match on and to report).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Durable store operation failed.
    Store,
    /// A record could not be turned into a policy.
    Decode,
    /// A policy could not be turned into a record.
    Encode,
    /// Identifier absent from the replica.
    NotFound,
    /// Matching predicate failed.
    Match,
    /// Invalid configuration.
    Config,
    /// Unsupported config version.
    UnsupportedVersion,
    /// A change feed consumer is already running.
    AlreadyWatching,
    /// Internal fault.
    Internal,
}

impl ErrorKind {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Store => "STORE",
            ErrorKind::Decode => "DECODE",
            ErrorKind::Encode => "ENCODE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Match => "MATCH",
            ErrorKind::Config => "CONFIG",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::AlreadyWatching => "ALREADY_WATCHING",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type used by core and replica.
#[derive(Debug, Error)]
pub enum Error {
    #[error("store: {0}")]
    Store(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("encode: {0}")]
    Encode(String),
    #[error("policy not found: {0}")]
    NotFound(String),
    #[error("match: {0}")]
    Match(String),
    #[error("config: {0}")]
    Config(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("change feed consumer already running")]
    AlreadyWatching,
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Map to a stable error category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Store(_) => ErrorKind::Store,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Encode(_) => ErrorKind::Encode,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Match(_) => ErrorKind::Match,
            Error::Config(_) => ErrorKind::Config,
            Error::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            Error::AlreadyWatching => ErrorKind::AlreadyWatching,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for a lookup miss (an expected outcome, not a fault).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
