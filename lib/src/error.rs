use std::backtrace::Backtrace;
use std::convert::Infallible;
use std::fmt::{Display, Formatter};

use sled::transaction::{ConflictableTransactionError, TransactionError};
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub backtrace: Backtrace,
    pub request: Option<Uuid>,
    pub user: Option<Uuid>,
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
            request: None,
            user: None,
        }
    }

    /// Attaches the acting user to the error for logging purposes.
    pub fn with_user(mut self, user: Uuid) -> Self {
        self.user = Some(user);
        self
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(user) = self.user {
            write!(f, ", user: {}", user)?;
        }
        if let Some(request) = self.request {
            write!(f, ", request: {}", request)?;
        }
        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            write!(f, ", {}", self.backtrace)?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("unexpected error")]
    StdIoError(#[from] std::io::Error),

    #[error("config error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("failed parsing value from string: {0}")]
    ParsingError(String),

    #[error("lettre email error: {0}")]
    LettreEmailError(#[from] lettre::error::Error),
    #[error("lettre smtp  error: {0}")]
    LettreSmtpError(#[from] lettre::transport::smtp::Error),
    #[error("failed parsing email address: {0}")]
    EmailParseError(String),
    #[error("failed sending email through smtp: {0}")]
    EmailBadResponse(String),
    #[error("other error: {0}")]
    Other(String),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("forbidden")]
    Forbidden,

    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("account disabled")]
    AccountDisabled,

    #[error("{0} not found")]
    NotFound(String),
    #[error("Slug is already in use: {0}")]
    SlugInUse(String),
    #[error("{0} still has {1} associated posts")]
    HasAssociatedPosts(String, usize),
    #[error("posting too frequently, retry in {0} seconds")]
    RateLimited(i64),

    #[error("db error: {0}")]
    DbError(String),

    #[error("sled db error: {0}")]
    SledError(#[from] sled::Error),

    #[error("json decode error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("yaml decode error: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("toml decode error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("pot decode error: {0}")]
    PotError(#[from] pot::Error),

    #[error("uuid error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("url parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("user with this email already exists: {0}")]
    UserWithEmailAlreadyExists(String),
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("infallible?")]
    Infallible(#[from] Infallible),
}

impl ErrorKind {
    /// Shorthand for the common "entity not found" condition.
    pub fn not_found(what: impl Display, id: impl Display) -> Self {
        Self::NotFound(format!("{} '{}'", what, id))
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Self::new(ErrorKind::Other(e))
    }
}

impl From<uuid::Error> for Error {
    fn from(e: uuid::Error) -> Self {
        Self::new(ErrorKind::UuidError(e))
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Self::new(ErrorKind::SledError(e))
    }
}

/// Transactions abort with our own error type, storage failures are wrapped.
impl From<TransactionError<Error>> for Error {
    fn from(e: TransactionError<Error>) -> Self {
        match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => e.into(),
        }
    }
}

/// Allows using `?` on our own results inside a transaction closure, aborting
/// the transaction with the error.
impl From<Error> for ConflictableTransactionError<Error> {
    fn from(e: Error) -> Self {
        ConflictableTransactionError::Abort(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorKind::JsonError(e))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Self::new(ErrorKind::YamlError(e))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::new(ErrorKind::TomlError(e))
    }
}

impl From<pot::Error> for Error {
    fn from(e: pot::Error) -> Self {
        Self::new(ErrorKind::PotError(e))
    }
}

impl From<lettre::error::Error> for Error {
    fn from(e: lettre::error::Error) -> Self {
        Self::new(ErrorKind::LettreEmailError(e))
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(e: lettre::transport::smtp::Error) -> Self {
        Self::new(ErrorKind::LettreSmtpError(e))
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::new(ErrorKind::UrlParseError(e))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Self::new(ErrorKind::ConfigError(e))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::StdIoError(e))
    }
}

impl From<Infallible> for Error {
    fn from(e: Infallible) -> Self {
        Self::new(ErrorKind::Infallible(e))
    }
}

impl From<ErrorKind> for Error {
    fn from(k: ErrorKind) -> Self {
        Self::new(k)
    }
}

/// Same as above, letting transaction closures abort with a bare kind.
impl From<ErrorKind> for ConflictableTransactionError<Error> {
    fn from(k: ErrorKind) -> Self {
        ConflictableTransactionError::Abort(k.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_in_use_message_is_readable() {
        let e: Error = ErrorKind::SlugInUse("hello-world".to_string()).into();
        assert!(e.to_string().starts_with("Slug is already in use"));
    }

    #[test]
    fn transaction_abort_unwraps_to_inner_error() {
        let inner: Error = ErrorKind::Forbidden.into();
        let e: Error = TransactionError::Abort(inner).into();
        assert!(matches!(e.kind, ErrorKind::Forbidden));
    }
}
