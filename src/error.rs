//! Error types for db-keeper.
//!
//! `ConnectionError` is the only error surfaced by the connection layer.
//! `AppError` is the tagged error used by the surrounding application for
//! lookups, registrations and logins.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Shared, cloneable root cause attached to a `ConnectionError`.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Why a connection could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionErrorKind {
    /// No driver is registered for the connection string, or it failed to initialize.
    DriverUnavailable,
    /// The backend refused or never answered (bad credentials, unreachable host, timeout).
    ConnectFailed,
}

impl ConnectionErrorKind {
    /// Returns the kind as a string for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriverUnavailable => "driver unavailable",
            Self::ConnectFailed => "connect failed",
        }
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to obtain a live connection.
///
/// Cloneable so one failed attempt can be handed to every caller that was
/// waiting on it.
#[derive(Error, Debug, Clone)]
#[error("Connection error ({kind}): {message}")]
pub struct ConnectionError {
    kind: ConnectionErrorKind,
    message: String,
    #[source]
    source: Option<Cause>,
}

impl ConnectionError {
    /// Creates a driver-unavailable error with the given message.
    pub fn driver_unavailable(msg: impl Into<String>) -> Self {
        Self {
            kind: ConnectionErrorKind::DriverUnavailable,
            message: msg.into(),
            source: None,
        }
    }

    /// Creates a connect-failed error with the given message.
    pub fn connect_failed(msg: impl Into<String>) -> Self {
        Self {
            kind: ConnectionErrorKind::ConnectFailed,
            message: msg.into(),
            source: None,
        }
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Attaches an already shared cause.
    pub fn with_shared_source(mut self, source: Cause) -> Self {
        self.source = Some(source);
        self
    }

    pub fn kind(&self) -> ConnectionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the root cause, if one was recorded.
    pub fn cause(&self) -> Option<&Cause> {
        self.source.as_ref()
    }
}

/// Result type alias using ConnectionError.
pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Discriminant for application-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppErrorKind {
    /// A requested record does not exist.
    NotFound,
    /// A new record could not be registered.
    RegistrationFailed,
    /// Supplied credentials were rejected.
    AuthenticationFailed,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::RegistrationFailed => "registration failed",
            Self::AuthenticationFailed => "authentication failed",
        };
        f.write_str(s)
    }
}

/// Tagged application error with an optional cause.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl AppError {
    pub fn new(kind: AppErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
            source: None,
        }
    }

    /// Creates a not-found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(AppErrorKind::NotFound, msg)
    }

    /// Creates a registration error with the given message.
    pub fn registration_failed(msg: impl Into<String>) -> Self {
        Self::new(AppErrorKind::RegistrationFailed, msg)
    }

    /// Creates an authentication error with the given message.
    pub fn authentication_failed(msg: impl Into<String>) -> Self {
        Self::new(AppErrorKind::AuthenticationFailed, msg)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self.kind {
            AppErrorKind::NotFound => "Not Found",
            AppErrorKind::RegistrationFailed => "Registration Error",
            AppErrorKind::AuthenticationFailed => "Authentication Error",
        }
    }
}
