//! The connection capability callers depend on.

use std::fmt;

use async_trait::async_trait;

use crate::db::ConnectionHandle;
use crate::error::Result;

/// Hands out a live database connection without exposing how it is made.
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// Returns a handle that was confirmed open at the moment of return.
    ///
    /// May open a new session and replace the cached one. Fails with a
    /// `ConnectionError` when no driver matches the connection string or the
    /// backend refuses or cannot be reached.
    async fn acquire_connection(&self) -> Result<ConnectionHandle>;

    /// Reports whether a connection can be obtained right now.
    ///
    /// Never fails; failures are logged and reported as `false`.
    async fn is_available(&self) -> bool;
}

/// Observed lifecycle of a managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No cached handle, or the cached one has been closed.
    Unconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The cached handle answered its open-check.
    Connected,
}

impl fmt::Display for ManagerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconnected => "unconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}
