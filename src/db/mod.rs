//! Driver layer for db-keeper.
//!
//! A `Driver` turns `Credentials` into a live `DatabaseConnection`. Drivers are
//! looked up by the connection string's scheme through a `DriverRegistry`.

mod mock;
mod postgres;
mod session;
mod sqlite;

pub use mock::{MockConnection, MockDriver};
pub use postgres::PostgresDriver;
pub use session::SqlxSession;
pub use sqlite::SqliteDriver;

use crate::config::Credentials;
use crate::error::{ConnectionError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a live backend session.
pub type ConnectionHandle = Arc<dyn DatabaseConnection>;

/// Backends registered by `DriverRegistry::with_defaults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Returns the backend as a string for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    /// Returns every URL scheme this backend answers to.
    pub fn url_schemes(&self) -> &'static [&'static str] {
        match self {
            Self::Postgres => &["postgres", "postgresql"],
            Self::Sqlite => &["sqlite"],
        }
    }

    /// Returns the sqlx-backed driver for this backend.
    pub fn driver(&self) -> Arc<dyn Driver> {
        match self {
            Self::Postgres => Arc::new(PostgresDriver),
            Self::Sqlite => Arc::new(SqliteDriver),
        }
    }
}

/// An open, externally closable session with a backend.
#[async_trait]
pub trait DatabaseConnection: Send + Sync + 'static {
    /// Name of the backend serving this session.
    fn backend(&self) -> &'static str;

    /// Confirms the session is still usable right now.
    ///
    /// Must not fail: a broken session simply reports `false`.
    async fn is_open(&self) -> bool;

    /// Closes the session. Closing twice is a no-op.
    async fn close(&self);

    /// Exposes the concrete session type so callers can run queries on it.
    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

/// Opens backend sessions.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Short driver name for logs.
    fn name(&self) -> &'static str;

    /// Opens a new autocommit session using the given credentials.
    ///
    /// Failures are reported as `ConnectFailed`.
    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle>;
}

/// Maps connection-string schemes to drivers.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the PostgreSQL and SQLite drivers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for backend in [DatabaseBackend::Postgres, DatabaseBackend::Sqlite] {
            let driver = backend.driver();
            for scheme in backend.url_schemes() {
                registry.register(*scheme, Arc::clone(&driver));
            }
        }
        registry
    }

    /// Registers a driver for a scheme, replacing any previous one.
    pub fn register(&mut self, scheme: impl Into<String>, driver: Arc<dyn Driver>) {
        self.drivers
            .insert(scheme.into().to_ascii_lowercase(), driver);
    }

    /// Builder-style `register`.
    pub fn with_driver(mut self, scheme: impl Into<String>, driver: Arc<dyn Driver>) -> Self {
        self.register(scheme, driver);
        self
    }

    /// Returns the registered schemes in sorted order.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Finds the driver for the credentials' connection string.
    pub fn resolve(&self, credentials: &Credentials) -> Result<Arc<dyn Driver>> {
        let scheme = credentials.scheme().ok_or_else(|| {
            ConnectionError::driver_unavailable(format!(
                "Malformed connection string for {}",
                credentials.display_string()
            ))
        })?;

        self.drivers.get(&scheme).cloned().ok_or_else(|| {
            ConnectionError::driver_unavailable(format!(
                "No driver registered for scheme '{scheme}'"
            ))
        })
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}
