//! db-keeper - a lazily established, self-healing database connection.
//!
//! Callers depend on [`ConnectionManager`]; [`ManagedConnectionProvider`] is
//! the implementation that caches one connection, re-validates it on every
//! access and reconnects when the backend has dropped it.

pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;

pub use config::Credentials;
pub use connection::{ConnectionManager, ManagedConnectionProvider, ManagerState};
pub use db::{ConnectionHandle, DatabaseConnection, Driver, DriverRegistry};
pub use error::{AppError, AppErrorKind, ConnectionError, ConnectionErrorKind, Result};
pub use logging::{Logger, TracingLogger};
