//! PostgreSQL driver.
//!
//! Opens a single `PgConnection` (not a pool) using sqlx. Statements run in
//! autocommit mode unless the caller opens a transaction explicitly.

use super::{ConnectionHandle, DatabaseBackend, Driver, SqlxSession};
use crate::config::Credentials;
use crate::error::{ConnectionError, Result};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::sync::Arc;

/// sqlx-backed PostgreSQL driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDriver;

impl PostgresDriver {
    /// Builds connect options from the connection string, with the explicit
    /// username and password taking precedence over any embedded in it.
    ///
    /// A string sqlx cannot read is `DriverUnavailable`, the same as one the
    /// registry cannot resolve.
    pub fn connect_options(credentials: &Credentials) -> Result<PgConnectOptions> {
        let mut options = PgConnectOptions::from_str(credentials.connection_string()).map_err(|e| {
            ConnectionError::driver_unavailable(format!("Invalid connection string: {e}"))
                .with_source(e)
        })?;

        if !credentials.username().is_empty() {
            options = options.username(credentials.username());
        }
        if !credentials.password().is_empty() {
            options = options.password(credentials.password());
        }

        Ok(options)
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle> {
        let options = Self::connect_options(credentials)?;
        let conn = options
            .connect()
            .await
            .map_err(|e| map_connect_error(e, &options))?;

        Ok(Arc::new(SqlxSession::new(DatabaseBackend::Postgres, conn)))
    }
}

/// Maps sqlx connection errors to readable messages, keeping the original as the cause.
fn map_connect_error(error: sqlx::Error, options: &PgConnectOptions) -> ConnectionError {
    let host = options.get_host();
    let port = options.get_port();
    let user = options.get_username();
    let database = options.get_database().unwrap_or("unknown");

    let error_str = error.to_string().to_lowercase();

    let message = if error_str.contains("connection refused") || error_str.contains("could not connect") {
        format!("Cannot connect to {host}:{port}. Check that the server is running.")
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        format!("Authentication failed for user '{user}'. Check your credentials.")
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        format!("Database '{database}' does not exist.")
    } else if error_str.contains("ssl") || error_str.contains("tls") {
        "Server requires SSL. Add '?sslmode=require' to connection string.".to_string()
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        format!("Connection to {host}:{port} timed out. The server may be overloaded or unreachable.")
    } else {
        format!("Cannot connect to {host}:{port}: {error}")
    };

    ConnectionError::connect_failed(message).with_source(error)
}
