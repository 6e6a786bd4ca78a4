//! SQLite driver.
//!
//! SQLite has no authentication; the username and password are ignored.

use super::{ConnectionHandle, DatabaseBackend, Driver, SqlxSession};
use crate::config::Credentials;
use crate::error::{ConnectionError, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::ConnectOptions;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// sqlx-backed SQLite driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteDriver;

#[async_trait]
impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle> {
        let options = SqliteConnectOptions::from_str(credentials.connection_string()).map_err(|e| {
            ConnectionError::driver_unavailable(format!("Invalid connection string: {e}"))
                .with_source(e)
        })?;

        if !credentials.username().is_empty() {
            debug!("SQLite ignores the configured username");
        }

        let conn = options.connect().await.map_err(|e| {
            ConnectionError::connect_failed(format!(
                "Cannot open SQLite database {}: {e}",
                options.get_filename().display()
            ))
            .with_source(e)
        })?;

        Ok(Arc::new(SqlxSession::new(DatabaseBackend::Sqlite, conn)))
    }
}
