//! Mock driver for testing.
//!
//! Provides an instrumented in-memory backend: it counts connect attempts,
//! can be slowed down, can demand a password, can pretend the host is
//! unreachable or timing out, and hands out handles tests can close from
//! the outside.

use super::{ConnectionHandle, DatabaseConnection, Driver};
use crate::config::Credentials;
use crate::error::{ConnectionError, Result};
use async_trait::async_trait;
use std::any::Any;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock session handed out by `MockDriver`.
#[derive(Debug)]
pub struct MockConnection {
    id: u64,
    open: AtomicBool,
}

impl MockConnection {
    fn new(id: u64) -> Self {
        Self {
            id,
            open: AtomicBool::new(true),
        }
    }

    /// Sequence number of the attempt that created this session, starting at 1.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Simulates the backend dropping the session (timeout, network loss).
    pub fn invalidate(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatabaseConnection for MockConnection {
    fn backend(&self) -> &'static str {
        "mock"
    }

    async fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A driver that never touches the network.
#[derive(Debug, Default)]
pub struct MockDriver {
    attempts: AtomicU64,
    latency: Duration,
    required_password: Option<String>,
    unreachable: bool,
    timeout: bool,
    issued: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockDriver {
    /// Creates a driver that accepts any credentials immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every connect attempt by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Rejects attempts whose password differs from `password`.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.required_password = Some(password.into());
        self
    }

    /// Fails every attempt as if the host could not be reached.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Fails every attempt the way a driver reports an expired connect timeout.
    ///
    /// The error carries an `io::ErrorKind::TimedOut` cause.
    pub fn with_timeout(mut self) -> Self {
        self.timeout = true;
        self
    }

    /// Number of connect attempts made so far, failed ones included.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Sessions handed out so far, oldest first.
    pub fn issued(&self) -> Vec<Arc<MockConnection>> {
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The most recently issued session.
    pub fn last_issued(&self) -> Option<Arc<MockConnection>> {
        self.issued().pop()
    }
}

#[async_trait]
impl Driver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self, credentials: &Credentials) -> Result<ConnectionHandle> {
        let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.unreachable {
            return Err(ConnectionError::connect_failed(format!(
                "Cannot connect to {}. Host unreachable.",
                credentials.connection_string()
            )));
        }

        if self.timeout {
            return Err(ConnectionError::connect_failed(format!(
                "Connection to {} timed out.",
                credentials.display_string()
            ))
            .with_source(io::Error::new(
                io::ErrorKind::TimedOut,
                "connect timed out",
            )));
        }

        if let Some(required) = &self.required_password {
            if credentials.password() != required {
                return Err(ConnectionError::connect_failed(format!(
                    "Authentication failed for user '{}'. Check your credentials.",
                    credentials.username()
                )));
            }
        }

        let conn = Arc::new(MockConnection::new(id));
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::clone(&conn));
        Ok(conn)
    }
}
