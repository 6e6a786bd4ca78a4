//! Lazily connecting provider of a single cached connection.
//!
//! The cached handle lives in a `Slot` behind an async mutex. Every
//! `acquire_connection` re-checks the handle under that mutex, and at most one
//! connect attempt runs at a time: callers arriving while it is in flight share
//! its outcome. Attempts run on their own task, so dropping every waiting
//! caller does not cancel them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use super::manager::{ConnectionManager, ManagerState};
use crate::config::Credentials;
use crate::db::{ConnectionHandle, DriverRegistry};
use crate::error::{ConnectionError, Result};
use crate::logging::Logger;

type PendingConnect = Shared<BoxFuture<'static, Result<ConnectionHandle>>>;

enum Slot {
    Unconnected,
    Connecting {
        attempt: u64,
        pending: PendingConnect,
    },
    Connected(ConnectionHandle),
}

struct Inner {
    credentials: Credentials,
    logger: Arc<dyn Logger>,
    registry: DriverRegistry,
    slot: Mutex<Slot>,
    attempts: AtomicU64,
}

/// Owns one lazily created connection and recreates it after invalidation.
///
/// Cheap to share behind an `Arc`; all callers receive the same handle.
pub struct ManagedConnectionProvider {
    inner: Arc<Inner>,
}

impl ManagedConnectionProvider {
    /// Creates a provider using the PostgreSQL and SQLite drivers.
    pub fn new(credentials: Credentials, logger: Arc<dyn Logger>) -> Self {
        Self::with_registry(credentials, logger, DriverRegistry::with_defaults())
    }

    /// Creates a provider that resolves drivers from `registry`.
    pub fn with_registry(
        credentials: Credentials,
        logger: Arc<dyn Logger>,
        registry: DriverRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                credentials,
                logger,
                registry,
                slot: Mutex::new(Slot::Unconnected),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a provider from separate credential parts and the default drivers.
    pub fn from_parts(
        username: impl Into<String>,
        password: impl Into<String>,
        connection_string: impl Into<String>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::new(
            Credentials::new(username, password, connection_string),
            logger,
        )
    }

    /// The credentials every connect attempt uses.
    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    /// Number of connect attempts issued so far, failed ones included.
    pub fn connect_attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Observes the current lifecycle state.
    ///
    /// Runs the same open-check as `acquire_connection`, so a handle closed
    /// behind our back is reported (and forgotten) as `Unconnected`.
    pub async fn state(&self) -> ManagerState {
        let mut slot = self.inner.slot.lock().await;
        if self.inner.cached_open_handle(&mut slot).await.is_some() {
            return ManagerState::Connected;
        }
        match &*slot {
            Slot::Connecting { .. } => ManagerState::Connecting,
            _ => ManagerState::Unconnected,
        }
    }

    /// Closes and forgets the cached handle.
    ///
    /// The next `acquire_connection` reconnects. An attempt already in flight
    /// is left alone.
    pub async fn close(&self) {
        let mut slot = self.inner.slot.lock().await;
        if let Slot::Connected(handle) = &*slot {
            handle.close().await;
            *slot = Slot::Unconnected;
            self.inner.logger.debug("Closed cached connection");
        }
    }

    /// Single conversion point from a failure to an unavailable report.
    fn report_unavailable(&self, error: &ConnectionError) {
        self.inner.logger.error(
            &format!(
                "Database unavailable ({}) for {}",
                error.kind(),
                self.inner.credentials.display_string()
            ),
            error,
        );
    }
}

impl Inner {
    /// Returns the cached handle if it is still open; forgets it otherwise.
    async fn cached_open_handle(&self, slot: &mut Slot) -> Option<ConnectionHandle> {
        let Slot::Connected(handle) = slot else {
            return None;
        };
        if handle.is_open().await {
            return Some(Arc::clone(handle));
        }
        self.logger
            .debug("Cached connection was closed externally; reconnecting on demand");
        *slot = Slot::Unconnected;
        None
    }

    /// Spawns a connect attempt and marks the slot as connecting.
    fn begin_attempt(self: &Arc<Self>, slot: &mut Slot) -> PendingConnect {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let worker = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = worker.open_session().await;
            worker.settle(attempt, &result).await;
            result
        });

        let owner: Weak<Self> = Arc::downgrade(self);
        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    let err = ConnectionError::connect_failed("Connection attempt did not complete")
                        .with_source(e);
                    let failed = Err(err);
                    if let Some(inner) = owner.upgrade() {
                        inner.settle(attempt, &failed).await;
                    }
                    failed
                }
            }
        }
        .boxed()
        .shared();

        *slot = Slot::Connecting {
            attempt,
            pending: pending.clone(),
        };
        pending
    }

    async fn open_session(&self) -> Result<ConnectionHandle> {
        let driver = self.registry.resolve(&self.credentials)?;

        let started = Instant::now();
        let result = driver.connect(&self.credentials).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(_) => self.logger.debug(&format!(
                "Opened {} session for {} in {elapsed:?}",
                driver.name(),
                self.credentials.display_string()
            )),
            Err(_) => self.logger.debug(&format!(
                "{} connect attempt for {} failed after {elapsed:?}",
                driver.name(),
                self.credentials.display_string()
            )),
        }

        result
    }

    /// Records the outcome of `attempt` unless the slot has moved on.
    async fn settle(&self, attempt: u64, result: &Result<ConnectionHandle>) {
        let mut slot = self.slot.lock().await;
        let current = matches!(&*slot, Slot::Connecting { attempt: a, .. } if *a == attempt);
        if current {
            *slot = match result {
                Ok(handle) => Slot::Connected(Arc::clone(handle)),
                Err(_) => Slot::Unconnected,
            };
        }
    }
}

#[async_trait]
impl ConnectionManager for ManagedConnectionProvider {
    async fn acquire_connection(&self) -> Result<ConnectionHandle> {
        let pending = {
            let mut slot = self.inner.slot.lock().await;
            if let Some(handle) = self.inner.cached_open_handle(&mut slot).await {
                return Ok(handle);
            }

            let in_flight = match &*slot {
                Slot::Connecting { pending, .. } => Some(pending.clone()),
                _ => None,
            };
            match in_flight {
                Some(pending) => pending,
                None => self.inner.begin_attempt(&mut slot),
            }
        };

        pending.await
    }

    async fn is_available(&self) -> bool {
        match self.acquire_connection().await {
            Ok(_) => true,
            Err(e) => {
                self.report_unavailable(&e);
                false
            }
        }
    }
}

impl fmt::Debug for ManagedConnectionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnectionProvider")
            .field("credentials", &self.inner.credentials)
            .field("registry", &self.inner.registry)
            .field("connect_attempts", &self.connect_attempts())
            .finish()
    }
}
