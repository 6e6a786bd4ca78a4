//! A single sqlx connection exposed as a `DatabaseConnection`.

use super::{DatabaseBackend, DatabaseConnection};
use async_trait::async_trait;
use sqlx::Connection;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::debug;

/// One sqlx connection behind an async mutex.
///
/// The connection is dropped once it is closed or a ping fails, after which
/// `is_open` stays `false`. Neither `is_open` nor `close` waits for a caller
/// that is holding the connection through `session()`.
pub struct SqlxSession<C> {
    backend: DatabaseBackend,
    inner: Mutex<Option<C>>,
    closed: AtomicBool,
}

impl<C> SqlxSession<C>
where
    C: Connection + 'static,
{
    pub fn new(backend: DatabaseBackend, conn: C) -> Self {
        Self {
            backend,
            inner: Mutex::new(Some(conn)),
            closed: AtomicBool::new(false),
        }
    }

    /// Borrows the live sqlx connection, or `None` once the session is closed.
    ///
    /// Other `session()` callers wait while the guard is held.
    pub async fn session(&self) -> Option<MappedMutexGuard<'_, C>> {
        let mut guard = self.inner.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            // close() ran while the connection was lent out.
            if let Some(conn) = guard.take() {
                self.shutdown(conn).await;
            }
            return None;
        }
        MutexGuard::try_map(guard, Option::as_mut).ok()
    }

    async fn shutdown(&self, conn: C) {
        if let Err(e) = conn.close().await {
            debug!("{} session did not close cleanly: {e}", self.backend.as_str());
        }
    }
}

#[async_trait]
impl<C> DatabaseConnection for SqlxSession<C>
where
    C: Connection + 'static,
{
    fn backend(&self) -> &'static str {
        self.backend.as_str()
    }

    async fn is_open(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        // A connection lent out through session() is in active use; count it as open.
        let Ok(mut guard) = self.inner.try_lock() else {
            return true;
        };
        let Some(conn) = guard.as_mut() else {
            return false;
        };

        let pinged = conn.ping().await;
        match pinged {
            Ok(()) => true,
            Err(e) => {
                debug!("{} session failed ping: {e}", self.backend.as_str());
                self.closed.store(true, Ordering::SeqCst);
                *guard = None;
                false
            }
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);

        let conn = match self.inner.try_lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => {
                debug!(
                    "{} session is in use; it closes once released",
                    self.backend.as_str()
                );
                return;
            }
        };
        if let Some(conn) = conn {
            self.shutdown(conn).await;
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<C> std::fmt::Debug for SqlxSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxSession")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
