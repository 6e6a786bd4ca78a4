//! SQLite integration tests.
//!
//! Uses real on-disk databases in temporary directories.

use std::sync::Arc;
use std::time::Duration;

use db_keeper::db::SqlxSession;
use db_keeper::logging::{LogLevel, MemoryLogger};
use db_keeper::{ConnectionErrorKind, ConnectionManager, ManagedConnectionProvider, ManagerState};
use sqlx::sqlite::SqliteConnection;
use tempfile::TempDir;

/// Helper to create a provider for a fresh database file.
fn file_provider(dir: &TempDir) -> (ManagedConnectionProvider, Arc<MemoryLogger>) {
    let path = dir.path().join("admin.db");
    let logger = Arc::new(MemoryLogger::new());
    let provider = ManagedConnectionProvider::from_parts(
        "",
        "",
        format!("sqlite://{}?mode=rwc", path.display()),
        logger.clone(),
    );
    (provider, logger)
}

#[tokio::test]
async fn test_acquire_and_query() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, logger) = file_provider(&dir);

    let handle = provider.acquire_connection().await.unwrap();
    assert_eq!(handle.backend(), "sqlite");

    let session = handle
        .as_any()
        .downcast_ref::<SqlxSession<SqliteConnection>>()
        .expect("sqlite handle");
    {
        let mut conn = session.session().await.unwrap();
        sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO users (name) VALUES ('ada')")
            .execute(&mut *conn)
            .await
            .unwrap();
    }

    // Autocommit: a second handle after reconnecting sees the row.
    provider.close().await;
    let handle = provider.acquire_connection().await.unwrap();
    let session = handle
        .as_any()
        .downcast_ref::<SqlxSession<SqliteConnection>>()
        .unwrap();
    let mut conn = session.session().await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(count, 1);

    assert_eq!(provider.connect_attempts(), 2);
    assert!(logger
        .entries_at(LogLevel::Debug)
        .iter()
        .any(|e| e.message.starts_with("Opened sqlite session")));
}

#[tokio::test]
async fn test_handle_closed_externally_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let (provider, _) = file_provider(&dir);

    let first = provider.acquire_connection().await.unwrap();
    first.close().await;
    assert_eq!(provider.state().await, ManagerState::Unconnected);

    let second = provider.acquire_connection().await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.is_open().await);
    assert_eq!(provider.connect_attempts(), 2);
}

#[tokio::test]
async fn test_missing_database_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent").join("admin.db");
    let logger = Arc::new(MemoryLogger::new());
    let provider = ManagedConnectionProvider::from_parts(
        "",
        "",
        format!("sqlite://{}", path.display()),
        logger.clone(),
    );

    let err = provider.acquire_connection().await.unwrap_err();
    assert_eq!(err.kind(), ConnectionErrorKind::ConnectFailed);

    assert!(!provider.is_available().await);
    assert_eq!(logger.entries_at(LogLevel::Error).len(), 1);
    assert_eq!(provider.state().await, ManagerState::Unconnected);
}

#[tokio::test]
async fn test_in_memory_database() {
    let logger = Arc::new(MemoryLogger::new());
    let provider = ManagedConnectionProvider::from_parts("", "", "sqlite::memory:", logger);

    assert!(provider.is_available().await);
    assert_eq!(provider.state().await, ManagerState::Connected);
    assert_eq!(provider.connect_attempts(), 1);
}

#[tokio::test]
async fn test_availability_while_session_is_borrowed() {
    let logger = Arc::new(MemoryLogger::new());
    let provider = ManagedConnectionProvider::from_parts("", "", "sqlite::memory:", logger.clone());

    let handle = provider.acquire_connection().await.unwrap();
    let session = handle
        .as_any()
        .downcast_ref::<SqlxSession<SqliteConnection>>()
        .unwrap();
    let _conn = session.session().await.unwrap();

    let available = tokio::time::timeout(Duration::from_secs(2), provider.is_available()).await;
    assert_eq!(available.ok(), Some(true));

    let again = tokio::time::timeout(Duration::from_secs(2), provider.acquire_connection())
        .await
        .expect("acquire must not wait for the borrower")
        .unwrap();
    assert!(Arc::ptr_eq(&handle, &again));
    assert_eq!(provider.state().await, ManagerState::Connected);
    assert_eq!(provider.connect_attempts(), 1);
    assert!(logger.entries_at(LogLevel::Error).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_borrower_task_does_not_block_other_callers() {
    let logger = Arc::new(MemoryLogger::new());
    let provider = Arc::new(ManagedConnectionProvider::from_parts(
        "",
        "",
        "sqlite::memory:",
        logger,
    ));
    let handle = provider.acquire_connection().await.unwrap();

    let (borrowed_tx, borrowed_rx) = tokio::sync::oneshot::channel();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let borrower = tokio::spawn(async move {
        let session = handle
            .as_any()
            .downcast_ref::<SqlxSession<SqliteConnection>>()
            .unwrap();
        let mut conn = session.session().await.unwrap();
        borrowed_tx.send(()).unwrap();
        let _ = release_rx.await;
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&mut *conn)
            .await
            .unwrap()
    });

    borrowed_rx.await.unwrap();
    let checker = Arc::clone(&provider);
    let available = tokio::time::timeout(
        Duration::from_secs(2),
        tokio::spawn(async move { checker.is_available().await }),
    )
    .await
    .expect("is_available must not wait for the borrower")
    .unwrap();
    assert!(available);

    release_tx.send(()).unwrap();
    assert_eq!(borrower.await.unwrap(), 1);
    assert_eq!(provider.connect_attempts(), 1);
}

#[tokio::test]
async fn test_unreadable_options_are_driver_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("admin.db");
    let logger = Arc::new(MemoryLogger::new());
    let provider = ManagedConnectionProvider::from_parts(
        "",
        "",
        format!("sqlite://{}?mode=sideways", path.display()),
        logger.clone(),
    );

    let err = provider.acquire_connection().await.unwrap_err();
    assert_eq!(err.kind(), ConnectionErrorKind::DriverUnavailable);

    assert!(!provider.is_available().await);
    let errors = logger.entries_at(LogLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("driver unavailable"));
}
