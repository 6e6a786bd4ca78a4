//! Connection management for db-keeper.
//!
//! Exposes the `ConnectionManager` capability and the provider that lazily
//! creates, re-validates and replaces a single cached connection.

pub mod manager;
pub mod provider;

pub use manager::{ConnectionManager, ManagerState};
pub use provider::ManagedConnectionProvider;
