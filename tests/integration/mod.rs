//! Integration tests for db-keeper.

pub mod sqlite_test;
