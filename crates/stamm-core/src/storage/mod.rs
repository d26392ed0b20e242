//! # Persistent Storage
//!
//! Disk-backed implementations of the [`Store`](crate::store::Store) contract.

mod redb_store;

pub use redb_store::RedbStore;
