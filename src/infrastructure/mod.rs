//! Adapters for the domain ports: terminal registries, session stores, and
//! the HTTP gateway transport.

pub mod http;
pub mod in_memory;
pub mod retry;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
pub mod sqlite;
