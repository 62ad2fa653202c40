//! Storage adapters implementing the repository ports.

pub mod in_memory;

#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
