//! Shared utilities for BlackBox
//!
//! This package provides general-purpose building blocks used across the workspace:
//! - Namespaced key/value storage contract used to persist configuration
//! - In-memory and file-backed store implementations

pub mod storage;

pub use storage::{
    FileStore, KeyValueStore, MemoryStore, Namespace, StorageError, StorageResult, StoredValue,
};
