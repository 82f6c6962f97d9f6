//! In-memory storage module
//!
//! Provides the core data structures for storing key-value pairs in memory.
//! This module is independent of protocol and command handling (loose coupling).

mod entry;
mod memory;

pub use entry::{now_millis, StoredValue};
pub use memory::KeyValueStore;
