//! Append-only event store boundary.
//!
//! This module defines the contract the pipeline needs from a store (connect,
//! append, sequential read) without making any wire-format or storage
//! assumptions, plus an in-memory implementation for tests/dev.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{RawEntry, ReadFault, StoreConnection, StoreError, StreamReader};
