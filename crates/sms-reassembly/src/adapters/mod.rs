//! Port adapters for the reassembly subsystem.

pub mod memory_store;

pub use memory_store::InMemorySegmentStore;
