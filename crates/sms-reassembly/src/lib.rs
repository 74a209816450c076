//! # SMS Reassembly Subsystem
//!
//! Stages inbound segments into the durable segment store, suppresses
//! duplicates, and reassembles multi-part messages once all parts are
//! present.
//!
//! ## Architecture
//!
//! The subsystem exposes one domain service, [`SegmentReassembler`], built on
//! one outbound port, [`ports::SegmentStore`]. The store is an abstract
//! durable key-row table; cross-process consistency is its responsibility,
//! not ours. An in-memory adapter suitable for tests and single-node runs
//! lives in [`adapters`].
//!
//! ## Durability Contract
//!
//! A segment is persisted *before* the modem is acknowledged. If the process
//! crashes before delivery completes, the rows survive and are reconciled at
//! the next startup. Rows are only ever mutated by flipping their deleted
//! marker; permanent deletion happens once a message's fate is final.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::InMemorySegmentStore;
pub use domain::{
    Assembly, CompleteMessage, ReassemblyError, SegmentReassembler, StageOutcome, StagedSegment,
};
pub use ports::{RowId, RowSelection, SegmentRow, SegmentStore, StoreError, StoredSegment};
