//! # Shared Types Crate
//!
//! This crate contains the domain entities shared by every broker subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: all cross-subsystem types are defined here.
//! - **Dedup identity is the tuple**: segment identity for de-duplication is
//!   exactly (address, reference number, sequence, total count) and is
//!   carried by [`SegmentKey`], never raw PDU bytes.
//! - **Counters are explicit services**: the concatenation reference counter
//!   and the cross-stack message-id allocator are process-wide objects with
//!   documented wraparound semantics, not globals.

pub mod ack;
pub mod counters;
pub mod segment;

pub use ack::AckResult;
pub use counters::{MessageId, MessageIdAllocator, ReferenceCounter};
pub use segment::{Segment, SegmentKey, SmsFormat, SmsSource, WAP_PUSH_PORT};
