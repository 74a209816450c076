//! # Process-Wide Counters
//!
//! Two identifier services live here:
//!
//! - [`ReferenceCounter`]: the concatenation reference-number counter used
//!   when splitting outbound messages. Wraps around mod 256 and is seeded
//!   with a random value at process start so that references do not collide
//!   across restarts.
//! - [`MessageIdAllocator`]: monotonically assigns the cross-stack message id
//!   attached to every inbound message for log correlation.

use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cross-stack message id, unique within a process lifetime.
///
/// The id travels with a message through every subsystem and appears in all
/// structured log lines about it, so a single grep follows one message across
/// the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Monotonic allocator for [`MessageId`]s.
///
/// Seeded randomly at construction so ids from different boots of the process
/// are unlikely to collide in aggregated logs.
pub struct MessageIdAllocator {
    next: AtomicU64,
}

impl MessageIdAllocator {
    /// Create an allocator with a random starting point.
    pub fn new() -> Self {
        let seed: u64 = rand::thread_rng().gen();
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// Create an allocator starting from a fixed seed (tests).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            next: AtomicU64::new(seed),
        }
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> MessageId {
        MessageId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MessageIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenation reference-number counter.
///
/// Values are assigned sequentially and wrap around mod 256. The counter is
/// initialized with a non-deterministic seed exactly once at process start:
/// a restart mid-conversation must not reuse the reference numbers of
/// messages still being reassembled by the receiving side.
pub struct ReferenceCounter {
    current: Mutex<u8>,
}

impl ReferenceCounter {
    /// Create a counter with a random seed.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(rand::thread_rng().gen()),
        }
    }

    /// Create a counter with a fixed seed (tests).
    pub fn with_seed(seed: u8) -> Self {
        Self {
            current: Mutex::new(seed),
        }
    }

    /// Return the next reference number, wrapping mod 256.
    pub fn next_reference(&self) -> u8 {
        let mut current = self.current.lock();
        *current = current.wrapping_add(1);
        *current
    }
}

impl Default for ReferenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
