//! Liveness lease: keeps the hosting process awake while inbound work is
//! outstanding.

use parking_lot::Mutex;

/// Reference-counted stand-in for a wake lock.
///
/// The state machine acquires once when it leaves `Idle` and once at
/// construction (covering `Startup`); each `Idle` entry schedules exactly
/// one delayed release, so the count drains to zero only when the machine
/// has been idle for the grace period.
pub struct WakeLease {
    count: Mutex<u32>,
}

impl WakeLease {
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
        }
    }

    /// Increment and return the new count.
    pub fn acquire(&self) -> u32 {
        let mut count = self.count.lock();
        *count += 1;
        *count
    }

    /// Decrement and return the new count. Saturates at zero; the caller
    /// decides whether an early zero is an invariant violation.
    pub fn release(&self) -> u32 {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        *count
    }

    pub fn held(&self) -> bool {
        *self.count.lock() > 0
    }
}

impl Default for WakeLease {
    fn default() -> Self {
        Self::new()
    }
}
