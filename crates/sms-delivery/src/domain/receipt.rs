//! Delivery receipt tracking for in-flight ordered broadcasts.

use sms_reassembly::RowSelection;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Synthetic-completion deadline for a missing receiver acknowledgement.
///
/// If no confirmation arrives within this window the state machine fakes
/// one, guaranteeing forward progress even when a downstream app never
/// replies. Late real replies afterwards are tolerated as no-ops.
pub const RECEIVER_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Identity of one in-flight ordered broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks one in-flight ordered broadcast.
///
/// At most one receipt is outstanding per state-machine instance; a newly
/// completed message waits for the previous receipt to resolve.
#[derive(Clone, Debug)]
pub struct DeliveryReceipt {
    pub id: ReceiptId,
    /// When the broadcast was issued.
    pub issued_at: Instant,
    /// Predicate applied to the segment rows on completion.
    pub delete_selection: RowSelection,
}

impl DeliveryReceipt {
    pub fn new(delete_selection: RowSelection) -> Self {
        Self {
            id: ReceiptId::new(),
            issued_at: Instant::now(),
            delete_selection,
        }
    }
}
