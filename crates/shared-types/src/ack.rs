//! Acknowledgement result taxonomy returned to the modem and to injectors.

use serde::{Deserialize, Serialize};

/// Final disposition of one inbound segment or segment group.
///
/// Exactly one of these is reported per inbound message via the
/// acknowledgement callback. `Duplicated` is reported to the modem as a
/// success (the message *was* handled, just earlier).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckResult {
    /// Message accepted and staged (or already fully delivered).
    Handled,
    /// Exact duplicate of an already-delivered segment.
    Duplicated,
    /// The durable segment store rejected a read or write.
    DatabaseError,
    /// The store accepted the insert but returned an unusable row handle.
    InvalidUri,
    /// Decoding or dispatch threw before the segment could be staged.
    DispatchFailure,
    /// The segment carried no PDU bytes.
    NullPdu,
    /// The decoded message was absent (parse failure upstream).
    NullMessage,
    /// Rejected because the device is running from encrypted-only storage.
    ReceivedWhileEncrypted,
}

impl AckResult {
    /// Whether the modem should be told the message was handled successfully.
    ///
    /// Duplicates are acknowledged as success: the original copy was already
    /// accepted and retrying would only produce another duplicate.
    pub fn is_success(&self) -> bool {
        matches!(self, AckResult::Handled | AckResult::Duplicated)
    }
}
