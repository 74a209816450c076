//! Event taxonomy for the inbound state machine mailbox.

use shared_types::{AckResult, Segment};
use sms_delivery::ReceiptId;
use sms_reassembly::CompleteMessage;
use std::fmt;

/// Completion callback for an injected segment. Invoked exactly once with
/// the final disposition; injection results bypass the modem ack path.
pub type InjectCallback = Box<dyn FnOnce(AckResult) + Send>;

/// One unit of work for the inbound state machine.
pub enum InboundEvent {
    /// A new segment arrived from the modem. `None` marks a decode failure
    /// upstream; it is acknowledged as a null message.
    NewSegment { segment: Option<Segment> },
    /// A segment injected by an upper layer (IMS or local). The disposition
    /// is reported through the callback instead of the modem ack.
    InjectSegment {
        segment: Option<Segment>,
        callback: InjectCallback,
    },
    /// Deliver an already-reassembled message, used when redispatching
    /// stored messages (e.g. after storage unlock) and when a completed
    /// message had to wait for an earlier receipt to resolve.
    BroadcastMessage { message: CompleteMessage },
    /// The ordered broadcast identified by `receipt_id` finished.
    /// `synthetic` marks a timeout-generated completion. `delivered` is
    /// false when the receipt resolved without the message reaching any
    /// receiver (delivery deferred behind the storage lock); the rows then
    /// stay live for the next redispatch scan.
    BroadcastComplete {
        receipt_id: ReceiptId,
        synthetic: bool,
        delivered: bool,
    },
    /// Scan the store for complete but undelivered messages and rebroadcast
    /// them. Posted at startup and when credential-encrypted storage
    /// unlocks.
    RedispatchStored,
    /// Delivery work for the current message is done; go back to `Idle`.
    ReturnToIdle,
    /// Delayed decrement of the liveness lease, scheduled on `Idle` entry.
    ReleaseWakeLease,
    /// Historical undelivered messages are reconciled; leave `Startup`.
    StartAccepting,
    /// The active subscription changed.
    UpdateSubscription { sub_id: i32 },
    /// No receiver confirmation arrived within the timeout window.
    ReceiverTimeout { receipt_id: ReceiptId },
}

impl InboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InboundEvent::NewSegment { .. } => "NewSegment",
            InboundEvent::InjectSegment { .. } => "InjectSegment",
            InboundEvent::BroadcastMessage { .. } => "BroadcastMessage",
            InboundEvent::BroadcastComplete { .. } => "BroadcastComplete",
            InboundEvent::RedispatchStored => "RedispatchStored",
            InboundEvent::ReturnToIdle => "ReturnToIdle",
            InboundEvent::ReleaseWakeLease => "ReleaseWakeLease",
            InboundEvent::StartAccepting => "StartAccepting",
            InboundEvent::UpdateSubscription { .. } => "UpdateSubscription",
            InboundEvent::ReceiverTimeout { .. } => "ReceiverTimeout",
        }
    }
}

impl fmt::Debug for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // InjectSegment carries a callback, so Debug is by name only.
        f.write_str(self.name())
    }
}
