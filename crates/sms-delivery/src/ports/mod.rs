//! Outbound ports (SPI) for the delivery subsystem.

use crate::domain::{DeliveryError, ReceiptId};
use serde::{Deserialize, Serialize};
use shared_types::{MessageId, SmsFormat};
use sms_reassembly::CompleteMessage;

/// Identity of an installed application receiver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppId(pub String);

/// The broadcast payload handed to the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryIntent {
    /// Plain text message: delivered to the default handling app only (or
    /// unrestricted when no default exists).
    Deliver {
        target: Option<AppId>,
        pdus: Vec<Vec<u8>>,
        format: SmsFormat,
        class0: bool,
        sub_id: i32,
        message_id: MessageId,
    },
    /// Port-addressed data message: delivered by well-known local
    /// pseudo-URI without app restriction.
    DataReceived {
        uri: String,
        port: u16,
        pdus: Vec<Vec<u8>>,
        format: SmsFormat,
        sub_id: i32,
        message_id: MessageId,
    },
}

/// Ordered broadcast transmission.
///
/// The gateway delivers the intent to the system-user instance with a
/// completion callback (routed back as a broadcast-complete event carrying
/// `receipt_id`) and fire-and-forget copies to all other running,
/// non-restricted user instances. Never blocks for the acknowledgement.
pub trait BroadcastGateway: Send + Sync {
    fn send_ordered(
        &self,
        receipt_id: ReceiptId,
        intent: DeliveryIntent,
    ) -> Result<(), DeliveryError>;
}

/// Sender block-list lookup.
pub trait BlockChecker: Send + Sync {
    fn is_blocked(&self, display_address: &str) -> bool;
}

/// Resolves the default SMS handling application.
pub trait DefaultAppResolver: Send + Sync {
    fn default_sms_app(&self) -> Option<AppId>;
}

/// Probes for credential-encrypted storage state.
pub trait StorageLockProbe: Send + Sync {
    /// True once the user has unlocked credential-encrypted storage.
    fn is_user_unlocked(&self) -> bool;
    /// True while the device is running from encrypted-only storage
    /// (pre-decryption boot); inbound SMS is rejected outright then.
    fn is_encrypted_only_boot(&self) -> bool;
}

/// New-message notification shown when delivery is deferred behind the lock.
pub trait NotificationSink: Send + Sync {
    fn show_new_message_notification(&self);
}

/// Verdict returned by the carrier service round trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CarrierVerdict {
    /// Keep the message and continue normal processing.
    KeepAndDeliver,
    /// Drop the message; the carrier consumed or rejected it.
    Drop,
}

/// Continuation invoked by the carrier adapter once its verdict is known.
pub type CarrierVerdictFn = Box<dyn FnOnce(CarrierVerdict) + Send>;

/// Asynchronous carrier-app SMS filter.
///
/// `filter` returns true when the carrier service took ownership; the
/// verdict callback must then be invoked exactly once, possibly much later
/// and from another task. Returning false means no carrier app is bound.
pub trait CarrierSmsFilterService: Send + Sync {
    fn filter(&self, message: &CompleteMessage, verdict: CarrierVerdictFn) -> bool;
}

/// Detects visual-voicemail system messages (consumed internally, never
/// shown to the user).
pub trait VoicemailSmsMatcher: Send + Sync {
    fn matches(&self, message: &CompleteMessage) -> bool;
}

/// Detects carrier missed-call notification messages.
pub trait MissedCallSmsMatcher: Send + Sync {
    fn matches(&self, message: &CompleteMessage) -> bool;
}

/// Event path back into the owning state machine's mailbox.
///
/// Filters that consume a message synchronously still complete the
/// outstanding receipt through this sink, so receipt accounting stays
/// uniform whether or not a real broadcast went out.
pub trait CompletionSink: Send + Sync {
    /// `delivered` is false when the receipt resolved without the message
    /// reaching any receiver (delivery deferred behind the storage lock);
    /// the rows must then stay live for a later redispatch.
    fn broadcast_complete(&self, receipt_id: ReceiptId, delivered: bool);
}
