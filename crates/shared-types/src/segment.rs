//! # Segment Entities
//!
//! Defines the fundamental data structures for inbound SMS handling.
//!
//! ## Entities
//!
//! - [`Segment`]: one physical SMS unit as received from the modem
//! - [`SegmentKey`]: the de-duplication identity tuple
//! - [`SmsFormat`]: 3GPP vs 3GPP2 format tag
//! - [`SmsSource`]: where the segment entered the stack

use crate::counters::MessageId;
use serde::{Deserialize, Serialize};

/// Well-known destination port for WAP push messages.
pub const WAP_PUSH_PORT: u16 = 2948;

/// Radio technology family the PDU was encoded with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SmsFormat {
    /// GSM/UMTS/LTE ("3gpp").
    Gpp3,
    /// CDMA ("3gpp2").
    Gpp3_2,
}

impl SmsFormat {
    /// Returns the wire tag used by upper layers.
    pub fn as_str(&self) -> &'static str {
        match self {
            SmsFormat::Gpp3 => "3gpp",
            SmsFormat::Gpp3_2 => "3gpp2",
        }
    }
}

/// How the segment entered the telephony stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmsSource {
    /// Delivered by the modem over the radio.
    NotInjected,
    /// Injected by an IMS stack.
    InjectedFromIms,
    /// Injected by an unknown local caller.
    InjectedFromUnknown,
}

/// De-duplication identity of a segment.
///
/// Two segments are the *same* segment iff all four fields match. This is the
/// only identity used for duplicate suppression; PDU bytes are deliberately
/// excluded (a duplicate with differing bytes is logged but still a duplicate).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    /// Originating address as received from the network.
    pub address: String,
    /// Concatenation reference number.
    pub reference_number: u16,
    /// Sequence number of this segment within the message.
    pub sequence: u16,
    /// Total number of segments in the message.
    pub message_count: u16,
}

/// One physical SMS unit as received from the modem or an injection request.
///
/// A multi-part message is split across several segments sharing the same
/// (address, reference number, count) group. Single-part messages carry
/// `message_count == 1` and `sequence == 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Raw protocol data unit bytes.
    pub pdu: Vec<u8>,
    /// Originating address used for reassembly grouping.
    pub address: String,
    /// Display originating address (may differ behind SMS gateways).
    pub display_address: String,
    /// Destination port, or `None` for plain text messages.
    pub dest_port: Option<u16>,
    /// Receive timestamp in milliseconds since the epoch.
    pub timestamp: u64,
    /// Concatenation reference number.
    pub reference_number: u16,
    /// Sequence number within the message (see [`Segment::index_offset`]).
    pub sequence: u16,
    /// Total number of segments in the message.
    pub message_count: u16,
    /// Encoding family of the PDU.
    pub format: SmsFormat,
    /// Class-0 (flash) message flag.
    pub class0: bool,
    /// Subscription the segment arrived on.
    pub sub_id: i32,
    /// How the segment entered the stack.
    pub source: SmsSource,
    /// Cross-stack message id assigned at creation.
    pub message_id: MessageId,
}

impl Segment {
    /// Returns the de-duplication key for this segment.
    pub fn key(&self) -> SegmentKey {
        SegmentKey {
            address: self.address.clone(),
            reference_number: self.reference_number,
            sequence: self.sequence,
            message_count: self.message_count,
        }
    }

    /// True if this segment is part of a multi-part message.
    pub fn is_multi_part(&self) -> bool {
        self.message_count > 1
    }

    /// True if the message is addressed to a port (data SMS) rather than
    /// being plain text.
    pub fn is_data(&self) -> bool {
        self.dest_port.is_some()
    }

    /// True if the segment belongs to a WAP push message.
    pub fn is_wap_push(&self) -> bool {
        self.dest_port == Some(WAP_PUSH_PORT)
    }

    /// Offset subtracted from `sequence` to obtain a 0-based array index.
    ///
    /// Concatenated segments number their parts starting at 1, except for
    /// CDMA WAP push segments which start at 0.
    pub fn index_offset(&self) -> u16 {
        if self.format == SmsFormat::Gpp3_2 && self.is_wap_push() {
            0
        } else {
            1
        }
    }
}
