//! Request identity and argument types.

use crate::hal::HalVersion;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serial number of one outstanding modem request.
///
/// Unique at any instant: a serial becomes reusable only after its pending
/// completion has been removed from the transaction table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Serial(pub u32);

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Logical request kinds the broker issues to the modem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Acknowledge the last inbound SMS delivered by the modem.
    AcknowledgeLastIncomingSms,
    /// Send an outbound SMS PDU.
    SendSms,
    /// Query the service-center address.
    GetSmscAddress,
    /// Update the service-center address.
    SetSmscAddress,
    /// Report whether device memory can accept more messages.
    ReportSmsMemoryStatus,
}

impl RequestKind {
    /// Oldest HAL revision that understands this request.
    ///
    /// A "not supported" rejection can fall back to an older calling
    /// convention only while the predecessor revision still carries the
    /// request.
    pub fn min_version(&self) -> HalVersion {
        match self {
            RequestKind::AcknowledgeLastIncomingSms
            | RequestKind::SendSms
            | RequestKind::GetSmscAddress
            | RequestKind::SetSmscAddress => HalVersion::V1_5,
            RequestKind::ReportSmsMemoryStatus => HalVersion::V1_6,
        }
    }
}

/// Original arguments of a request, retained for fallback retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestArgs {
    AcknowledgeLastIncomingSms {
        success: bool,
        /// Failure cause forwarded to the network when `success` is false.
        cause: u32,
    },
    SendSms {
        smsc: Option<String>,
        pdu: Vec<u8>,
    },
    GetSmscAddress,
    SetSmscAddress {
        address: String,
    },
    ReportSmsMemoryStatus {
        available: bool,
    },
}

impl RequestArgs {
    pub fn kind(&self) -> RequestKind {
        match self {
            RequestArgs::AcknowledgeLastIncomingSms { .. } => {
                RequestKind::AcknowledgeLastIncomingSms
            }
            RequestArgs::SendSms { .. } => RequestKind::SendSms,
            RequestArgs::GetSmscAddress => RequestKind::GetSmscAddress,
            RequestArgs::SetSmscAddress { .. } => RequestKind::SetSmscAddress,
            RequestArgs::ReportSmsMemoryStatus { .. } => RequestKind::ReportSmsMemoryStatus,
        }
    }
}
