//! # HAL Version Model
//!
//! Canonical result type plus per-version payload decoders.
//!
//! Instead of one near-duplicate response method per HAL revision, a single
//! decoder function per revision translates whatever the modem returned into
//! [`CanonicalResponse`]. The function is selected once at bind time and
//! carried by the dispatcher until the modem disconnects.

use crate::errors::TransactionError;
use crate::request::RequestKind;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Radio HAL revisions the broker can bind to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HalVersion {
    V1_5,
    V1_6,
    V2_0,
}

impl HalVersion {
    /// The next-older revision, if one exists.
    pub fn predecessor(&self) -> Option<HalVersion> {
        match self {
            HalVersion::V1_5 => None,
            HalVersion::V1_6 => Some(HalVersion::V1_5),
            HalVersion::V2_0 => Some(HalVersion::V1_6),
        }
    }

    /// The fallback revision for a rejected request kind, if the kind still
    /// exists there.
    pub fn fallback_for(&self, kind: RequestKind) -> Option<HalVersion> {
        self.predecessor().filter(|older| *older >= kind.min_version())
    }
}

/// Error codes reported by the modem alongside a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioError {
    None,
    RadioNotAvailable,
    RequestNotSupported,
    SmsSendFailRetry,
    NoMemory,
    SystemErr,
    InternalErr,
    InvalidArguments,
}

/// HAL-version-specific response payload as received off the wire.
///
/// Old revisions report the acknowledgement PDU as a hex string and always
/// carry an error-code slot; the current revision uses raw bytes and an
/// optional code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawPayload {
    /// No payload beyond the error field.
    Empty,
    /// 1.x send-SMS result.
    LegacySendSmsResult {
        message_ref: i32,
        ack_pdu_hex: Option<String>,
        error_code: i32,
    },
    /// 2.0 send-SMS result.
    SendSmsResult {
        message_ref: i32,
        ack_pdu: Option<Vec<u8>>,
        error_code: Option<i32>,
    },
    /// Service-center address string.
    SmscAddress(String),
}

/// Canonical result delivered to completion callers, independent of the HAL
/// revision that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanonicalResponse {
    /// Request completed with no interesting payload.
    Done,
    SmsSent {
        message_ref: i32,
        ack_pdu: Option<Vec<u8>>,
        error_code: Option<i32>,
    },
    SmscAddress(String),
}

/// Decoder function translating one raw payload into a canonical result.
pub type ResponseDecoder =
    fn(RequestKind, RawPayload) -> Result<CanonicalResponse, TransactionError>;

/// The decoder bound for one HAL revision.
#[derive(Clone, Copy)]
pub struct DecoderTable {
    pub version: HalVersion,
    decode: ResponseDecoder,
}

impl DecoderTable {
    /// Select the decoder for a revision. Called once at modem-connect time.
    pub fn for_version(version: HalVersion) -> Self {
        let decode: ResponseDecoder = match version {
            HalVersion::V1_5 | HalVersion::V1_6 => decode_legacy,
            HalVersion::V2_0 => decode_current,
        };
        Self { version, decode }
    }

    pub fn decode(
        &self,
        kind: RequestKind,
        payload: RawPayload,
    ) -> Result<CanonicalResponse, TransactionError> {
        (self.decode)(kind, payload)
    }
}

fn decode_legacy(
    kind: RequestKind,
    payload: RawPayload,
) -> Result<CanonicalResponse, TransactionError> {
    match payload {
        RawPayload::Empty => Ok(CanonicalResponse::Done),
        RawPayload::LegacySendSmsResult {
            message_ref,
            ack_pdu_hex,
            error_code,
        } => {
            let ack_pdu = match ack_pdu_hex {
                Some(hex) => Some(decode_hex(&hex).map_err(|detail| {
                    TransactionError::Decode { kind, detail }
                })?),
                None => None,
            };
            Ok(CanonicalResponse::SmsSent {
                message_ref,
                ack_pdu,
                // Legacy HALs report -1 for "no error code".
                error_code: (error_code >= 0).then_some(error_code),
            })
        }
        RawPayload::SmscAddress(address) => Ok(CanonicalResponse::SmscAddress(address)),
        other => {
            warn!(?kind, payload = ?other, "legacy decoder: unexpected payload shape");
            Err(TransactionError::Decode {
                kind,
                detail: "payload not understood by legacy decoder".to_string(),
            })
        }
    }
}

fn decode_current(
    kind: RequestKind,
    payload: RawPayload,
) -> Result<CanonicalResponse, TransactionError> {
    match payload {
        RawPayload::Empty => Ok(CanonicalResponse::Done),
        RawPayload::SendSmsResult {
            message_ref,
            ack_pdu,
            error_code,
        } => Ok(CanonicalResponse::SmsSent {
            message_ref,
            ack_pdu,
            error_code,
        }),
        RawPayload::SmscAddress(address) => Ok(CanonicalResponse::SmscAddress(address)),
        other => {
            warn!(?kind, payload = ?other, "current decoder: unexpected payload shape");
            Err(TransactionError::Decode {
                kind,
                detail: "payload not understood by current decoder".to_string(),
            })
        }
    }
}

fn decode_hex(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err(format!("odd-length hex string ({} chars)", hex.len()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("bad hex at offset {}: {}", i, e))
        })
        .collect()
}
