//! Error types for the transaction subsystem.

use crate::hal::RadioError;
use crate::request::RequestKind;
use thiserror::Error;

/// Typed failures delivered to pending completions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Radio not available")]
    RadioNotAvailable,

    #[error("Request not supported and no fallback exists")]
    RequestNotSupported,

    #[error("Radio error: {0:?}")]
    Radio(RadioError),

    #[error("Failed to decode {kind:?} response: {detail}")]
    Decode { kind: RequestKind, detail: String },

    #[error("Modem transport rejected the request: {0}")]
    Transport(String),
}
