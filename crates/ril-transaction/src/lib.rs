//! # RIL Transaction Subsystem
//!
//! Correlates asynchronous modem responses to outstanding requests.
//!
//! ## Architecture
//!
//! Every outbound request is assigned a serial number and recorded in the
//! [`TransactionTable`] *before* transmission. The [`ResponseDispatcher`]
//! consumes response events keyed by serial, removes the pending entry
//! (making the serial reusable), decodes the HAL-version-specific payload
//! into a canonical result, and resolves the caller's completion.
//!
//! ## HAL-version skew
//!
//! The decoder function for each payload family is selected once, when the
//! modem connects at a given HAL revision. A "not supported" error on a
//! request whose kind exists in an older revision is converted into a
//! transparent reissue using the older calling convention: the original
//! caller observes the fallback's result, never the rejection. This is what
//! lets the rest of the stack treat "send X to the modem" as one async call
//! regardless of which HAL is underneath.
//!
//! ## Concurrency
//!
//! Arbitrarily many completions may be outstanding at once; the table scales
//! with modem concurrency and is not serialized behind the inbound state
//! machine.

pub mod dispatcher;
pub mod errors;
pub mod hal;
pub mod ports;
pub mod request;
pub mod table;

pub use dispatcher::ResponseDispatcher;
pub use errors::TransactionError;
pub use hal::{CanonicalResponse, DecoderTable, HalVersion, RadioError, RawPayload};
pub use ports::ModemPort;
pub use request::{RequestArgs, RequestKind, Serial};
pub use table::{CompletionReceiver, PendingCompletion, TransactionTable};
