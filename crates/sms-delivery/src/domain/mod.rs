//! Domain logic for the delivery pipeline.

pub mod errors;
pub mod filters;
pub mod pipeline;
pub mod receipt;

pub use errors::DeliveryError;
pub use filters::{
    CarrierServicesFilter, FilterContext, MissedCallFilter, SmsFilter, VisualVoicemailFilter,
};
pub use pipeline::{DeliveryOutcome, DeliveryPipeline, DropReason};
pub use receipt::{DeliveryReceipt, ReceiptId, RECEIVER_TIMEOUT};
