//! Error types for the delivery subsystem.

use sms_reassembly::StoreError;
use thiserror::Error;

/// Delivery errors.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Segment store error: {0}")]
    Store(#[from] StoreError),

    #[error("Broadcast gateway rejected the intent: {0}")]
    Gateway(String),
}
