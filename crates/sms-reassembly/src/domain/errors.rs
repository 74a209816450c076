//! Error types for the reassembly subsystem.

use crate::ports::StoreError;
use thiserror::Error;

/// Reassembly errors.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    #[error("Segment store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid message count: {0}")]
    InvalidMessageCount(u16),

    #[error("Segment group has {present} live rows but {missing} payload slots are empty")]
    MissingPayload { present: usize, missing: usize },
}
