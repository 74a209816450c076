//! Outbound port (SPI) for the durable segment store.

use serde::{Deserialize, Serialize};
use shared_types::{MessageId, Segment, SegmentKey, SmsFormat, SmsSource};
use thiserror::Error;

/// Handle to one persisted row, assigned by the store on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(pub u64);

/// Errors surfaced by the segment store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store returned an unusable row handle: {0}")]
    InvalidRowHandle(String),
}

/// Values persisted for one segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRow {
    pub address: String,
    pub display_address: String,
    pub reference_number: u16,
    pub sequence: u16,
    pub message_count: u16,
    pub dest_port: Option<u16>,
    pub timestamp: u64,
    pub pdu: Vec<u8>,
    pub format: SmsFormat,
    pub class0: bool,
    pub sub_id: i32,
    pub source: SmsSource,
    pub message_id: MessageId,
    /// Soft-delete marker. Deleted rows are inert for delivery but remain
    /// visible to exact-match duplicate detection.
    pub deleted: bool,
}

impl SegmentRow {
    /// Build the row to persist for an inbound segment.
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            address: segment.address.clone(),
            display_address: segment.display_address.clone(),
            reference_number: segment.reference_number,
            sequence: segment.sequence,
            message_count: segment.message_count,
            dest_port: segment.dest_port,
            timestamp: segment.timestamp,
            pdu: segment.pdu.clone(),
            format: segment.format,
            class0: segment.class0,
            sub_id: segment.sub_id,
            source: segment.source,
            message_id: segment.message_id,
            deleted: false,
        }
    }

    /// Rebuild the in-memory segment for a stored row, used when stored
    /// messages are redispatched after a restart or a storage unlock.
    pub fn to_segment(&self) -> Segment {
        Segment {
            pdu: self.pdu.clone(),
            address: self.address.clone(),
            display_address: self.display_address.clone(),
            dest_port: self.dest_port,
            timestamp: self.timestamp,
            reference_number: self.reference_number,
            sequence: self.sequence,
            message_count: self.message_count,
            format: self.format,
            class0: self.class0,
            sub_id: self.sub_id,
            source: self.source,
            message_id: self.message_id,
        }
    }
}

/// One row as returned by a query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSegment {
    pub row_id: RowId,
    pub row: SegmentRow,
}

/// Row predicates understood by the store.
///
/// Variants differ in whether soft-deleted rows are visible:
///
/// - [`RowSelection::SegmentGroup`] and [`RowSelection::AllLive`] see only
///   live rows (completeness counts must ignore already-delivered segments);
/// - [`RowSelection::ExactMatch`] and [`RowSelection::InexactMatch`] see
///   deleted rows too (they *are* the dedup history);
/// - [`RowSelection::ById`] addresses one row regardless of marker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowSelection {
    /// A single row by store-assigned id.
    ById(RowId),
    /// Every live row. Used by the scan for undelivered messages at startup
    /// and after storage unlock.
    AllLive,
    /// All live rows of one (address, reference, count) group.
    SegmentGroup {
        address: String,
        reference_number: u16,
        message_count: u16,
    },
    /// Rows matching the full dedup key *and* the receive-timestamp
    /// discriminator: the same physical transmission seen again.
    ExactMatch { key: SegmentKey, timestamp: u64 },
    /// Rows matching the dedup key with any discriminator: a conflicting
    /// resend occupying the same slot.
    InexactMatch { key: SegmentKey },
}

/// Abstract persistent table of message segments.
///
/// Writers may treat insert-then-read-back-of-the-assigned-id as atomic.
/// Two deletion rigor levels exist: `mark_deleted` retains the row for
/// duplicate detection, `delete_permanently` removes it once the owning
/// message's fate is final.
pub trait SegmentStore: Send + Sync {
    /// Insert a row and return its assigned id.
    fn insert(&self, row: SegmentRow) -> Result<RowId, StoreError>;

    /// Return rows matching the selection, in arbitrary order. Callers sort
    /// by sequence themselves.
    fn query(&self, selection: &RowSelection) -> Result<Vec<StoredSegment>, StoreError>;

    /// Flip the deleted marker on matching rows. Returns the affected count.
    fn mark_deleted(&self, selection: &RowSelection) -> Result<usize, StoreError>;

    /// Remove matching rows outright. Returns the affected count.
    fn delete_permanently(&self, selection: &RowSelection) -> Result<usize, StoreError>;
}
