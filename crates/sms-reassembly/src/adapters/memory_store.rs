//! In-memory implementation of the segment store for tests and
//! single-process runs.

use crate::ports::{RowId, RowSelection, SegmentRow, SegmentStore, StoreError, StoredSegment};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory `SegmentStore` backed by a row vector.
pub struct InMemorySegmentStore {
    rows: RwLock<Vec<StoredSegment>>,
    next_row_id: AtomicU64,
}

impl InMemorySegmentStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            next_row_id: AtomicU64::new(1),
        }
    }

    /// Total rows currently held, deleted markers included.
    pub fn row_count(&self) -> usize {
        self.rows.read().len()
    }

    fn matches(stored: &StoredSegment, selection: &RowSelection) -> bool {
        let row = &stored.row;
        match selection {
            RowSelection::ById(id) => stored.row_id == *id,
            RowSelection::AllLive => !row.deleted,
            RowSelection::SegmentGroup {
                address,
                reference_number,
                message_count,
            } => {
                !row.deleted
                    && row.address == *address
                    && row.reference_number == *reference_number
                    && row.message_count == *message_count
            }
            RowSelection::ExactMatch { key, timestamp } => {
                row.address == key.address
                    && row.reference_number == key.reference_number
                    && row.sequence == key.sequence
                    && row.message_count == key.message_count
                    && row.timestamp == *timestamp
            }
            RowSelection::InexactMatch { key } => {
                row.address == key.address
                    && row.reference_number == key.reference_number
                    && row.sequence == key.sequence
                    && row.message_count == key.message_count
            }
        }
    }
}

impl Default for InMemorySegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentStore for InMemorySegmentStore {
    fn insert(&self, row: SegmentRow) -> Result<RowId, StoreError> {
        let row_id = RowId(self.next_row_id.fetch_add(1, Ordering::Relaxed));
        self.rows.write().push(StoredSegment { row_id, row });
        Ok(row_id)
    }

    fn query(&self, selection: &RowSelection) -> Result<Vec<StoredSegment>, StoreError> {
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|stored| Self::matches(stored, selection))
            .cloned()
            .collect())
    }

    fn mark_deleted(&self, selection: &RowSelection) -> Result<usize, StoreError> {
        let mut rows = self.rows.write();
        let mut affected = 0;
        for stored in rows.iter_mut() {
            if Self::matches(stored, selection) && !stored.row.deleted {
                stored.row.deleted = true;
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete_permanently(&self, selection: &RowSelection) -> Result<usize, StoreError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|stored| !Self::matches(stored, selection));
        Ok(before - rows.len())
    }
}
