//! # Segment Reassembler
//!
//! Stages one inbound segment at a time and decides when a multi-part
//! message is complete.
//!
//! ## Two operations
//!
//! - [`SegmentReassembler::stage_segment`]: duplicate detection plus durable
//!   insert. Runs while the modem is still waiting for its acknowledgement,
//!   so it does nothing beyond the store round trips.
//! - [`SegmentReassembler::assemble`]: completeness check and in-order
//!   assembly. Runs later, from the state machine's broadcast event, and may
//!   be re-triggered any number of times until all parts are present.
//!
//! ## De-duplication
//!
//! Segment identity is the tuple (address, reference, sequence, count).
//! Staging issues two queries: an *exact* match that additionally compares
//! the receive timestamp, and, for multi-part segments only, an *inexact*
//! match on the bare tuple. An exact match on an already-delivered row is a
//! rejected duplicate. A conflicting resend (inexact match) replaces the old
//! row: last inexact match wins. That tie-break mirrors the long-standing
//! production behavior and is documented rather than certified; two sources
//! racing the same slot keep whichever segment arrived last.

use crate::domain::errors::ReassemblyError;
use crate::ports::{RowId, RowSelection, SegmentRow, SegmentStore, StoredSegment};
use shared_types::{MessageId, Segment, SmsFormat, SmsSource};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of staging one segment.
#[derive(Debug)]
pub enum StageOutcome {
    /// Segment persisted; carry this into the broadcast phase.
    Staged(StagedSegment),
    /// Exact duplicate of an already-delivered segment; drop silently.
    Duplicate,
}

/// A segment that has been persisted, together with the predicate that will
/// delete its row(s) once the owning message's fate is final.
#[derive(Clone, Debug)]
pub struct StagedSegment {
    pub segment: Segment,
    pub row_id: RowId,
    pub delete_selection: RowSelection,
}

/// Result of a completeness check.
#[derive(Debug)]
pub enum Assembly {
    /// Not all parts have arrived yet; a later segment re-triggers assembly.
    Incomplete { present: usize, expected: usize },
    /// All parts present and assembled in sequence order.
    Complete(CompleteMessage),
}

/// The logical message once every segment is present.
#[derive(Clone, Debug)]
pub struct CompleteMessage {
    /// Segment payloads ordered by sequence.
    pub pdus: Vec<Vec<u8>>,
    /// Receive timestamps aligned with `pdus`.
    pub timestamps: Vec<u64>,
    /// Destination port recovered from segment index 0, if any.
    pub dest_port: Option<u16>,
    pub format: SmsFormat,
    pub address: String,
    /// Display addresses of every part; gateways sometimes put the real
    /// sender only on the first part, so block checks scan all of them.
    pub display_addresses: Vec<String>,
    pub class0: bool,
    pub sub_id: i32,
    pub source: SmsSource,
    pub message_id: MessageId,
    pub message_count: u16,
    /// Predicate deleting this message's rows on delivery completion.
    pub delete_selection: RowSelection,
}

/// Domain service staging segments against a durable store.
pub struct SegmentReassembler<S: SegmentStore> {
    store: Arc<S>,
}

impl<S: SegmentStore> SegmentReassembler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Access to the underlying store, shared with the delivery pipeline.
    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }

    /// De-duplicate and persist one segment.
    ///
    /// `dedup` is true for plain text messages and false for injected or
    /// port-addressed traffic, which is deduplicated upstream or not at all.
    pub fn stage_segment(
        &self,
        segment: &Segment,
        dedup: bool,
    ) -> Result<StageOutcome, ReassemblyError> {
        if segment.message_count == 0 {
            return Err(ReassemblyError::InvalidMessageCount(segment.message_count));
        }

        if dedup {
            if self.check_and_handle_duplicate(segment)? {
                return Ok(StageOutcome::Duplicate);
            }
        } else {
            debug!(message_id = %segment.message_id, "stage_segment: skipped de-duping logic");
        }

        let row_id = self.store.insert(SegmentRow::from_segment(segment))?;
        debug!(
            message_id = %segment.message_id,
            row_id = row_id.0,
            "stage_segment: persisted segment"
        );

        let delete_selection = if segment.message_count == 1 {
            RowSelection::ById(row_id)
        } else {
            RowSelection::SegmentGroup {
                address: segment.address.clone(),
                reference_number: segment.reference_number,
                message_count: segment.message_count,
            }
        };

        Ok(StageOutcome::Staged(StagedSegment {
            segment: segment.clone(),
            row_id,
            delete_selection,
        }))
    }

    /// Check whether the full message is now present and assemble it.
    ///
    /// Returns `Assembly::Incomplete` until the Nth distinct segment has been
    /// staged. A row whose sequence falls outside `[0, count)` after offset
    /// correction is logged and skipped rather than aborting the assembly.
    pub fn assemble(&self, staged: &StagedSegment) -> Result<Assembly, ReassemblyError> {
        let segment = &staged.segment;
        let count = segment.message_count as usize;
        if count == 0 {
            return Err(ReassemblyError::InvalidMessageCount(segment.message_count));
        }

        if count == 1 {
            if segment.pdu.is_empty() {
                return Err(ReassemblyError::MissingPayload {
                    present: 1,
                    missing: 1,
                });
            }
            return Ok(Assembly::Complete(CompleteMessage {
                pdus: vec![segment.pdu.clone()],
                timestamps: vec![segment.timestamp],
                dest_port: segment.dest_port,
                format: segment.format,
                address: segment.address.clone(),
                display_addresses: vec![segment.display_address.clone()],
                class0: segment.class0,
                sub_id: segment.sub_id,
                source: segment.source,
                message_id: segment.message_id,
                message_count: 1,
                delete_selection: staged.delete_selection.clone(),
            }));
        }

        let group = RowSelection::SegmentGroup {
            address: segment.address.clone(),
            reference_number: segment.reference_number,
            message_count: segment.message_count,
        };
        let rows = self.store.query(&group)?;
        if rows.len() < count {
            debug!(
                message_id = %segment.message_id,
                ref_number = segment.reference_number,
                present = rows.len(),
                expected = count,
                "assemble: waiting for more segments"
            );
            return Ok(Assembly::Incomplete {
                present: rows.len(),
                expected: count,
            });
        }

        let offset = segment.index_offset() as i64;
        let mut pdus: Vec<Option<Vec<u8>>> = vec![None; count];
        let mut timestamps = vec![0u64; count];
        let mut display_addresses = Vec::with_capacity(count);
        let mut dest_port = segment.dest_port;

        for stored in &rows {
            let index = stored.row.sequence as i64 - offset;
            if index < 0 || index >= count as i64 {
                // Invalid sequence numbers from the network get stored like
                // any other row; tolerate them instead of crashing.
                error!(
                    message_id = %segment.message_id,
                    sequence = stored.row.sequence,
                    message_count = count,
                    "assemble: invalid sequence number, skipping row"
                );
                continue;
            }
            let index = index as usize;
            pdus[index] = Some(stored.row.pdu.clone());
            timestamps[index] = stored.row.timestamp;
            display_addresses.push(stored.row.display_address.clone());

            // The destination port ships on the first segment (required for
            // CDMA WAP, preferred everywhere else).
            if index == 0 {
                if let Some(port) = stored.row.dest_port {
                    dest_port = Some(port);
                }
            }
        }

        let missing = pdus.iter().filter(|pdu| pdu.is_none()).count();
        if missing > 0 {
            return Err(ReassemblyError::MissingPayload {
                present: rows.len(),
                missing,
            });
        }

        info!(
            message_id = %segment.message_id,
            ref_number = segment.reference_number,
            message_count = count,
            "assemble: all segments received"
        );

        Ok(Assembly::Complete(CompleteMessage {
            pdus: pdus.into_iter().flatten().collect(),
            timestamps,
            dest_port,
            format: segment.format,
            address: segment.address.clone(),
            display_addresses,
            class0: segment.class0,
            sub_id: segment.sub_id,
            source: segment.source,
            message_id: segment.message_id,
            message_count: segment.message_count,
            delete_selection: staged.delete_selection.clone(),
        }))
    }

    /// Scan the store for messages whose every part is present but whose
    /// delivery never completed.
    ///
    /// Runs at startup, to pick up what an earlier process run left behind,
    /// and again when credential-encrypted storage unlocks, to release the
    /// messages deferred behind the lock. A group that fails to assemble is
    /// logged and skipped so it cannot block the others.
    pub fn undelivered_messages(&self) -> Result<Vec<CompleteMessage>, ReassemblyError> {
        let rows = self.store.query(&RowSelection::AllLive)?;
        let mut groups: BTreeMap<(String, u16, u16), Vec<StoredSegment>> = BTreeMap::new();
        for stored in rows {
            let key = (
                stored.row.address.clone(),
                stored.row.reference_number,
                stored.row.message_count,
            );
            groups.entry(key).or_default().push(stored);
        }

        let mut messages = Vec::new();
        for ((address, reference_number, message_count), group) in groups {
            if group.len() < message_count as usize {
                debug!(
                    %address,
                    ref_number = reference_number,
                    present = group.len(),
                    expected = message_count,
                    "undelivered_messages: group still incomplete"
                );
                continue;
            }
            let Some(anchor) = group.iter().min_by_key(|stored| stored.row.sequence) else {
                continue;
            };
            let delete_selection = if message_count == 1 {
                RowSelection::ById(anchor.row_id)
            } else {
                RowSelection::SegmentGroup {
                    address: address.clone(),
                    reference_number,
                    message_count,
                }
            };
            let staged = StagedSegment {
                segment: anchor.row.to_segment(),
                row_id: anchor.row_id,
                delete_selection,
            };
            match self.assemble(&staged) {
                Ok(Assembly::Complete(message)) => messages.push(message),
                Ok(Assembly::Incomplete { present, expected }) => {
                    debug!(
                        %address,
                        present,
                        expected,
                        "undelivered_messages: group still incomplete"
                    );
                }
                Err(error) => {
                    error!(
                        %error,
                        %address,
                        ref_number = reference_number,
                        "undelivered_messages: failed to assemble stored group"
                    );
                }
            }
        }
        Ok(messages)
    }

    /// Detect and resolve duplicates before insert.
    ///
    /// Returns true when the incoming segment must be dropped (an exact
    /// duplicate of a row already marked delivered). Replacement cases delete
    /// the superseded row and return false so staging proceeds.
    fn check_and_handle_duplicate(&self, segment: &Segment) -> Result<bool, ReassemblyError> {
        let exact = RowSelection::ExactMatch {
            key: segment.key(),
            timestamp: segment.timestamp,
        };
        let exact_rows = self.store.query(&exact)?;
        if let Some(stored) = exact_rows.first() {
            if exact_rows.len() != 1 {
                error!(
                    message_id = %segment.message_id,
                    rows = exact_rows.len(),
                    "check_and_handle_duplicate: exact match query returned multiple rows"
                );
            }
            self.log_pdu_mismatch(stored, segment);
            if stored.row.deleted {
                // Already received and delivered; discard as duplicate.
                info!(
                    message_id = %segment.message_id,
                    "check_and_handle_duplicate: discarding duplicate segment"
                );
                return Ok(true);
            }
            // Exact match not yet delivered. Multi-part segments are handled
            // by the inexact pass below; single-part messages are replaced
            // here.
            if segment.message_count == 1 {
                self.store.delete_permanently(&exact)?;
                info!(
                    message_id = %segment.message_id,
                    "check_and_handle_duplicate: replacing duplicate message"
                );
            }
        }

        // Multi-part segments need one more check: a segment occupying the
        // same slot with a different discriminator is a conflicting resend
        // and is superseded by this arrival.
        if segment.message_count > 1 {
            let inexact = RowSelection::InexactMatch { key: segment.key() };
            let inexact_rows = self.store.query(&inexact)?;
            if !inexact_rows.is_empty() {
                if inexact_rows.len() != 1 {
                    error!(
                        message_id = %segment.message_id,
                        rows = inexact_rows.len(),
                        "check_and_handle_duplicate: inexact match query returned multiple rows"
                    );
                }
                self.store.delete_permanently(&inexact)?;
                info!(
                    message_id = %segment.message_id,
                    "check_and_handle_duplicate: replacing duplicate message segment"
                );
            }
        }

        Ok(false)
    }

    /// A duplicate whose PDU bytes differ from the stored copy is still a
    /// duplicate, but the mismatch is worth a log line.
    fn log_pdu_mismatch(&self, stored: &StoredSegment, segment: &Segment) {
        if stored.row.pdu != segment.pdu {
            warn!(
                message_id = %segment.message_id,
                old_len = stored.row.pdu.len(),
                new_len = segment.pdu.len(),
                "duplicate segment PDU differs from existing row"
            );
        }
    }
}
