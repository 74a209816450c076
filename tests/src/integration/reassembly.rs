//! Reassembly flows across staging, completeness, and dedup history.

#[cfg(test)]
mod tests {
    use crate::support::segment;
    use shared_types::Segment;
    use sms_reassembly::{
        Assembly, CompleteMessage, InMemorySegmentStore, SegmentReassembler, SegmentStore,
        StageOutcome, StagedSegment,
    };
    use std::sync::Arc;

    fn reassembler() -> SegmentReassembler<InMemorySegmentStore> {
        SegmentReassembler::new(Arc::new(InMemorySegmentStore::new()))
    }

    fn stage(
        r: &SegmentReassembler<InMemorySegmentStore>,
        seg: &Segment,
    ) -> StagedSegment {
        match r.stage_segment(seg, true).unwrap() {
            StageOutcome::Staged(staged) => staged,
            StageOutcome::Duplicate => panic!("unexpected duplicate for seq {}", seg.sequence),
        }
    }

    /// Stage and assemble, asserting completion happens on the last arrival
    /// and only then.
    fn run_order(order: &[u16]) -> CompleteMessage {
        let r = reassembler();
        let count = order.len() as u16;
        let mut complete = None;
        for (arrival, &seq) in order.iter().enumerate() {
            let staged = stage(&r, &segment("555", 42, seq, count));
            match r.assemble(&staged).unwrap() {
                Assembly::Incomplete { present, expected } => {
                    assert_eq!(present, arrival + 1, "order {order:?}");
                    assert_eq!(expected, order.len(), "order {order:?}");
                    assert!(arrival + 1 < order.len(), "order {order:?} never completed");
                }
                Assembly::Complete(msg) => {
                    assert_eq!(arrival + 1, order.len(), "order {order:?} completed early");
                    complete = Some(msg);
                }
            }
        }
        complete.unwrap()
    }

    #[test]
    fn test_three_part_message_completes_on_last_arrival_in_every_order() {
        const ORDERS: [[u16; 3]; 6] = [
            [1, 2, 3],
            [1, 3, 2],
            [2, 1, 3],
            [2, 3, 1],
            [3, 1, 2],
            [3, 2, 1],
        ];
        for order in ORDERS {
            let msg = run_order(&order);
            // Payloads come out in sequence order no matter the arrival order.
            assert_eq!(
                msg.pdus,
                vec![vec![1u8, 0xAA], vec![2u8, 0xAA], vec![3u8, 0xAA]],
                "order {order:?}"
            );
            assert_eq!(msg.message_count, 3);
        }
    }

    #[test]
    fn test_duplicate_mid_stream_does_not_inflate_the_part_count() {
        let r = reassembler();
        let store = r.store();

        stage(&r, &segment("555", 42, 1, 2));
        // Same slot resent before delivery: replaces, never adds.
        let staged = stage(&r, &segment("555", 42, 1, 2));
        match r.assemble(&staged).unwrap() {
            Assembly::Incomplete { present, expected } => {
                assert_eq!(present, 1);
                assert_eq!(expected, 2);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
        assert_eq!(store.row_count(), 1);

        let staged = stage(&r, &segment("555", 42, 2, 2));
        assert!(matches!(
            r.assemble(&staged).unwrap(),
            Assembly::Complete(_)
        ));
    }

    #[test]
    fn test_resubmission_after_delivery_is_rejected_without_new_rows() {
        let r = reassembler();
        let store = r.store();

        stage(&r, &segment("555", 42, 1, 2));
        let staged = stage(&r, &segment("555", 42, 2, 2));
        let msg = match r.assemble(&staged).unwrap() {
            Assembly::Complete(msg) => msg,
            other => panic!("expected complete, got {other:?}"),
        };

        // Delivery finished: rows stay behind as dedup history.
        store.mark_deleted(&msg.delete_selection).unwrap();

        for seq in [1, 2] {
            match r.stage_segment(&segment("555", 42, seq, 2), true).unwrap() {
                StageOutcome::Duplicate => {}
                other => panic!("expected duplicate for seq {seq}, got {other:?}"),
            }
        }
        assert_eq!(store.row_count(), 2);
    }

    #[test]
    fn test_interleaved_senders_complete_independently() {
        let r = reassembler();

        stage(&r, &segment("111", 7, 1, 2));
        stage(&r, &segment("222", 7, 1, 2));

        // Same reference number, different sender: no cross-talk.
        let staged = stage(&r, &segment("111", 7, 2, 2));
        let msg = match r.assemble(&staged).unwrap() {
            Assembly::Complete(msg) => msg,
            other => panic!("expected complete, got {other:?}"),
        };
        assert_eq!(msg.address, "111");
        assert_eq!(msg.pdus.len(), 2);

        let staged = stage(&r, &segment("222", 7, 2, 2));
        let msg = match r.assemble(&staged).unwrap() {
            Assembly::Complete(msg) => msg,
            other => panic!("expected complete, got {other:?}"),
        };
        assert_eq!(msg.address, "222");
    }
}
