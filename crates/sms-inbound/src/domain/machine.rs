//! The inbound state machine.
//!
//! States form a line: `Startup → Idle → Delivering → Waiting`, with
//! `Waiting` nested under `Delivering` (events it does not handle fall
//! through to the `Delivering` handler). There is no terminal state; the
//! machine runs for the lifetime of the telephony process.

use crate::domain::wake::WakeLease;
use crate::events::InboundEvent;
use crate::ports::{ModemAck, Scheduler};
use shared_types::{AckResult, Segment, SmsSource};
use sms_delivery::{
    DeliveryOutcome, DeliveryPipeline, DeliveryReceipt, ReceiptId, StorageLockProbe,
    RECEIVER_TIMEOUT,
};
use sms_reassembly::{
    Assembly, CompleteMessage, ReassemblyError, SegmentReassembler, SegmentStore, StageOutcome,
    StoreError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Grace period before the liveness lease is decremented after entering
/// `Idle`, giving downstream receivers time to acquire their own lease.
pub const LEASE_RELEASE_DELAY: Duration = Duration::from_secs(3);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InboundState {
    /// Defers all message work until historical undelivered messages have
    /// been reconciled from the store.
    Startup,
    /// Nothing in flight; holds no liveness lease.
    Idle,
    /// Actively processing one inbound message.
    Delivering,
    /// An ordered broadcast is out; waiting for its receipt to resolve.
    Waiting,
}

/// Top-level coordinator for inbound SMS.
///
/// Single-threaded: the owner pumps events into [`handle`] one at a time.
/// Handlers never block; follow-up work is posted back into the internal
/// queue and deferred events replay after the next state transition.
///
/// [`handle`]: InboundStateMachine::handle
pub struct InboundStateMachine<S: SegmentStore> {
    state: InboundState,
    reassembler: SegmentReassembler<S>,
    store: Arc<S>,
    pipeline: Arc<DeliveryPipeline>,
    lease: Arc<WakeLease>,
    scheduler: Arc<dyn Scheduler>,
    modem_ack: Arc<dyn ModemAck>,
    lock_probe: Arc<dyn StorageLockProbe>,
    receipt: Option<DeliveryReceipt>,
    /// Self-posted events, processed before control returns to the pump.
    queue: VecDeque<InboundEvent>,
    /// Events deferred for replay after the next state transition.
    deferred: Vec<InboundEvent>,
    sub_id: i32,
}

impl<S: SegmentStore> InboundStateMachine<S> {
    pub fn new(
        reassembler: SegmentReassembler<S>,
        pipeline: Arc<DeliveryPipeline>,
        lease: Arc<WakeLease>,
        scheduler: Arc<dyn Scheduler>,
        modem_ack: Arc<dyn ModemAck>,
        lock_probe: Arc<dyn StorageLockProbe>,
        sub_id: i32,
    ) -> Self {
        // Held through Startup; the first Idle entry schedules its release.
        lease.acquire();
        let store = reassembler.store();
        Self {
            state: InboundState::Startup,
            reassembler,
            store,
            pipeline,
            lease,
            scheduler,
            modem_ack,
            lock_probe,
            receipt: None,
            queue: VecDeque::new(),
            deferred: Vec::new(),
            sub_id,
        }
    }

    pub fn state(&self) -> InboundState {
        self.state
    }

    pub fn sub_id(&self) -> i32 {
        self.sub_id
    }

    /// Process one mailbox event and everything it posts transitively.
    pub fn handle(&mut self, event: InboundEvent) {
        self.queue.push_back(event);
        while let Some(next) = self.queue.pop_front() {
            self.dispatch(next);
        }
    }

    fn dispatch(&mut self, event: InboundEvent) {
        debug!(state = ?self.state, event = event.name(), "Dispatching event");
        match self.state {
            InboundState::Startup => self.on_startup(event),
            InboundState::Idle => self.on_idle(event),
            InboundState::Delivering => self.on_delivering(event),
            InboundState::Waiting => self.on_waiting(event),
        }
    }

    fn post(&mut self, event: InboundEvent) {
        self.queue.push_back(event);
    }

    fn defer(&mut self, event: InboundEvent) {
        debug!(state = ?self.state, event = event.name(), "Deferring event");
        self.deferred.push(event);
    }

    fn transition_to(&mut self, next: InboundState) {
        debug!(from = ?self.state, to = ?next, "State transition");
        if self.state == InboundState::Idle {
            self.lease.acquire();
        }
        self.state = next;
        if next == InboundState::Idle {
            self.scheduler
                .schedule(LEASE_RELEASE_DELAY, InboundEvent::ReleaseWakeLease);
        }
        // Deferred events replay ahead of anything already queued, in their
        // original arrival order.
        for event in self.deferred.drain(..).rev() {
            self.queue.push_front(event);
        }
    }

    fn on_startup(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::StartAccepting => self.transition_to(InboundState::Idle),
            InboundEvent::NewSegment { .. }
            | InboundEvent::InjectSegment { .. }
            | InboundEvent::BroadcastMessage { .. }
            | InboundEvent::BroadcastComplete { .. }
            | InboundEvent::RedispatchStored => self.defer(event),
            other => self.default_handler(other),
        }
    }

    fn on_idle(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::NewSegment { .. }
            | InboundEvent::InjectSegment { .. }
            | InboundEvent::BroadcastMessage { .. }
            | InboundEvent::RedispatchStored => {
                self.defer(event);
                self.transition_to(InboundState::Delivering);
            }
            InboundEvent::ReturnToIdle => {}
            InboundEvent::BroadcastComplete { receipt_id, .. } => {
                // Late confirmation after a synthetic timeout completion.
                warn!(?receipt_id, "Ignoring broadcast completion while idle");
            }
            InboundEvent::ReceiverTimeout { receipt_id } => {
                debug!(?receipt_id, "Ignoring stale receiver timeout while idle");
            }
            other => self.default_handler(other),
        }
    }

    fn on_delivering(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::NewSegment { segment } => {
                self.check_lease();
                let result = self.handle_new_segment(segment);
                self.modem_ack.acknowledge(result);
                // Waiting swallows this when a broadcast went out.
                self.post(InboundEvent::ReturnToIdle);
            }
            InboundEvent::InjectSegment { segment, callback } => {
                self.check_lease();
                let result = self.handle_inject_segment(segment);
                callback(result);
                self.post(InboundEvent::ReturnToIdle);
            }
            InboundEvent::BroadcastMessage { message } => {
                self.check_lease();
                self.dispatch_complete(message);
                self.post(InboundEvent::ReturnToIdle);
            }
            InboundEvent::RedispatchStored => {
                self.check_lease();
                self.redispatch_stored();
                self.post(InboundEvent::ReturnToIdle);
            }
            InboundEvent::ReturnToIdle => self.transition_to(InboundState::Idle),
            InboundEvent::BroadcastComplete { receipt_id, .. } => {
                warn!(?receipt_id, "Broadcast completion with no receipt outstanding");
            }
            InboundEvent::ReceiverTimeout { receipt_id } => {
                debug!(?receipt_id, "Ignoring stale receiver timeout while delivering");
            }
            other => self.default_handler(other),
        }
    }

    fn on_waiting(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::BroadcastMessage { .. } => self.defer(event),
            InboundEvent::ReturnToIdle => {
                // Still waiting for the receipt; the completion handler
                // re-posts this once it resolves.
            }
            InboundEvent::BroadcastComplete {
                receipt_id,
                synthetic,
                delivered,
            } => self.handle_broadcast_complete(receipt_id, synthetic, delivered),
            InboundEvent::ReceiverTimeout { receipt_id } => {
                match &self.receipt {
                    Some(receipt) if receipt.id == receipt_id => {
                        warn!(
                            ?receipt_id,
                            "No receiver confirmation within timeout, synthesizing completion"
                        );
                        self.post(InboundEvent::BroadcastComplete {
                            receipt_id,
                            synthetic: true,
                            delivered: true,
                        });
                    }
                    _ => debug!(?receipt_id, "Ignoring stale receiver timeout"),
                }
            }
            other => self.on_delivering(other),
        }
    }

    fn default_handler(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ReleaseWakeLease => {
                let remaining = self.lease.release();
                if remaining == 0
                    && matches!(
                        self.state,
                        InboundState::Delivering | InboundState::Waiting
                    )
                {
                    error!(state = ?self.state, "Liveness lease drained while still delivering");
                    debug_assert!(false, "liveness lease drained while still delivering");
                }
            }
            InboundEvent::UpdateSubscription { sub_id } => {
                info!(old = self.sub_id, new = sub_id, "Subscription updated");
                self.sub_id = sub_id;
            }
            other => {
                // Loud crash in development, logged no-op in production.
                error!(state = ?self.state, event = other.name(), "Unhandled event");
                debug_assert!(
                    false,
                    "unhandled event {} in state {:?}",
                    other.name(),
                    self.state
                );
            }
        }
    }

    fn check_lease(&self) {
        if !self.lease.held() {
            error!(state = ?self.state, "Processing message without liveness lease");
            debug_assert!(false, "processing message without liveness lease");
        }
    }

    fn handle_new_segment(&mut self, segment: Option<Segment>) -> AckResult {
        let Some(segment) = segment else {
            error!("New SMS event carried no message");
            return AckResult::NullMessage;
        };
        if segment.pdu.is_empty() {
            error!(message_id = %segment.message_id, "Segment carried no PDU bytes");
            return AckResult::NullPdu;
        }
        if self.lock_probe.is_encrypted_only_boot() {
            warn!(
                message_id = %segment.message_id,
                "Rejecting SMS received while running from encrypted-only storage"
            );
            return AckResult::ReceivedWhileEncrypted;
        }
        // Plain text messages are de-duplicated against the store; injected
        // and port-addressed traffic is deduplicated upstream or not at all.
        let dedup = !segment.is_data() && segment.source == SmsSource::NotInjected;
        self.process_segment(segment, dedup)
    }

    fn handle_inject_segment(&mut self, segment: Option<Segment>) -> AckResult {
        let Some(segment) = segment else {
            error!("Injected SMS carried no PDU");
            return AckResult::NullPdu;
        };
        info!(message_id = %segment.message_id, source = ?segment.source, "Processing injected SMS");
        self.process_segment(segment, false)
    }

    /// Stage, assemble, and (when complete) dispatch one segment. The
    /// returned result is the per-segment acknowledgement; a completed
    /// message's broadcast outcome is tracked separately via the receipt.
    fn process_segment(&mut self, segment: Segment, dedup: bool) -> AckResult {
        let staged = match self.reassembler.stage_segment(&segment, dedup) {
            Ok(StageOutcome::Duplicate) => {
                info!(message_id = %segment.message_id, "Dropping duplicate segment");
                return AckResult::Duplicated;
            }
            Ok(StageOutcome::Staged(staged)) => staged,
            Err(error) => {
                error!(message_id = %segment.message_id, %error, "Failed to stage segment");
                return ack_for_error(&error);
            }
        };

        match self.reassembler.assemble(&staged) {
            Ok(Assembly::Complete(message)) => self.dispatch_complete(message),
            Ok(Assembly::Incomplete { present, expected }) => {
                debug!(
                    message_id = %segment.message_id,
                    present,
                    expected,
                    "Message not yet complete"
                );
            }
            Err(error) => {
                // The segment is persisted; assembly retries on the next
                // arrival for this group.
                error!(message_id = %segment.message_id, %error, "Assembly failed");
            }
        }
        AckResult::Handled
    }

    /// Hand a complete message to the delivery pipeline, or park it until
    /// the outstanding receipt resolves.
    fn dispatch_complete(&mut self, message: CompleteMessage) {
        if self.receipt.is_some() {
            debug!(
                message_id = %message.message_id,
                "Receipt outstanding, deferring broadcast"
            );
            self.defer(InboundEvent::BroadcastMessage { message });
            return;
        }
        let message_id = message.message_id;
        match self.pipeline.deliver(message) {
            Ok(DeliveryOutcome::Sent(receipt)) => {
                self.scheduler.schedule(
                    RECEIVER_TIMEOUT,
                    InboundEvent::ReceiverTimeout {
                        receipt_id: receipt.id,
                    },
                );
                self.receipt = Some(receipt);
                self.transition_to(InboundState::Waiting);
            }
            Ok(DeliveryOutcome::Deferred) => {
                debug!(%message_id, "Delivery deferred until storage unlocks");
            }
            Ok(DeliveryOutcome::Dropped(reason)) => {
                debug!(%message_id, ?reason, "Message dropped without broadcast");
            }
            Err(error) => {
                // Rows stay in the store; redispatch retries the delivery.
                error!(%message_id, %error, "Delivery failed, message remains stored");
            }
        }
    }

    fn handle_broadcast_complete(&mut self, receipt_id: ReceiptId, synthetic: bool, delivered: bool) {
        match self.receipt.take() {
            Some(receipt) if receipt.id == receipt_id => {
                if synthetic {
                    warn!(?receipt_id, "Resolving receipt from synthetic completion");
                } else {
                    debug!(?receipt_id, "Ordered broadcast complete");
                }
                if delivered {
                    // Soft delete: the rows stay behind as dedup history.
                    if let Err(error) = self.store.mark_deleted(&receipt.delete_selection) {
                        error!(%error, "Failed to mark delivered rows deleted");
                    }
                } else {
                    // Deferred behind the storage lock: the rows stay live
                    // so the post-unlock redispatch can find the message.
                    debug!(?receipt_id, "Receipt resolved without delivery, rows kept");
                }
                self.transition_to(InboundState::Delivering);
                self.post(InboundEvent::ReturnToIdle);
            }
            Some(receipt) => {
                warn!(
                    expected = ?receipt.id,
                    got = ?receipt_id,
                    "Broadcast completion for a different receipt, ignoring"
                );
                self.receipt = Some(receipt);
            }
            None => {
                warn!(?receipt_id, "Broadcast completion with no receipt outstanding");
            }
        }
    }

    /// Queue every complete but undelivered message in the store for
    /// broadcast. Covers rows left behind by an earlier process run and
    /// messages deferred while storage was locked.
    fn redispatch_stored(&mut self) {
        match self.reassembler.undelivered_messages() {
            Ok(messages) => {
                if !messages.is_empty() {
                    info!(count = messages.len(), "Redispatching stored messages");
                }
                for message in messages {
                    self.post(InboundEvent::BroadcastMessage { message });
                }
            }
            Err(error) => {
                // Rows are untouched; the next scan retries.
                error!(%error, "Failed to scan for undelivered messages");
            }
        }
    }
}

fn ack_for_error(error: &ReassemblyError) -> AckResult {
    match error {
        ReassemblyError::Store(StoreError::InvalidRowHandle(_)) => AckResult::InvalidUri,
        ReassemblyError::Store(_) => AckResult::DatabaseError,
        ReassemblyError::InvalidMessageCount(_) => AckResult::DispatchFailure,
        ReassemblyError::MissingPayload { .. } => AckResult::DispatchFailure,
    }
}
