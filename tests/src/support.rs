//! Shared fixtures and recording port mocks for the integration suite.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use broker_runtime::adapters::{
    ConfigBlockChecker, ConfigDefaultApp, LogNotificationSink, NoMissedCallMatcher,
    NoVoicemailMatcher, UnboundCarrierService,
};
use shared_types::{AckResult, MessageId, Segment, SmsFormat, SmsSource};
use sms_delivery::{
    BroadcastGateway, CarrierServicesFilter, CarrierSmsFilterService, CarrierVerdict,
    CarrierVerdictFn, CompletionSink, DeliveryError, DeliveryIntent, DeliveryPipeline,
    MissedCallFilter, ReceiptId, SmsFilter, StorageLockProbe, VisualVoicemailFilter,
};
use sms_reassembly::CompleteMessage;
use sms_inbound::{InboundEvent, InboundStateMachine, ModemAck, Scheduler, WakeLease};
use sms_reassembly::{InMemorySegmentStore, SegmentReassembler, SegmentStore};

/// Build a segment of a multi-part message. `sequence` is 1-based.
pub fn segment(address: &str, reference: u16, sequence: u16, count: u16) -> Segment {
    Segment {
        pdu: vec![sequence as u8, 0xAA],
        address: address.to_string(),
        display_address: address.to_string(),
        dest_port: None,
        timestamp: 1_700_000_000_000 + u64::from(sequence),
        reference_number: reference,
        sequence,
        message_count: count,
        format: SmsFormat::Gpp3,
        class0: false,
        sub_id: 1,
        source: SmsSource::NotInjected,
        message_id: MessageId(0x10 + u64::from(sequence)),
    }
}

/// Build a single-part segment.
pub fn single(address: &str) -> Segment {
    segment(address, 0, 1, 1)
}

/// Broadcast gateway that records intents and never completes them. Tests
/// resolve receipts themselves by feeding `BroadcastComplete` back in.
#[derive(Default)]
pub struct ManualGateway {
    sent: Mutex<Vec<(ReceiptId, DeliveryIntent)>>,
}

impl ManualGateway {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn last_receipt(&self) -> Option<ReceiptId> {
        self.sent.lock().last().map(|(id, _)| *id)
    }

    pub fn take(&self) -> Vec<(ReceiptId, DeliveryIntent)> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl BroadcastGateway for ManualGateway {
    fn send_ordered(
        &self,
        receipt_id: ReceiptId,
        intent: DeliveryIntent,
    ) -> Result<(), DeliveryError> {
        self.sent.lock().push((receipt_id, intent));
        Ok(())
    }
}

/// Records every acknowledgement the machine sends toward the modem.
#[derive(Default)]
pub struct RecordingAck {
    results: Mutex<Vec<AckResult>>,
}

impl RecordingAck {
    pub fn results(&self) -> Vec<AckResult> {
        self.results.lock().clone()
    }

    pub fn last(&self) -> Option<AckResult> {
        self.results.lock().last().copied()
    }
}

impl ModemAck for RecordingAck {
    fn acknowledge(&self, result: AckResult) {
        self.results.lock().push(result);
    }
}

/// Captures scheduled events instead of arming timers. Tests fire them
/// explicitly when the flow under test needs the timeout to elapse.
#[derive(Default)]
pub struct RecordingScheduler {
    scheduled: Mutex<Vec<(Duration, InboundEvent)>>,
}

impl RecordingScheduler {
    pub fn take(&self) -> Vec<(Duration, InboundEvent)> {
        std::mem::take(&mut *self.scheduled.lock())
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&self, delay: Duration, event: InboundEvent) {
        self.scheduled.lock().push((delay, event));
    }
}

/// Completion sink recording receipts resolved off the broadcast path,
/// together with whether the message actually reached a receiver.
#[derive(Default)]
pub struct RecordingCompletions {
    completed: Mutex<Vec<(ReceiptId, bool)>>,
}

impl RecordingCompletions {
    pub fn completed(&self) -> Vec<(ReceiptId, bool)> {
        self.completed.lock().clone()
    }
}

impl CompletionSink for RecordingCompletions {
    fn broadcast_complete(&self, receipt_id: ReceiptId, delivered: bool) {
        self.completed.lock().push((receipt_id, delivered));
    }
}

/// Storage probe whose lock state tests flip at will.
pub struct ToggleLockProbe {
    unlocked: AtomicBool,
}

impl ToggleLockProbe {
    pub fn new(unlocked: bool) -> Self {
        Self {
            unlocked: AtomicBool::new(unlocked),
        }
    }

    pub fn unlock(&self) {
        self.unlocked.store(true, Ordering::SeqCst);
    }
}

impl StorageLockProbe for ToggleLockProbe {
    fn is_user_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    fn is_encrypted_only_boot(&self) -> bool {
        false
    }
}

/// Carrier service that claims every message and stashes the verdict
/// callback for the test to resolve later.
#[derive(Default)]
pub struct PendingCarrierService {
    pending: Mutex<Option<CarrierVerdictFn>>,
}

impl PendingCarrierService {
    pub fn resolve(&self, verdict: CarrierVerdict) {
        if let Some(callback) = self.pending.lock().take() {
            callback(verdict);
        }
    }
}

impl CarrierSmsFilterService for PendingCarrierService {
    fn filter(&self, _message: &CompleteMessage, verdict: CarrierVerdictFn) -> bool {
        *self.pending.lock() = Some(verdict);
        true
    }
}

/// Full inbound stack over recording mocks: state machine, reassembler,
/// and delivery pipeline with the production filter chain.
pub struct Harness {
    pub machine: Arc<Mutex<InboundStateMachine<InMemorySegmentStore>>>,
    pub store: Arc<InMemorySegmentStore>,
    pub gateway: Arc<ManualGateway>,
    pub ack: Arc<RecordingAck>,
    pub scheduler: Arc<RecordingScheduler>,
    pub completions: Arc<RecordingCompletions>,
    pub lease: Arc<WakeLease>,
    pub lock_probe: Arc<ToggleLockProbe>,
}

impl Harness {
    /// Harness with unlocked storage, already accepting segments.
    pub fn new() -> Self {
        Self::build(true, Vec::new(), Arc::new(UnboundCarrierService))
    }

    /// Harness with storage still locked.
    pub fn locked() -> Self {
        Self::build(false, Vec::new(), Arc::new(UnboundCarrierService))
    }

    /// Harness with storage locked and the given carrier service bound.
    pub fn locked_with_carrier(carrier: Arc<dyn CarrierSmsFilterService>) -> Self {
        Self::build(false, Vec::new(), carrier)
    }

    /// Harness with a configured block list.
    pub fn with_blocked(numbers: Vec<String>) -> Self {
        Self::build(true, numbers, Arc::new(UnboundCarrierService))
    }

    fn build(
        unlocked: bool,
        blocked: Vec<String>,
        carrier: Arc<dyn CarrierSmsFilterService>,
    ) -> Self {
        let store = Arc::new(InMemorySegmentStore::new());
        let gateway = Arc::new(ManualGateway::default());
        let ack = Arc::new(RecordingAck::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let completions = Arc::new(RecordingCompletions::default());
        let lease = Arc::new(WakeLease::default());
        let lock_probe = Arc::new(ToggleLockProbe::new(unlocked));

        let filters: Vec<Arc<dyn SmsFilter>> = vec![
            Arc::new(CarrierServicesFilter::new(carrier)),
            Arc::new(VisualVoicemailFilter::new(Arc::new(NoVoicemailMatcher))),
            Arc::new(MissedCallFilter::new(Arc::new(NoMissedCallMatcher))),
        ];
        let pipeline = Arc::new(DeliveryPipeline::new(
            Arc::clone(&store) as Arc<dyn SegmentStore>,
            Arc::clone(&gateway) as Arc<dyn BroadcastGateway>,
            Arc::new(ConfigBlockChecker::new(blocked)),
            Arc::new(ConfigDefaultApp::new(Some("com.example.messages".to_string()))),
            Arc::clone(&lock_probe) as Arc<dyn StorageLockProbe>,
            Arc::new(LogNotificationSink),
            Arc::clone(&completions) as Arc<dyn CompletionSink>,
            filters,
        ));

        let mut machine = InboundStateMachine::new(
            SegmentReassembler::new(Arc::clone(&store)),
            pipeline,
            Arc::clone(&lease),
            Arc::clone(&scheduler) as Arc<dyn Scheduler>,
            Arc::clone(&ack) as Arc<dyn ModemAck>,
            Arc::clone(&lock_probe) as Arc<dyn StorageLockProbe>,
            1,
        );
        machine.handle(InboundEvent::StartAccepting);

        Self {
            machine: Arc::new(Mutex::new(machine)),
            store,
            gateway,
            ack,
            scheduler,
            completions,
            lease,
            lock_probe,
        }
    }

    /// Feed one modem segment through the machine.
    pub fn receive(&self, segment: Segment) {
        self.machine.lock().handle(InboundEvent::NewSegment {
            segment: Some(segment),
        });
    }

    /// Resolve the outstanding receipt the way the designated receiver does.
    pub fn confirm(&self, receipt_id: ReceiptId) {
        self.machine.lock().handle(InboundEvent::BroadcastComplete {
            receipt_id,
            synthetic: false,
            delivered: true,
        });
    }

    /// Run the scan for stored complete-but-undelivered messages.
    pub fn redispatch(&self) {
        self.machine.lock().handle(InboundEvent::RedispatchStored);
    }

    pub fn state(&self) -> sms_inbound::InboundState {
        self.machine.lock().state()
    }
}
