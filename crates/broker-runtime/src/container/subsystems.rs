//! # Subsystem Container
//!
//! Builds the subsystem graph in dependency order and holds shared
//! ownership of every piece the runtime wires together:
//!
//! ```text
//! Level 0: TransactionTable, segment store
//! Level 1: ResponseDispatcher (modem), SegmentReassembler (store)
//! Level 2: DeliveryPipeline (store, gateway, filters)
//! Level 3: InboundStateMachine (reassembler, pipeline, scheduler, ack)
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::adapters::{
    AlwaysUnlockedProbe, ConfigBlockChecker, ConfigDefaultApp, LogNotificationSink,
    LoopbackBroadcastGateway, LoopbackModem, MailboxCompletionSink, NoMissedCallMatcher,
    NoVoicemailMatcher, RilModemAck, TokioScheduler, UnboundCarrierService,
};
use crate::container::config::BrokerConfig;
use crate::wiring::EventRouter;
use ril_transaction::{ResponseDispatcher, TransactionTable};
use sms_delivery::{
    CarrierServicesFilter, DeliveryPipeline, MissedCallFilter, SmsFilter, StorageLockProbe,
    VisualVoicemailFilter,
};
use shared_types::MessageIdAllocator;
use sms_inbound::{InboundStateMachine, WakeLease};
use sms_reassembly::{InMemorySegmentStore, SegmentReassembler};

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    /// Broker configuration (immutable after initialization).
    pub config: BrokerConfig,
    /// Durable segment store shared by reassembly and delivery.
    pub store: Arc<InMemorySegmentStore>,
    /// Request/response correlation over the modem boundary.
    pub dispatcher: Arc<ResponseDispatcher<LoopbackModem>>,
    /// The inbound state machine; the event pump holds the only lock path.
    pub machine: Arc<Mutex<InboundStateMachine<InMemorySegmentStore>>>,
    /// Liveness lease shared with diagnostics.
    pub lease: Arc<WakeLease>,
    /// Assigns the cross-stack id to every segment entering the broker.
    pub message_ids: Arc<MessageIdAllocator>,
}

impl SubsystemContainer {
    /// Create a container with all subsystems initialized and wired to the
    /// given mailbox router.
    pub fn new(config: BrokerConfig, router: EventRouter) -> Self {
        info!(sub_id = config.sub_id, "Initializing broker subsystems");

        // Transaction layer.
        let table = Arc::new(TransactionTable::new());
        let modem = Arc::new(LoopbackModem::new(
            router.clone(),
            config.modem.smsc.clone(),
        ));
        let dispatcher = Arc::new(ResponseDispatcher::new(
            table,
            modem,
            config.modem.hal_version,
        ));

        // Reassembly layer.
        let store = Arc::new(InMemorySegmentStore::new());
        let reassembler = SegmentReassembler::new(store.clone());

        // Delivery layer. Filter order matters: the carrier service runs
        // first so it can consume a message before the block-list drop.
        let filters: Vec<Arc<dyn SmsFilter>> = vec![
            Arc::new(CarrierServicesFilter::new(Arc::new(UnboundCarrierService))),
            Arc::new(VisualVoicemailFilter::new(Arc::new(NoVoicemailMatcher))),
            Arc::new(MissedCallFilter::new(Arc::new(NoMissedCallMatcher))),
        ];
        let lock_probe: Arc<dyn StorageLockProbe> = Arc::new(AlwaysUnlockedProbe);
        let pipeline = Arc::new(DeliveryPipeline::new(
            store.clone(),
            Arc::new(LoopbackBroadcastGateway::new(router.clone())),
            Arc::new(ConfigBlockChecker::new(
                config.delivery.blocked_numbers.clone(),
            )),
            Arc::new(ConfigDefaultApp::new(config.delivery.default_sms_app.clone())),
            lock_probe.clone(),
            Arc::new(LogNotificationSink),
            Arc::new(MailboxCompletionSink::new(router.clone())),
            filters,
        ));

        // Inbound coordinator.
        let lease = Arc::new(WakeLease::new());
        let machine = Arc::new(Mutex::new(InboundStateMachine::new(
            reassembler,
            pipeline,
            lease.clone(),
            Arc::new(TokioScheduler::new(router)),
            Arc::new(RilModemAck::new(dispatcher.clone())),
            lock_probe,
            config.sub_id,
        )));

        info!("Broker subsystems initialized");
        Self {
            config,
            store,
            dispatcher,
            machine,
            lease,
            message_ids: Arc::new(MessageIdAllocator::new()),
        }
    }
}
