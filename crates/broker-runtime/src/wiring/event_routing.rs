//! # Event Routing
//!
//! Single ordered mailbox for the whole broker. Modem events and
//! state-machine events flow through one channel, preserving arrival order:
//! responses go to the response dispatcher, everything else to the inbound
//! state machine.

use ril_transaction::{HalVersion, ModemPort, RadioError, RawPayload, ResponseDispatcher, Serial};
use serde::{Deserialize, Serialize};
use shared_types::{MessageIdAllocator, Segment};
use sms_inbound::{InboundEvent, InboundStateMachine};
use sms_reassembly::SegmentStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events arriving from the modem boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ModemEvent {
    /// A new inbound segment. `None` marks an upstream decode failure. The
    /// cross-stack message id is assigned when the event is routed; any id
    /// carried in from the boundary is replaced.
    NewSegment { segment: Option<Segment> },
    /// Response to an earlier request, keyed by serial.
    ResponseReady {
        serial: Serial,
        error: RadioError,
        payload: RawPayload,
    },
    /// The modem (re)connected at a HAL revision.
    Connected { hal_version: HalVersion },
    /// The modem connection was torn down.
    Disconnected,
}

/// One unit of work on the broker mailbox.
#[derive(Debug)]
pub enum BrokerEvent {
    Inbound(InboundEvent),
    Modem(ModemEvent),
}

/// Cloneable posting handle into the broker mailbox.
#[derive(Clone)]
pub struct EventRouter {
    tx: mpsc::UnboundedSender<BrokerEvent>,
}

impl EventRouter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BrokerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn post_inbound(&self, event: InboundEvent) {
        // Send fails only when the pump is gone, i.e. during shutdown.
        let _ = self.tx.send(BrokerEvent::Inbound(event));
    }

    pub fn post_modem(&self, event: ModemEvent) {
        let _ = self.tx.send(BrokerEvent::Modem(event));
    }
}

/// Drains the mailbox and routes each event to its subsystem.
pub struct EventPump<S: SegmentStore, M: ModemPort> {
    machine: Arc<Mutex<InboundStateMachine<S>>>,
    dispatcher: Arc<ResponseDispatcher<M>>,
    message_ids: Arc<MessageIdAllocator>,
}

impl<S: SegmentStore, M: ModemPort> EventPump<S, M> {
    pub fn new(
        machine: Arc<Mutex<InboundStateMachine<S>>>,
        dispatcher: Arc<ResponseDispatcher<M>>,
        message_ids: Arc<MessageIdAllocator>,
    ) -> Self {
        Self {
            machine,
            dispatcher,
            message_ids,
        }
    }

    /// Run until the channel closes.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<BrokerEvent>) {
        while let Some(event) = rx.recv().await {
            self.route(event);
        }
        info!("Event channel closed, pump stopping");
    }

    /// Route one event. Split out from [`run`] so tests can drive the pump
    /// synchronously.
    ///
    /// [`run`]: EventPump::run
    pub fn route(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::Inbound(inbound) => self.machine.lock().handle(inbound),
            BrokerEvent::Modem(ModemEvent::NewSegment { segment }) => {
                let segment = segment.map(|mut segment| {
                    segment.message_id = self.message_ids.next_id();
                    segment
                });
                self.machine
                    .lock()
                    .handle(InboundEvent::NewSegment { segment });
            }
            BrokerEvent::Modem(ModemEvent::ResponseReady {
                serial,
                error,
                payload,
            }) => self.dispatcher.on_response(serial, error, payload),
            BrokerEvent::Modem(ModemEvent::Connected { hal_version }) => {
                debug!(?hal_version, "Modem connected");
                self.dispatcher.bind(hal_version);
            }
            BrokerEvent::Modem(ModemEvent::Disconnected) => self.dispatcher.on_disconnect(),
        }
    }
}
