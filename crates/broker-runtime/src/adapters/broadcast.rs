//! Broadcast gateway and completion sink backed by the broker mailbox.

use crate::wiring::EventRouter;
use sms_delivery::{BroadcastGateway, CompletionSink, DeliveryError, DeliveryIntent, ReceiptId};
use sms_inbound::InboundEvent;
use tracing::{debug, info};

/// Gateway for single-node runs: logs the intent and confirms it
/// immediately, standing in for a receiver that always acknowledges.
///
/// The confirmation goes through the mailbox, so the state machine has
/// reached `Waiting` before the completion is processed.
pub struct LoopbackBroadcastGateway {
    router: EventRouter,
}

impl LoopbackBroadcastGateway {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }
}

impl BroadcastGateway for LoopbackBroadcastGateway {
    fn send_ordered(
        &self,
        receipt_id: ReceiptId,
        intent: DeliveryIntent,
    ) -> Result<(), DeliveryError> {
        match &intent {
            DeliveryIntent::Deliver {
                target, message_id, ..
            } => {
                info!(%message_id, ?target, ?receipt_id, "Delivering SMS");
            }
            DeliveryIntent::DataReceived {
                uri, message_id, ..
            } => {
                info!(%message_id, uri, ?receipt_id, "Delivering data SMS");
            }
        }
        self.router.post_inbound(InboundEvent::BroadcastComplete {
            receipt_id,
            synthetic: false,
            delivered: true,
        });
        Ok(())
    }
}

/// Routes filter-side completions back into the state-machine mailbox.
pub struct MailboxCompletionSink {
    router: EventRouter,
}

impl MailboxCompletionSink {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }
}

impl CompletionSink for MailboxCompletionSink {
    fn broadcast_complete(&self, receipt_id: ReceiptId, delivered: bool) {
        debug!(?receipt_id, delivered, "Posting broadcast completion");
        self.router.post_inbound(InboundEvent::BroadcastComplete {
            receipt_id,
            synthetic: false,
            delivered,
        });
    }
}
