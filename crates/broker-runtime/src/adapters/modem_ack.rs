//! Modem acknowledgement adapter over the transaction dispatcher.

use ril_transaction::{ModemPort, RequestArgs, ResponseDispatcher};
use shared_types::AckResult;
use sms_inbound::ModemAck;
use std::sync::Arc;
use tracing::{debug, warn};

/// Failure cause forwarded to the network when the device could not store
/// the message. Memory-capacity-exceeded tells the SMSC to retry later.
const FAIL_CAUSE_MEMORY_CAPACITY_EXCEEDED: u32 = 0xD3;
/// Unspecified failure cause for every other rejection.
const FAIL_CAUSE_UNSPECIFIED: u32 = 0xFF;

/// Acknowledges inbound messages by issuing an
/// `AcknowledgeLastIncomingSms` request through the dispatcher, so HAL
/// fallback applies to the ack path like any other request.
pub struct RilModemAck<M: ModemPort> {
    dispatcher: Arc<ResponseDispatcher<M>>,
}

impl<M: ModemPort> RilModemAck<M> {
    pub fn new(dispatcher: Arc<ResponseDispatcher<M>>) -> Self {
        Self { dispatcher }
    }
}

fn failure_cause(result: AckResult) -> u32 {
    match result {
        AckResult::DatabaseError => FAIL_CAUSE_MEMORY_CAPACITY_EXCEEDED,
        _ => FAIL_CAUSE_UNSPECIFIED,
    }
}

impl<M: ModemPort + 'static> ModemAck for RilModemAck<M> {
    fn acknowledge(&self, result: AckResult) {
        let rx = self.dispatcher.send(RequestArgs::AcknowledgeLastIncomingSms {
            success: result.is_success(),
            cause: failure_cause(result),
        });
        tokio::spawn(async move {
            match rx.await {
                Ok(Ok(_)) => debug!(?result, "Modem acknowledged inbound SMS"),
                Ok(Err(error)) => warn!(?result, %error, "SMS acknowledgement failed"),
                Err(_) => warn!(?result, "SMS acknowledgement dropped without response"),
            }
        });
    }
}
