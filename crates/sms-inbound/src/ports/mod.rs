//! Outbound ports (SPI) for the inbound state machine.

use crate::events::InboundEvent;
use shared_types::AckResult;
use std::time::Duration;

/// Delayed self-posting into the machine's mailbox.
///
/// The runtime backs this with a timer; scheduled events re-enter the
/// mailbox like any other and must tolerate arriving late or stale.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, event: InboundEvent);
}

/// Acknowledgement of the last incoming message back to the modem.
///
/// Invoked exactly once per inbound segment. The adapter translates the
/// result taxonomy into the modem's success/failure-cause convention.
pub trait ModemAck: Send + Sync {
    fn acknowledge(&self, result: AckResult);
}
