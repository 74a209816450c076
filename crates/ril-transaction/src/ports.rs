//! Outbound port (SPI) to the modem boundary.

use crate::errors::TransactionError;
use crate::hal::HalVersion;
use crate::request::{RequestArgs, Serial};

/// Fire-and-forget request transmission to the modem.
///
/// The response arrives later as a `responseReady(serial, ...)` event routed
/// to the dispatcher; this trait never blocks for it. The HAL version tells
/// the adapter which calling convention to marshal with.
pub trait ModemPort: Send + Sync {
    fn send_request(
        &self,
        serial: Serial,
        hal_version: HalVersion,
        args: &RequestArgs,
    ) -> Result<(), TransactionError>;
}
