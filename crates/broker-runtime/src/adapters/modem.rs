//! Loopback modem for single-node runs and tests.

use crate::wiring::{EventRouter, ModemEvent};
use ril_transaction::{
    HalVersion, ModemPort, RadioError, RawPayload, RequestArgs, Serial, TransactionError,
};
use tracing::debug;

/// Modem stand-in that acknowledges every request successfully.
///
/// Responses are posted back through the broker mailbox rather than invoked
/// inline, preserving the fire-and-forget contract of [`ModemPort`]: the
/// dispatcher finishes registering the request before its response can be
/// routed.
pub struct LoopbackModem {
    router: EventRouter,
    smsc: String,
}

impl LoopbackModem {
    pub fn new(router: EventRouter, smsc: String) -> Self {
        Self { router, smsc }
    }

    fn payload_for(&self, hal_version: HalVersion, args: &RequestArgs) -> RawPayload {
        match args {
            RequestArgs::GetSmscAddress => RawPayload::SmscAddress(self.smsc.clone()),
            RequestArgs::SendSms { .. } => {
                if hal_version >= HalVersion::V2_0 {
                    RawPayload::SendSmsResult {
                        message_ref: 0,
                        ack_pdu: None,
                        error_code: None,
                    }
                } else {
                    RawPayload::LegacySendSmsResult {
                        message_ref: 0,
                        ack_pdu_hex: None,
                        error_code: -1,
                    }
                }
            }
            RequestArgs::AcknowledgeLastIncomingSms { .. }
            | RequestArgs::SetSmscAddress { .. }
            | RequestArgs::ReportSmsMemoryStatus { .. } => RawPayload::Empty,
        }
    }
}

impl ModemPort for LoopbackModem {
    fn send_request(
        &self,
        serial: Serial,
        hal_version: HalVersion,
        args: &RequestArgs,
    ) -> Result<(), TransactionError> {
        debug!(%serial, ?hal_version, kind = ?args.kind(), "Loopback modem accepted request");
        self.router.post_modem(ModemEvent::ResponseReady {
            serial,
            error: RadioError::None,
            payload: self.payload_for(hal_version, args),
        });
        Ok(())
    }
}
