//! # Response Dispatcher
//!
//! Consumes modem response events, resolves pending completions, and hides
//! HAL-capability skew behind transparent fallback retries.

use crate::errors::TransactionError;
use crate::hal::{DecoderTable, HalVersion, RadioError, RawPayload};
use crate::ports::ModemPort;
use crate::request::{RequestArgs, Serial};
use crate::table::{CompletionReceiver, TransactionTable};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Correlates responses to requests and canonicalizes their payloads.
///
/// ## Fallback
///
/// A `RequestNotSupported` response for a kind that exists in the
/// next-older HAL revision is reissued with the older calling convention
/// under a fresh serial; the original completion is carried over unresolved.
/// The caller never observes the rejection.
pub struct ResponseDispatcher<M: ModemPort> {
    table: Arc<TransactionTable>,
    modem: Arc<M>,
    decoder: RwLock<DecoderTable>,
}

impl<M: ModemPort> ResponseDispatcher<M> {
    /// Create a dispatcher bound to an initial HAL revision.
    pub fn new(table: Arc<TransactionTable>, modem: Arc<M>, hal_version: HalVersion) -> Self {
        Self {
            table,
            modem,
            decoder: RwLock::new(DecoderTable::for_version(hal_version)),
        }
    }

    /// Rebind the decoder when the modem (re)connects at a revision.
    pub fn bind(&self, hal_version: HalVersion) {
        info!(?hal_version, "binding response decoder");
        *self.decoder.write() = DecoderTable::for_version(hal_version);
    }

    /// Currently bound HAL revision.
    pub fn hal_version(&self) -> HalVersion {
        self.decoder.read().version
    }

    /// Issue a request: register the completion, then transmit.
    ///
    /// Transport failures resolve the completion immediately; callers always
    /// get exactly one result on the returned receiver.
    pub fn send(&self, args: RequestArgs) -> CompletionReceiver {
        let hal_version = self.hal_version();
        let (serial, rx) = self.table.register(args.clone(), hal_version);
        debug!(serial = %serial, kind = ?args.kind(), "sending modem request");

        if let Err(e) = self.modem.send_request(serial, hal_version, &args) {
            error!(serial = %serial, error = %e, "modem transport rejected request");
            if let Some(pending) = self.table.remove(serial) {
                pending.complete(Err(e));
            }
        }
        rx
    }

    /// Process one response event from the modem.
    pub fn on_response(&self, serial: Serial, error: RadioError, payload: RawPayload) {
        let Some(pending) = self.table.remove(serial) else {
            // Late response after a drain, or a serial the modem invented.
            warn!(serial = %serial, "response for unknown serial, ignoring");
            return;
        };

        match error {
            RadioError::None => {
                // A fallback reissue answers in the convention it was
                // marshalled with, not the one currently bound.
                let bound = *self.decoder.read();
                let decoder = if pending.hal_version == bound.version {
                    bound
                } else {
                    DecoderTable::for_version(pending.hal_version)
                };
                let decoded = decoder.decode(pending.args.kind(), payload);
                pending.complete(decoded);
            }
            RadioError::RequestNotSupported => {
                let kind = pending.args.kind();
                match pending.hal_version.fallback_for(kind) {
                    Some(older) => self.reissue(pending.serial, older, pending),
                    None => {
                        warn!(serial = %serial, ?kind, "request not supported, no fallback");
                        pending.complete(Err(TransactionError::RequestNotSupported));
                    }
                }
            }
            RadioError::RadioNotAvailable => {
                pending.complete(Err(TransactionError::RadioNotAvailable));
            }
            other => {
                pending.complete(Err(TransactionError::Radio(other)));
            }
        }
    }

    /// Fail every outstanding completion. Called on modem disconnect.
    pub fn on_disconnect(&self) {
        let drained = self.table.drain();
        if !drained.is_empty() {
            warn!(
                pending = drained.len(),
                "modem disconnected, failing outstanding requests"
            );
        }
        for pending in drained {
            pending.complete(Err(TransactionError::RadioNotAvailable));
        }
    }

    fn reissue(
        &self,
        rejected_serial: Serial,
        older: HalVersion,
        pending: crate::table::PendingCompletion,
    ) {
        let (args, completion) = pending.into_parts();
        let serial = self.table.register_sender(args.clone(), older, completion);
        info!(
            rejected = %rejected_serial,
            reissued = %serial,
            ?older,
            kind = ?args.kind(),
            "request not supported, falling back to older HAL convention"
        );
        if let Err(e) = self.modem.send_request(serial, older, &args) {
            error!(serial = %serial, error = %e, "fallback transmission failed");
            if let Some(pending) = self.table.remove(serial) {
                pending.complete(Err(e));
            }
        }
    }
}
