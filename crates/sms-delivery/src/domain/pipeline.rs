//! Delivery pipeline: filter chain, block-list drop, locked-storage
//! deferral, and ordered broadcast issuance.

use crate::domain::filters::{FilterContext, SmsFilter};
use crate::domain::receipt::DeliveryReceipt;
use crate::domain::DeliveryError;
use crate::ports::{
    BlockChecker, BroadcastGateway, CompletionSink, DefaultAppResolver, DeliveryIntent,
    NotificationSink, StorageLockProbe,
};
use sms_reassembly::{CompleteMessage, SegmentStore};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a message never reached an ordered broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Every display address resolved to a blocked sender.
    BlockedSender,
    /// The carrier service consumed or rejected the message.
    CarrierFiltered,
    /// Consumed as a visual-voicemail system message.
    VisualVoicemail,
    /// Consumed as a carrier missed-call notification.
    MissedCall,
}

/// Result of running one complete message through the pipeline.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// An ordered broadcast went out, or a filter took asynchronous
    /// ownership. Either way the receipt is outstanding and the caller must
    /// wait for its completion.
    Sent(DeliveryReceipt),
    /// Credential-encrypted storage is still locked; rows were retained for
    /// redelivery after unlock and no receipt is outstanding.
    Deferred,
    /// Dropped synchronously before any broadcast; no receipt outstanding.
    Dropped(DropReason),
}

enum Decision {
    Broadcast(DeliveryIntent),
    Defer { notify: bool },
    Drop(DropReason),
}

/// Runs complete messages through the filter chain and out to the
/// broadcast gateway.
pub struct DeliveryPipeline {
    store: Arc<dyn SegmentStore>,
    gateway: Arc<dyn BroadcastGateway>,
    blocks: Arc<dyn BlockChecker>,
    default_app: Arc<dyn DefaultAppResolver>,
    lock_probe: Arc<dyn StorageLockProbe>,
    notifications: Arc<dyn NotificationSink>,
    completions: Arc<dyn CompletionSink>,
    filters: Vec<Arc<dyn SmsFilter>>,
}

impl DeliveryPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SegmentStore>,
        gateway: Arc<dyn BroadcastGateway>,
        blocks: Arc<dyn BlockChecker>,
        default_app: Arc<dyn DefaultAppResolver>,
        lock_probe: Arc<dyn StorageLockProbe>,
        notifications: Arc<dyn NotificationSink>,
        completions: Arc<dyn CompletionSink>,
        filters: Vec<Arc<dyn SmsFilter>>,
    ) -> Self {
        Self {
            store,
            gateway,
            blocks,
            default_app,
            lock_probe,
            notifications,
            completions,
            filters,
        }
    }

    /// Run one complete message through filters and, if nothing claims it,
    /// issue the ordered broadcast.
    ///
    /// The receipt is minted before the chain runs so that a filter taking
    /// asynchronous ownership resolves the same receipt the caller is
    /// waiting on.
    pub fn deliver(
        self: &Arc<Self>,
        message: CompleteMessage,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let user_unlocked = self.lock_probe.is_user_unlocked();
        // Gateways sometimes carry the real sender only on one part, so
        // every display address gets a block-list lookup.
        let blocked = message
            .display_addresses
            .iter()
            .any(|address| self.blocks.is_blocked(address));
        let receipt = DeliveryReceipt::new(message.delete_selection.clone());
        let ctx = FilterContext {
            message,
            blocked,
            user_unlocked,
        };
        if self.run_filters(&ctx, &receipt, &self.filters) {
            return Ok(DeliveryOutcome::Sent(receipt));
        }
        match self.decide(&ctx) {
            Decision::Broadcast(intent) => {
                debug!(
                    message_id = %ctx.message.message_id,
                    receipt_id = ?receipt.id,
                    "Issuing ordered broadcast"
                );
                self.gateway.send_ordered(receipt.id, intent)?;
                Ok(DeliveryOutcome::Sent(receipt))
            }
            Decision::Defer { notify } => {
                info!(
                    message_id = %ctx.message.message_id,
                    "Storage locked, deferring delivery"
                );
                if notify {
                    self.notifications.show_new_message_notification();
                }
                Ok(DeliveryOutcome::Deferred)
            }
            Decision::Drop(reason) => {
                info!(message_id = %ctx.message.message_id, ?reason, "Dropping message");
                self.store.delete_permanently(&receipt.delete_selection)?;
                Ok(DeliveryOutcome::Dropped(reason))
            }
        }
    }

    /// Continuation for the carrier filter's keep verdict: run the rest of
    /// the chain, then either broadcast or resolve the outstanding receipt.
    pub fn resume_after_carrier(
        self: &Arc<Self>,
        ctx: FilterContext,
        receipt: DeliveryReceipt,
        remaining: Vec<Arc<dyn SmsFilter>>,
    ) {
        if self.run_filters(&ctx, &receipt, &remaining) {
            return;
        }
        match self.decide(&ctx) {
            Decision::Broadcast(intent) => {
                if let Err(error) = self.gateway.send_ordered(receipt.id, intent) {
                    error!(%error, "Ordered broadcast failed, completing receipt");
                    self.completions.broadcast_complete(receipt.id, false);
                }
            }
            Decision::Defer { notify } => {
                // Nothing was delivered: the receipt resolves but the rows
                // stay live for the post-unlock redispatch.
                if notify {
                    self.notifications.show_new_message_notification();
                }
                self.completions.broadcast_complete(receipt.id, false);
            }
            Decision::Drop(reason) => self.drop_filtered(&receipt, reason),
        }
    }

    /// Finalize a filter-consumed message: delete its rows and resolve the
    /// outstanding receipt through the completion sink.
    pub fn drop_filtered(&self, receipt: &DeliveryReceipt, reason: DropReason) {
        match self.store.delete_permanently(&receipt.delete_selection) {
            Ok(rows) => debug!(?reason, rows, "Deleted rows for filtered message"),
            Err(error) => error!(%error, ?reason, "Failed to delete rows for filtered message"),
        }
        self.completions.broadcast_complete(receipt.id, true);
    }

    fn run_filters(
        self: &Arc<Self>,
        ctx: &FilterContext,
        receipt: &DeliveryReceipt,
        filters: &[Arc<dyn SmsFilter>],
    ) -> bool {
        for (index, filter) in filters.iter().enumerate() {
            if !ctx.user_unlocked && !filter.runs_while_locked() {
                continue;
            }
            if filter.filter(self, ctx, receipt, &filters[index + 1..]) {
                debug!(filter = filter.name(), "Filter took ownership");
                return true;
            }
        }
        false
    }

    fn decide(&self, ctx: &FilterContext) -> Decision {
        if !ctx.user_unlocked {
            // Rows stay in the store; a blocked sender is re-evaluated once
            // the user unlocks, without waking the screen for it now.
            if ctx.blocked {
                warn!(
                    message_id = %ctx.message.message_id,
                    "Blocked sender while storage locked, deferring silently"
                );
            }
            return Decision::Defer {
                notify: !ctx.blocked && ctx.message.dest_port.is_none(),
            };
        }
        if ctx.blocked {
            return Decision::Drop(DropReason::BlockedSender);
        }
        Decision::Broadcast(self.build_intent(&ctx.message))
    }

    fn build_intent(&self, message: &CompleteMessage) -> DeliveryIntent {
        match message.dest_port {
            None => DeliveryIntent::Deliver {
                target: self.default_app.default_sms_app(),
                pdus: message.pdus.clone(),
                format: message.format,
                class0: message.class0,
                sub_id: message.sub_id,
                message_id: message.message_id,
            },
            Some(port) => DeliveryIntent::DataReceived {
                uri: format!("sms://localhost:{port}"),
                port,
                pdus: message.pdus.clone(),
                format: message.format,
                sub_id: message.sub_id,
                message_id: message.message_id,
            },
        }
    }
}
