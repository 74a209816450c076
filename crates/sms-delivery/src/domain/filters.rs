//! Ordered SMS filter chain.
//!
//! Filters run before broadcast delivery. Each one sees the remaining
//! suffix of the chain and either declines, letting the next filter run, or
//! takes ownership of all further processing for the message. Ownership can
//! resolve asynchronously: the carrier filter completes on a service round
//! trip and re-invokes the remaining suffix itself.

use crate::domain::pipeline::{DeliveryPipeline, DropReason};
use crate::domain::receipt::DeliveryReceipt;
use crate::ports::{
    CarrierSmsFilterService, CarrierVerdict, MissedCallSmsMatcher, VoicemailSmsMatcher,
};
use sms_reassembly::CompleteMessage;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything a filter needs to judge one complete message.
#[derive(Clone)]
pub struct FilterContext {
    pub message: CompleteMessage,
    /// True when any of the message's display addresses is on the
    /// blocked-sender list.
    pub blocked: bool,
    /// Credential-encrypted storage state at filter time.
    pub user_unlocked: bool,
}

/// One element of the filter chain.
///
/// Returning true means the filter owns the message from here on and must
/// eventually resolve the outstanding receipt, either by resuming the
/// remaining chain or by dropping through
/// [`DeliveryPipeline::drop_filtered`].
pub trait SmsFilter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this filter may run before the user unlocks storage.
    fn runs_while_locked(&self) -> bool {
        false
    }

    fn filter(
        &self,
        pipeline: &Arc<DeliveryPipeline>,
        ctx: &FilterContext,
        receipt: &DeliveryReceipt,
        remaining: &[Arc<dyn SmsFilter>],
    ) -> bool;
}

/// Carrier-app filter: hands the message to a bound carrier service and
/// waits for its verdict off-thread. Runs first so the carrier can override
/// a blocking decision, and runs even while storage is locked.
pub struct CarrierServicesFilter {
    service: Arc<dyn CarrierSmsFilterService>,
}

impl CarrierServicesFilter {
    pub fn new(service: Arc<dyn CarrierSmsFilterService>) -> Self {
        Self { service }
    }
}

impl SmsFilter for CarrierServicesFilter {
    fn name(&self) -> &'static str {
        "carrier-services"
    }

    fn runs_while_locked(&self) -> bool {
        true
    }

    fn filter(
        &self,
        pipeline: &Arc<DeliveryPipeline>,
        ctx: &FilterContext,
        receipt: &DeliveryReceipt,
        remaining: &[Arc<dyn SmsFilter>],
    ) -> bool {
        let pipeline = pipeline.clone();
        let ctx = ctx.clone();
        let receipt = receipt.clone();
        let remaining: Vec<Arc<dyn SmsFilter>> = remaining.to_vec();
        let message_id = ctx.message.message_id;
        let message = ctx.message.clone();
        self.service.filter(
            &message,
            Box::new(move |verdict| match verdict {
                CarrierVerdict::KeepAndDeliver => {
                    debug!(%message_id, "Carrier filter verdict: keep");
                    pipeline.resume_after_carrier(ctx, receipt, remaining);
                }
                CarrierVerdict::Drop => {
                    info!(%message_id, "Carrier filter verdict: drop");
                    pipeline.drop_filtered(&receipt, DropReason::CarrierFiltered);
                }
            }),
        )
    }
}

/// Consumes visual-voicemail system messages. These configure the dialer's
/// voicemail client and are never shown to the user.
pub struct VisualVoicemailFilter {
    matcher: Arc<dyn VoicemailSmsMatcher>,
}

impl VisualVoicemailFilter {
    pub fn new(matcher: Arc<dyn VoicemailSmsMatcher>) -> Self {
        Self { matcher }
    }
}

impl SmsFilter for VisualVoicemailFilter {
    fn name(&self) -> &'static str {
        "visual-voicemail"
    }

    fn filter(
        &self,
        pipeline: &Arc<DeliveryPipeline>,
        ctx: &FilterContext,
        receipt: &DeliveryReceipt,
        _remaining: &[Arc<dyn SmsFilter>],
    ) -> bool {
        if !self.matcher.matches(&ctx.message) {
            return false;
        }
        info!(message_id = %ctx.message.message_id, "Consumed visual voicemail SMS");
        pipeline.drop_filtered(receipt, DropReason::VisualVoicemail);
        true
    }
}

/// Consumes carrier missed-call notification messages, which are rendered
/// as call-log entries rather than texts.
pub struct MissedCallFilter {
    matcher: Arc<dyn MissedCallSmsMatcher>,
}

impl MissedCallFilter {
    pub fn new(matcher: Arc<dyn MissedCallSmsMatcher>) -> Self {
        Self { matcher }
    }
}

impl SmsFilter for MissedCallFilter {
    fn name(&self) -> &'static str {
        "missed-call"
    }

    fn filter(
        &self,
        pipeline: &Arc<DeliveryPipeline>,
        ctx: &FilterContext,
        receipt: &DeliveryReceipt,
        _remaining: &[Arc<dyn SmsFilter>],
    ) -> bool {
        if !self.matcher.matches(&ctx.message) {
            return false;
        }
        info!(message_id = %ctx.message.message_id, "Consumed missed-call notification SMS");
        pipeline.drop_filtered(receipt, DropReason::MissedCall);
        true
    }
}
