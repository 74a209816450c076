//! # SMS Delivery Subsystem
//!
//! Runs a complete message through the ordered filter chain and, if nothing
//! claims it, performs at-most-once ordered broadcast delivery.
//!
//! ## Filter chain
//!
//! A statically ordered list of [`domain::SmsFilter`] objects. Each filter
//! sees the remaining suffix of the chain and either declines (next filter
//! runs) or takes ownership of all further processing. Ownership may be
//! asynchronous: the carrier filter completes on a service round trip and
//! re-invokes the remaining suffix itself. Order matters: carrier first
//! (it can override blocking decisions), then visual voicemail, then missed
//! call.
//!
//! ## Ordered broadcast
//!
//! Exactly one [`domain::DeliveryReceipt`] is outstanding per state-machine
//! instance. The designated system-user receiver's acknowledgement (or a
//! synthetic timeout completion) resolves it; other running users get a
//! fire-and-forget copy, handled inside the broadcast gateway.

pub mod domain;
pub mod ports;

pub use domain::{
    CarrierServicesFilter, DeliveryError, DeliveryOutcome, DeliveryPipeline, DeliveryReceipt,
    DropReason, FilterContext, MissedCallFilter, ReceiptId, SmsFilter, VisualVoicemailFilter,
    RECEIVER_TIMEOUT,
};
pub use ports::{
    AppId, BlockChecker, BroadcastGateway, CarrierSmsFilterService, CarrierVerdict,
    CarrierVerdictFn, CompletionSink, DefaultAppResolver, DeliveryIntent, MissedCallSmsMatcher,
    NotificationSink, StorageLockProbe, VoicemailSmsMatcher,
};
