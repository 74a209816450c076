//! # Inbound SMS State Machine
//!
//! Top-level coordinator for inbound short messages. Owns the liveness
//! lease, sequences `Startup → Idle → Delivering → Waiting`, and drives the
//! reassembler and delivery pipeline to completion for each message while
//! deferring work that cannot run in the current state.
//!
//! ## Event model
//!
//! One instance processes one event at a time from an ordered mailbox.
//! Handlers never block: long-running work either completes synchronously or
//! registers a continuation that posts a follow-up event back into the same
//! mailbox. Deferral re-enqueues an event for replay after the next state
//! transition.
//!
//! ## Failure policy
//!
//! An event not handled by the active state is a fatal assertion in debug
//! builds and a logged no-op in release builds. Message-level failures are
//! resolved locally to an [`shared_types::AckResult`]; the machine always
//! returns to `Idle` eventually.

pub mod domain;
pub mod events;
pub mod ports;

pub use domain::{InboundState, InboundStateMachine, WakeLease, LEASE_RELEASE_DELAY};
pub use events::{InboundEvent, InjectCallback};
pub use ports::{ModemAck, Scheduler};
