//! State machine and liveness lease.

pub mod machine;
pub mod wake;

pub use machine::{InboundState, InboundStateMachine, LEASE_RELEASE_DELAY};
pub use wake::WakeLease;
