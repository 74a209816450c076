//! Event routing between the modem boundary and the subsystems.

pub mod event_routing;

pub use event_routing::{BrokerEvent, EventPump, EventRouter, ModemEvent};
