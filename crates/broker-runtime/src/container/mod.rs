//! Subsystem container and configuration.

pub mod config;
pub mod subsystems;

pub use config::{BrokerConfig, DeliveryConfig, ModemConfig};
pub use subsystems::SubsystemContainer;
