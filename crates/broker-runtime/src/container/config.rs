//! # Broker Configuration
//!
//! Unified configuration for the broker runtime. All values have sane
//! defaults with environment override capability (see `load_config` in the
//! binary).

use ril_transaction::HalVersion;
use serde::Serialize;

/// Complete broker configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerConfig {
    /// Subscription the broker instance serves.
    pub sub_id: i32,
    /// Modem boundary configuration.
    pub modem: ModemConfig,
    /// Delivery configuration.
    pub delivery: DeliveryConfig,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            sub_id: 1,
            modem: ModemConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

/// Modem boundary configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ModemConfig {
    /// HAL revision the modem reports at connect.
    pub hal_version: HalVersion,
    /// Service-center address the loopback modem answers with.
    pub smsc: String,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            hal_version: HalVersion::V2_0,
            smsc: "+100000".to_string(),
        }
    }
}

/// Delivery configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryConfig {
    /// Sender addresses dropped before broadcast.
    pub blocked_numbers: Vec<String>,
    /// Default SMS handling application, if one is designated.
    pub default_sms_app: Option<String>,
}
