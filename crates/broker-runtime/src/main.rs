//! # RIL Broker Runtime
//!
//! The main entry point for the radio-interface-layer broker: the inbound
//! SMS state machine, segment reassembly, delivery pipeline, and the modem
//! transaction dispatcher, wired over a single ordered mailbox.

use anyhow::Result;
use broker_runtime::container::BrokerConfig;
use broker_runtime::BrokerRuntime;
use ril_transaction::HalVersion;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Load configuration from environment overrides on top of defaults.
fn load_config() -> BrokerConfig {
    let mut config = BrokerConfig::default();

    if let Ok(sub_id) = std::env::var("RIL_SUB_ID") {
        match sub_id.parse() {
            Ok(parsed) => config.sub_id = parsed,
            Err(_) => warn!("RIL_SUB_ID must be an integer, keeping default"),
        }
    }
    if let Ok(version) = std::env::var("RIL_HAL_VERSION") {
        match version.as_str() {
            "1.5" => config.modem.hal_version = HalVersion::V1_5,
            "1.6" => config.modem.hal_version = HalVersion::V1_6,
            "2.0" => config.modem.hal_version = HalVersion::V2_0,
            other => warn!("Unknown RIL_HAL_VERSION {other:?}, keeping default"),
        }
    }
    if let Ok(smsc) = std::env::var("RIL_SMSC") {
        config.modem.smsc = smsc;
    }
    if let Ok(blocked) = std::env::var("RIL_BLOCKED_NUMBERS") {
        config.delivery.blocked_numbers = blocked
            .split(',')
            .map(str::trim)
            .filter(|number| !number.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Ok(app) = std::env::var("RIL_DEFAULT_SMS_APP") {
        config.delivery.default_sms_app = Some(app);
    }

    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config();
    info!(config = %serde_json::to_string(&config)?, "Loaded configuration");

    let mut runtime = BrokerRuntime::new(config);
    runtime.start().await?;

    info!("Broker is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
