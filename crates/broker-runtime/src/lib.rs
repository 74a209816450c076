//! # Broker Runtime Library
//!
//! Wires the broker subsystems together and runs the event loop. The main
//! entry point is the `main.rs` binary; this library exposes the internal
//! modules for testing.
//!
//! ## Structure
//!
//! - `container/` - Subsystem container with dependency injection
//! - `adapters/` - Port implementations connecting subsystems
//! - `wiring/` - Event routing between the modem boundary and subsystems

pub mod adapters;
pub mod container;
pub mod wiring;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::container::{BrokerConfig, SubsystemContainer};
use crate::wiring::{BrokerEvent, EventPump, EventRouter, ModemEvent};
use sms_inbound::{InboundEvent, InjectCallback};

/// The broker runtime orchestrating all subsystems.
pub struct BrokerRuntime {
    container: Arc<SubsystemContainer>,
    router: EventRouter,
    /// Mailbox receiver, consumed when the pump starts.
    mailbox: Option<mpsc::UnboundedReceiver<BrokerEvent>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

impl BrokerRuntime {
    /// Create a runtime with all subsystems initialized.
    pub fn new(config: BrokerConfig) -> Self {
        let (router, mailbox) = EventRouter::channel();
        let container = Arc::new(SubsystemContainer::new(config, router.clone()));
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        Self {
            container,
            router,
            mailbox: Some(mailbox),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start the event pump and open the inbound gate.
    ///
    /// ## Startup sequence
    ///
    /// 1. Spawn the event pump
    /// 2. Bind the response decoder at the configured HAL revision
    /// 3. Queue a redispatch scan for stored undelivered messages, then
    ///    signal start-accepting
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  RIL Broker Runtime v0.1.0");
        info!("===========================================");

        let mailbox = self
            .mailbox
            .take()
            .context("Broker runtime already started")?;
        let pump = EventPump::new(
            Arc::clone(&self.container.machine),
            Arc::clone(&self.container.dispatcher),
            Arc::clone(&self.container.message_ids),
        );
        let mut shutdown = self.shutdown_rx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = pump.run(mailbox) => {}
                _ = shutdown.changed() => {
                    info!("Event pump shutdown signal received");
                }
            }
        });

        self.router.post_modem(ModemEvent::Connected {
            hal_version: self.container.config.modem.hal_version,
        });

        // The redispatch is deferred while the machine is still in Startup
        // and replays as soon as StartAccepting opens the gate, so stored
        // complete-but-undelivered messages go out before any new segment.
        self.router.post_inbound(InboundEvent::RedispatchStored);
        self.router.post_inbound(InboundEvent::StartAccepting);

        info!(sub_id = self.container.config.sub_id, "Broker accepting inbound SMS");
        Ok(())
    }

    /// Posting handle for modem and upper-layer events.
    pub fn router(&self) -> EventRouter {
        self.router.clone()
    }

    /// Inject a segment from an upper layer. The disposition arrives on the
    /// callback, not the modem ack path. The segment gets a fresh
    /// cross-stack message id, same as segments arriving from the modem.
    pub fn inject_segment(
        &self,
        segment: Option<shared_types::Segment>,
        callback: InjectCallback,
    ) {
        let segment = segment.map(|mut segment| {
            segment.message_id = self.container.message_ids.next_id();
            segment
        });
        self.router
            .post_inbound(InboundEvent::InjectSegment { segment, callback });
    }

    /// Credential-encrypted storage became available. Queues a scan for
    /// complete messages whose delivery was deferred behind the lock.
    pub fn notify_storage_unlocked(&self) {
        info!("Storage unlocked, scheduling redispatch of stored messages");
        self.router.post_inbound(InboundEvent::RedispatchStored);
    }

    /// Get a reference to the subsystem container.
    pub fn container(&self) -> Arc<SubsystemContainer> {
        Arc::clone(&self.container)
    }

    /// Shutdown the broker gracefully.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        // Give the pump time to finish the event in flight.
        tokio::time::sleep(Duration::from_millis(200)).await;
        info!("Shutdown complete");
    }
}
