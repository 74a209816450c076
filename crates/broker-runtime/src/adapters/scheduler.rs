//! Timer-backed scheduler for delayed state-machine events.

use crate::wiring::EventRouter;
use sms_inbound::{InboundEvent, Scheduler};
use std::time::Duration;
use tracing::debug;

/// Schedules delayed events on tokio timers and posts them back into the
/// broker mailbox. Timers are never cancelled; stale events (a timeout
/// after its receipt resolved, a lease release after the machine left
/// `Idle`) are tolerated by the machine's handlers.
pub struct TokioScheduler {
    router: EventRouter,
}

impl TokioScheduler {
    pub fn new(router: EventRouter) -> Self {
        Self { router }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, event: InboundEvent) {
        debug!(?delay, event = event.name(), "Scheduling delayed event");
        let router = self.router.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            router.post_inbound(event);
        });
    }
}
