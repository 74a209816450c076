//! Port implementations connecting the subsystems to the runtime.

pub mod broadcast;
pub mod environment;
pub mod modem;
pub mod modem_ack;
pub mod scheduler;

pub use broadcast::{LoopbackBroadcastGateway, MailboxCompletionSink};
pub use environment::{
    AlwaysUnlockedProbe, ConfigBlockChecker, ConfigDefaultApp, LogNotificationSink,
    NoMissedCallMatcher, NoVoicemailMatcher, UnboundCarrierService,
};
pub use modem::LoopbackModem;
pub use modem_ack::RilModemAck;
pub use scheduler::TokioScheduler;
