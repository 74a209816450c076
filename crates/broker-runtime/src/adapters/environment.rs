//! Static environment adapters: block list, default app, storage lock,
//! notifications, and the filter matchers for a node with no carrier app.

use sms_delivery::{
    AppId, BlockChecker, CarrierSmsFilterService, CarrierVerdictFn, DefaultAppResolver,
    MissedCallSmsMatcher, NotificationSink, StorageLockProbe, VoicemailSmsMatcher,
};
use sms_reassembly::CompleteMessage;
use tracing::info;

/// Block-list lookup against the configured number list.
pub struct ConfigBlockChecker {
    blocked: Vec<String>,
}

impl ConfigBlockChecker {
    pub fn new(blocked: Vec<String>) -> Self {
        Self { blocked }
    }
}

impl BlockChecker for ConfigBlockChecker {
    fn is_blocked(&self, display_address: &str) -> bool {
        self.blocked.iter().any(|number| number == display_address)
    }
}

/// Default-app resolution from configuration.
pub struct ConfigDefaultApp {
    app: Option<AppId>,
}

impl ConfigDefaultApp {
    pub fn new(app: Option<String>) -> Self {
        Self {
            app: app.map(AppId),
        }
    }
}

impl DefaultAppResolver for ConfigDefaultApp {
    fn default_sms_app(&self) -> Option<AppId> {
        self.app.clone()
    }
}

/// Storage probe for hosts without credential-encrypted storage.
pub struct AlwaysUnlockedProbe;

impl StorageLockProbe for AlwaysUnlockedProbe {
    fn is_user_unlocked(&self) -> bool {
        true
    }

    fn is_encrypted_only_boot(&self) -> bool {
        false
    }
}

/// Notification sink that only logs; there is no UI to show.
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn show_new_message_notification(&self) {
        info!("New message notification (delivery deferred)");
    }
}

/// Carrier filter service with no carrier app bound.
pub struct UnboundCarrierService;

impl CarrierSmsFilterService for UnboundCarrierService {
    fn filter(&self, _message: &CompleteMessage, _verdict: CarrierVerdictFn) -> bool {
        false
    }
}

/// Voicemail matcher with no visual-voicemail configuration.
pub struct NoVoicemailMatcher;

impl VoicemailSmsMatcher for NoVoicemailMatcher {
    fn matches(&self, _message: &CompleteMessage) -> bool {
        false
    }
}

/// Missed-call matcher with no carrier pattern configured.
pub struct NoMissedCallMatcher;

impl MissedCallSmsMatcher for NoMissedCallMatcher {
    fn matches(&self, _message: &CompleteMessage) -> bool {
        false
    }
}
