//! # Transaction Table
//!
//! Maps serial numbers of in-flight modem requests to their pending
//! completions. The table is shared between the request issuers and the
//! response dispatcher; entries are registered before transmission and
//! removed exactly once when the response (or a drain) resolves them.

use crate::errors::TransactionError;
use crate::hal::{CanonicalResponse, HalVersion};
use crate::request::{RequestArgs, Serial};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::oneshot;
use tracing::debug;

/// Receiver half handed to the caller of an asynchronous modem request.
pub type CompletionReceiver = oneshot::Receiver<Result<CanonicalResponse, TransactionError>>;

type CompletionSender = oneshot::Sender<Result<CanonicalResponse, TransactionError>>;

/// One outstanding modem request.
pub struct PendingCompletion {
    pub serial: Serial,
    /// Original arguments, retained so a fallback retry can reissue them.
    pub args: RequestArgs,
    /// HAL revision the request was marshalled with.
    pub hal_version: HalVersion,
    completion: CompletionSender,
}

impl PendingCompletion {
    /// Resolve the caller. A dropped receiver (caller gave up) is a no-op.
    pub fn complete(self, result: Result<CanonicalResponse, TransactionError>) {
        if self.completion.send(result).is_err() {
            debug!(serial = %self.serial, "completion receiver dropped before resolution");
        }
    }

    /// Take the sender out, consuming the entry. Used when a fallback retry
    /// re-registers the same ultimate completion under a new serial.
    pub(crate) fn into_parts(self) -> (RequestArgs, CompletionSender) {
        (self.args, self.completion)
    }
}

/// Serial-keyed registry of pending completions.
pub struct TransactionTable {
    entries: Mutex<HashMap<u32, PendingCompletion>>,
    next_serial: AtomicU32,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_serial: AtomicU32::new(1),
        }
    }

    /// Register a new request and hand back its serial plus the receiver the
    /// caller awaits.
    pub fn register(
        &self,
        args: RequestArgs,
        hal_version: HalVersion,
    ) -> (Serial, CompletionReceiver) {
        let (tx, rx) = oneshot::channel();
        let serial = self.register_sender(args, hal_version, tx);
        (serial, rx)
    }

    /// Register an entry that resolves an existing completion sender. Used by
    /// fallback reissues: a fresh serial, the same ultimate caller.
    pub(crate) fn register_sender(
        &self,
        args: RequestArgs,
        hal_version: HalVersion,
        completion: CompletionSender,
    ) -> Serial {
        let mut entries = self.entries.lock();
        // Serials wrap at u32::MAX; skip any value still occupied by a live
        // completion so a serial is never reused while in flight.
        let serial = loop {
            let candidate = self.next_serial.fetch_add(1, Ordering::Relaxed);
            if !entries.contains_key(&candidate) {
                break Serial(candidate);
            }
        };
        entries.insert(
            serial.0,
            PendingCompletion {
                serial,
                args,
                hal_version,
                completion,
            },
        );
        serial
    }

    /// Remove and return the pending entry for a serial, making the serial
    /// reusable. Returns `None` for unknown serials (late or spurious
    /// responses).
    pub fn remove(&self, serial: Serial) -> Option<PendingCompletion> {
        self.entries.lock().remove(&serial.0)
    }

    /// Remove every pending entry. Called when the modem connection is torn
    /// down; the dispatcher fails each drained completion.
    pub fn drain(&self) -> Vec<PendingCompletion> {
        let mut entries = self.entries.lock();
        entries.drain().map(|(_, pending)| pending).collect()
    }

    /// Number of requests currently in flight.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for TransactionTable {
    fn default() -> Self {
        Self::new()
    }
}
