//! Card presence watchers
//!
//! Each watch call arms a single-shot channel that yields one outcome:
//! the card arrived / left, the wait timed out, or the transport broke.
//! Timeouts re-arm at the call site; they never fail a job.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use tap_card::{CardReader, WaitOutcome};

/// One armed watch; resolves exactly once
pub type WatchReply = oneshot::Receiver<Result<WaitOutcome, String>>;

pub trait CardWatcher: Send + Sync + 'static {
    /// Arm a wait for a card landing on the reader
    fn watch_card_present(&self, timeout: Duration) -> WatchReply;

    /// Arm a wait for the reader going empty
    fn watch_card_removed(&self, timeout: Duration) -> WatchReply;
}

/// Watcher backed by the real PC/SC reader
///
/// The blocking status-change call runs on the blocking pool; the reader
/// handle is shared with the writer, so each wait takes the lock for its
/// duration.
pub struct PcscWatcher {
    reader: Arc<Mutex<CardReader>>,
}

impl PcscWatcher {
    pub fn new(reader: Arc<Mutex<CardReader>>) -> Self {
        Self { reader }
    }

    fn watch(
        &self,
        timeout: Duration,
        wait: fn(&CardReader, Duration) -> Result<WaitOutcome, tap_card::CardError>,
    ) -> WatchReply {
        let (tx, rx) = oneshot::channel();
        let reader = self.reader.clone();

        tokio::task::spawn_blocking(move || {
            let outcome = wait(&reader.lock(), timeout).map_err(|err| err.to_string());
            let _ = tx.send(outcome);
        });

        rx
    }
}

impl CardWatcher for PcscWatcher {
    fn watch_card_present(&self, timeout: Duration) -> WatchReply {
        self.watch(timeout, CardReader::wait_for_card)
    }

    fn watch_card_removed(&self, timeout: Duration) -> WatchReply {
        self.watch(timeout, CardReader::wait_for_removal)
    }
}
