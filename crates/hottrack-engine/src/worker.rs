//! The aging worker.
//!
//! A background task that periodically runs one aging pass over the tracker
//! (memory eviction, temperature recompute, rebucketing). The period is the
//! `update_interval_secs` tunable, re-read before every arm so adjustments
//! take effect on the next cycle. The task holds only a `Weak` reference to
//! the tracker: a tracker that is dropped without an explicit teardown lets
//! the worker wind down on its own.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tracker::Tracker;

/// Handle to a running aging worker.
pub(crate) struct AgingWorker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AgingWorker {
    /// Cancels the worker and waits for it to finish its current pass.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            warn!(error = %err, "aging worker did not shut down cleanly");
        }
    }
}

/// Arms the aging worker on the given runtime.
pub(crate) fn spawn(tracker: &Arc<Tracker>, handle: &Handle) -> AgingWorker {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    // the task must not keep the tracker alive on its own
    let tracker = Arc::downgrade(tracker);
    let handle = handle.spawn(async move { run(tracker, token).await });
    AgingWorker { cancel, handle }
}

async fn run(tracker: Weak<Tracker>, cancel: CancellationToken) {
    loop {
        let interval = match tracker.upgrade() {
            Some(tracker) => tracker.tunables().update_interval_secs().max(1),
            None => break,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
        }

        let Some(tracker) = tracker.upgrade() else {
            break;
        };
        // the pass takes std locks; keep it off the async worker threads
        if let Err(err) = tokio::task::spawn_blocking(move || tracker.aging_tick()).await {
            warn!(error = %err, "aging pass failed; worker keeps running");
        }
    }
    debug!("aging worker stopped");
}
