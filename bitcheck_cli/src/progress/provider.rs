//! Progress provider implementation for CLI
//!
//! Bridges the core library's progress reporting with the CLI's rendering
//! task.

use bitcheck_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Channel-based progress provider for CLI rendering
///
/// Updates go through a channel to a separate rendering task, so a slow
/// terminal never holds up the run. The channel is unbounded: at most a few
/// events per asset are queued and none may be lost, since the renderer
/// counts finished assets and needs the final run state.
pub struct ChannelProvider {
    tx: Mutex<Option<mpsc::UnboundedSender<ProgressUpdate>>>,
}

impl ChannelProvider {
    pub fn new(tx: mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }
}

impl ProgressProvider for ChannelProvider {
    fn report(&self, update: ProgressUpdate) {
        let tx = self.tx.lock().ok().and_then(|guard| guard.clone());
        if let Some(tx) = tx {
            // Fails only once the renderer has gone away
            let _ = tx.send(update);
        }
    }

    fn complete(&self) {
        // Drop our sender so the renderer can exit its loop
        if let Ok(mut guard) = self.tx.lock() {
            *guard = None;
        }
    }
}

/// Create a progress provider and the receiver its renderer reads from
pub fn create_progress_infrastructure()
-> (Arc<dyn ProgressProvider>, mpsc::UnboundedReceiver<ProgressUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let provider = Arc::new(ChannelProvider::new(tx)) as Arc<dyn ProgressProvider>;
    (provider, rx)
}
