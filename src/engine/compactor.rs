//! Background reclamation of tombstoned records.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, error};

use super::shard::Shard;
use crate::error::Result;

/// A single worker thread that compacts every shard in fixed order once per
/// interval. Compaction takes each shard's write lock one at a time, so the
/// worker never holds more than one shard exclusively.
///
/// The stop signal is a bounded(1) channel: `recv_timeout` doubles as the
/// sleep between passes and as the wakeup on shutdown, and dropping the
/// sender also stops the worker.
pub(crate) struct Compactor {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Compactor {
    pub(crate) fn start(shards: Arc<Vec<Shard>>, interval: Duration) -> Result<Compactor> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let worker = thread::Builder::new()
            .name("bindb-compactor".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    _ => {
                        debug!("compactor stopping");
                        break;
                    }
                }
                for shard in shards.iter() {
                    // a failing shard must not abort the pass
                    if let Err(e) = shard.compact() {
                        error!("compaction failed on shard {}: {}", shard.id(), e);
                    }
                }
            })?;
        Ok(Compactor {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Signals the worker and joins it. Idempotent.
    pub(crate) fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for Compactor {
    fn drop(&mut self) {
        self.stop();
    }
}
