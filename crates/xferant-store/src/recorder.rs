//! Async usage recording with batching support.
//!
//! Usage reports are aggregated per user in memory and flushed through
//! [`Store::record_usage`], so quota transitions behave exactly as with
//! direct reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use xferant_config::UsageBatchConfig;

use crate::store::Store;

/// Usage update message.
struct UsageUpdate {
    user_id: String,
    bytes: i64,
}

/// Usage recorder that batches updates.
pub struct UsageRecorder {
    sender: mpsc::UnboundedSender<UsageUpdate>,
    pending: Arc<Mutex<HashMap<String, i64>>>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl UsageRecorder {
    /// Start the background flush task.
    pub fn spawn(store: Store, config: &UsageBatchConfig) -> Self {
        Self::with_interval(
            store,
            Duration::from_secs(config.flush_interval_secs),
            config.max_pending,
        )
    }

    pub fn with_interval(store: Store, flush_interval: Duration, max_pending: usize) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<UsageUpdate>();
        let pending: Arc<Mutex<HashMap<String, i64>>> = Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();
        let cancel = CancellationToken::new();
        let stop = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval);

            loop {
                tokio::select! {
                    update = rx.recv() => {
                        let Some(update) = update else {
                            break;
                        };
                        let batch_to_flush = {
                            let mut map = pending_clone.lock();
                            *map.entry(update.user_id).or_insert(0) += update.bytes;
                            if map.len() >= max_pending {
                                Some(std::mem::take(&mut *map))
                            } else {
                                None
                            }
                        };
                        if let Some(batch) = batch_to_flush {
                            flush(&store, batch).await;
                        }
                    }
                    _ = ticker.tick() => {
                        let batch_to_flush = {
                            let mut map = pending_clone.lock();
                            if map.is_empty() {
                                None
                            } else {
                                Some(std::mem::take(&mut *map))
                            }
                        };
                        if let Some(batch) = batch_to_flush {
                            flush(&store, batch).await;
                        }
                    }
                    _ = stop.cancelled() => break,
                }
            }

            // Drain what is still queued, then flush once more.
            rx.close();
            {
                let mut map = pending_clone.lock();
                while let Ok(update) = rx.try_recv() {
                    *map.entry(update.user_id).or_insert(0) += update.bytes;
                }
            }
            let batch = std::mem::take(&mut *pending_clone.lock());
            if !batch.is_empty() {
                flush(&store, batch).await;
            }
            debug!("usage recorder stopped");
        });

        Self {
            sender: tx,
            pending,
            cancel,
            task,
        }
    }

    /// Queue a usage report (non-blocking). Negative deltas are dropped.
    #[inline]
    pub fn record(&self, user_id: impl Into<String>, bytes: i64) {
        if bytes < 0 {
            warn!(bytes, "negative usage report dropped");
            return;
        }
        let _ = self.sender.send(UsageUpdate {
            user_id: user_id.into(),
            bytes,
        });
    }

    /// Users with unflushed usage.
    pub fn pending_users(&self) -> usize {
        self.pending.lock().len()
    }

    /// Flush everything still buffered and stop the task.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "usage recorder task failed");
        }
    }
}

async fn flush(store: &Store, batch: HashMap<String, i64>) {
    debug!(users = batch.len(), "flushing usage batch");
    for (user_id, bytes) in batch {
        if let Err(e) = store.record_usage(&user_id, bytes).await {
            warn!(user_id = %user_id, bytes, error = %e, "usage flush failed");
        }
    }
}
