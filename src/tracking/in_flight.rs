//! Registry of background IP lookups that have not settled yet
//!
//! Every lookup is registered before it is spawned and deregisters itself
//! when its guard drops, whether it finished, panicked or was cancelled.
//! The registry is bounded by a semaphore.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify, OwnedSemaphorePermit, Semaphore};

pub struct InFlightLookups {
    limit: Arc<Semaphore>,
    /// link id -> visit id -> cancel handle (dropping the sender cancels)
    pending: DashMap<String, HashMap<String, oneshot::Sender<()>>>,
    settled: Notify,
}

/// Handed to the spawned lookup task
pub struct PendingLookup {
    pub guard: PendingGuard,
    /// Resolves when the lookup has been cancelled
    pub cancelled: oneshot::Receiver<()>,
}

pub struct PendingGuard {
    registry: Arc<InFlightLookups>,
    link_id: String,
    visit_id: String,
    _permit: OwnedSemaphorePermit,
}

impl InFlightLookups {
    pub fn new(max_in_flight: usize) -> Arc<Self> {
        Arc::new(Self {
            limit: Arc::new(Semaphore::new(max_in_flight)),
            pending: DashMap::new(),
            settled: Notify::new(),
        })
    }

    /// Reserve a slot for a lookup, or None when the registry is full
    pub fn try_register(self: &Arc<Self>, link_id: &str, visit_id: &str) -> Option<PendingLookup> {
        let permit = Arc::clone(&self.limit).try_acquire_owned().ok()?;
        let (cancel_tx, cancelled) = oneshot::channel();

        self.pending
            .entry(link_id.to_string())
            .or_default()
            .insert(visit_id.to_string(), cancel_tx);

        Some(PendingLookup {
            guard: PendingGuard {
                registry: Arc::clone(self),
                link_id: link_id.to_string(),
                visit_id: visit_id.to_string(),
                _permit: permit,
            },
            cancelled,
        })
    }

    /// Cancel every pending lookup for a link, returning how many were pending
    pub fn cancel_link(&self, link_id: &str) -> usize {
        let cancelled = self
            .pending
            .remove(link_id)
            .map(|(_, visits)| visits.len())
            .unwrap_or(0);

        if cancelled > 0 {
            self.settled.notify_waiters();
        }

        cancelled
    }

    pub fn pending_for(&self, link_id: &str) -> usize {
        self.pending
            .get(link_id)
            .map(|visits| visits.len())
            .unwrap_or(0)
    }

    pub fn pending(&self) -> usize {
        self.pending.iter().map(|visits| visits.len()).sum()
    }

    /// Wait until no lookup is pending; false if `timeout` elapsed first
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.settled.notified();
                if self.pending.is_empty() {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!(
                link_id = %self.link_id,
                visit_id = %self.visit_id,
                "IP lookup task panicked"
            );
        }
        if let Some(mut visits) = self.registry.pending.get_mut(&self.link_id) {
            visits.remove(&self.visit_id);
        }
        self.registry
            .pending
            .remove_if(&self.link_id, |_, visits| visits.is_empty());
        self.registry.settled.notify_waiters();
    }
}
