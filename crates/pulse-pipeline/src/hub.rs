//! Broadcast hub: fan-out of envelopes to live subscribers.
//!
//! Each subscriber owns a bounded queue. Publishing never waits: a subscriber
//! whose queue is full or whose receiver is gone is removed from the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pulse_core::Envelope;
use tokio::sync::mpsc;

type Registry = HashMap<u64, mpsc::Sender<Arc<Envelope>>>;

#[derive(Debug, Default)]
struct HubInner {
    next_id: AtomicU64,
    subscribers: Mutex<Registry>,
}

impl HubInner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Senders hold no invariants a panic could break.
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheaply cloneable handle to the subscriber registry.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
    buffer: usize,
}

impl BroadcastHub {
    /// Create a hub whose subscribers each queue up to `buffer` envelopes.
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        Self {
            inner: Arc::new(HubInner::default()),
            buffer: buffer.max(1),
        }
    }

    /// Register a subscriber. Dropping the returned [`Subscription`] unregisters it.
    #[must_use]
    pub fn register(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.inner.registry().insert(id, tx);
        tracing::debug!(subscriber = id, "subscriber registered");
        Subscription {
            id,
            rx,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Enqueue `envelope` for every subscriber and return how many accepted it.
    ///
    /// Subscribers that cannot accept it immediately are dropped.
    pub fn publish(&self, envelope: Envelope) -> usize {
        let envelope = Arc::new(envelope);
        let mut registry = self.inner.registry();
        let mut delivered = 0usize;

        registry.retain(|id, tx| match tx.try_send(Arc::clone(&envelope)) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(
                    subscriber = *id,
                    kind = envelope.kind(),
                    "subscriber queue full; dropping subscriber"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(subscriber = *id, "subscriber disconnected; dropping subscriber");
                false
            }
        });

        delivered
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry().len()
    }
}

/// A registered subscriber's receiving end.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Arc<Envelope>>,
    hub: Arc<HubInner>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next envelope in publish order, or `None` once the hub dropped this subscriber.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.registry().remove(&self.id).is_some() {
            tracing::debug!(subscriber = self.id, "subscriber unregistered");
        }
    }
}
