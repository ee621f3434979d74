//! Measured events and the bus that fans them out to sinks
//!
//! A bus is an ordinary constructed object. Components that publish hold an
//! `Arc<EventBus>`; sinks are registered on it explicitly, so each test (or
//! each virtual user) can work against its own bus.

use crate::errors::Result;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::warn;

/// One completed measurement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredEvent {
    pub label: String,
    /// Elapsed milliseconds, or a gauge value for non-latency labels
    pub duration_ms: u64,
    pub size: u64,
    /// Seconds since the Unix epoch at which the measurement completed
    pub observed_at: i64,
}

impl MeasuredEvent {
    pub fn new(label: impl Into<String>, duration_ms: u64, size: u64, observed_at: i64) -> Self {
        Self {
            label: label.into(),
            duration_ms,
            size,
            observed_at,
        }
    }
}

/// Receiver of measured events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn on_event(&self, event: &MeasuredEvent) -> Result<()>;
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered fan-out of measured events to registered sinks
#[derive(Default)]
pub struct EventBus {
    sinks: RwLock<Vec<(SubscriptionId, Arc<dyn EventSink>)>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; it receives every event published after this call
    pub async fn subscribe(&self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sinks.write().await.push((id, sink));
        id
    }

    /// Remove a sink. Returns false if it was not registered.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut sinks = self.sinks.write().await;
        let before = sinks.len();
        sinks.retain(|(sink_id, _)| *sink_id != id);
        sinks.len() != before
    }

    #[cfg(test)]
    pub async fn sink_count(&self) -> usize {
        self.sinks.read().await.len()
    }

    /// Deliver `event` to every sink in subscription order.
    ///
    /// Each sink is awaited before the next one runs. A sink that fails is
    /// logged and skipped; the remaining sinks still receive the event.
    /// Returns how many sinks accepted it.
    pub async fn publish(&self, event: &MeasuredEvent) -> usize {
        // Snapshot so no lock is held while sinks do I/O
        let sinks: Vec<Arc<dyn EventSink>> = self
            .sinks
            .read()
            .await
            .iter()
            .map(|(_, sink)| Arc::clone(sink))
            .collect();

        let mut delivered = 0;
        for sink in sinks {
            match sink.on_event(event).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Sink '{}' dropped event '{}': {}",
                    sink.name(),
                    event.label,
                    e
                ),
            }
        }
        delivered
    }
}
