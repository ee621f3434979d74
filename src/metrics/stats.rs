//! In-process aggregation of measured events and iteration counts

use crate::errors::Result;
use crate::events::{EventSink, MeasuredEvent};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Running statistics for one event label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelStats {
    pub label: String,
    pub count: u64,
    pub total: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl LabelStats {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, value: u64) {
        self.count += 1;
        self.total = self.total.saturating_add(value);

        self.min = Some(match self.min {
            Some(min) => min.min(value),
            None => value,
        });

        self.max = Some(match self.max {
            Some(max) => max.max(value),
            None => value,
        });
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f64 / self.count as f64
        }
    }
}

/// Thread-safe aggregate shared by every virtual user
#[derive(Debug, Default)]
pub struct StatsSink {
    pub iterations_completed: AtomicU64,
    pub iterations_failed: AtomicU64,
    pub users_failed: AtomicU64,
    labels: RwLock<HashMap<String, LabelStats>>,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation attempt that produced a terminal outcome
    pub fn record_iteration_success(&self) {
        self.iterations_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an allocation attempt that errored out
    pub fn record_iteration_failure(&self) {
        self.iterations_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a virtual user that could not start or aborted
    pub fn record_user_failure(&self) {
        self.users_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub async fn label(&self, label: &str) -> Option<LabelStats> {
        self.labels.read().await.get(label).cloned()
    }

    /// All labels, sorted by name
    pub async fn labels(&self) -> Vec<LabelStats> {
        let mut labels: Vec<_> = self.labels.read().await.values().cloned().collect();
        labels.sort_by(|a, b| a.label.cmp(&b.label));
        labels
    }

    /// Percentage of attempts that reached a terminal outcome (0.0 to 100.0)
    pub fn iteration_success_rate(&self) -> f64 {
        let completed = self.iterations_completed.load(Ordering::Relaxed);
        let failed = self.iterations_failed.load(Ordering::Relaxed);
        let total = completed + failed;

        if total == 0 {
            return 100.0;
        }

        (completed as f64 / total as f64) * 100.0
    }
}

#[async_trait]
impl EventSink for StatsSink {
    fn name(&self) -> &str {
        "stats"
    }

    async fn on_event(&self, event: &MeasuredEvent) -> Result<()> {
        let mut labels = self.labels.write().await;
        labels
            .entry(event.label.clone())
            .or_insert_with(|| LabelStats::new(event.label.clone()))
            .record(event.duration_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_stats_track_min_max_mean() {
        let mut stats = LabelStats::new("GameServerAllocated");
        for value in [120, 40, 200] {
            stats.record(value);
        }
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(40));
        assert_eq!(stats.max, Some(200));
        assert!((stats.mean() - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_label_mean_is_zero() {
        assert_eq!(LabelStats::new("x").mean(), 0.0);
    }

    #[tokio::test]
    async fn test_events_are_grouped_by_label() {
        let sink = StatsSink::new();
        sink.on_event(&MeasuredEvent::new("GameServerAllocated", 10, 0, 0))
            .await
            .unwrap();
        sink.on_event(&MeasuredEvent::new("GameServerAllocated", 30, 0, 0))
            .await
            .unwrap();
        sink.on_event(&MeasuredEvent::new("ReadyReplicas", 100, 0, 0))
            .await
            .unwrap();

        let allocated = sink.label("GameServerAllocated").await.unwrap();
        assert_eq!(allocated.count, 2);
        assert_eq!(allocated.total, 40);

        let labels: Vec<_> = sink.labels().await.into_iter().map(|l| l.label).collect();
        assert_eq!(labels, vec!["GameServerAllocated", "ReadyReplicas"]);
    }

    #[test]
    fn test_iteration_success_rate() {
        let sink = StatsSink::new();
        assert_eq!(sink.iteration_success_rate(), 100.0);

        sink.record_iteration_success();
        sink.record_iteration_success();
        sink.record_iteration_success();
        sink.record_iteration_failure();
        assert!((sink.iteration_success_rate() - 75.0).abs() < f64::EPSILON);
    }
}
