//! One measured allocation attempt

use super::{PollSettings, TerminalOutcome, TerminalPoller};
use crate::clock::Clock;
use crate::config::Config;
use crate::constants::READY_REPLICAS_LABEL;
use crate::control_plane::{ResourceClient, manifests};
use crate::errors::{LoadError, Result};
use crate::events::{EventBus, MeasuredEvent};

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Samples fleet readiness, requests an allocation and polls it to a
/// terminal state, publishing both measurements on the bus
#[derive(Debug, Clone)]
pub struct Allocator {
    client: Arc<dyn ResourceClient>,
    clock: Arc<dyn Clock>,
    poller: TerminalPoller,
    fleet_path: String,
    allocations_path: String,
    allocation_body: Value,
}

impl Allocator {
    pub fn new(config: &Config, client: Arc<dyn ResourceClient>, clock: Arc<dyn Clock>) -> Self {
        let settings = PollSettings::new(
            config.polling.allocation_deadline,
            config.polling.poll_interval,
        );

        Self {
            poller: TerminalPoller::new(Arc::clone(&client), Arc::clone(&clock), settings),
            client,
            clock,
            fleet_path: config.fleet_path(),
            allocations_path: config.allocations_path(),
            allocation_body: manifests::allocation(config),
        }
    }

    /// Run one attempt.
    ///
    /// Publishes a `ReadyReplicas` gauge right after the POST returns, then
    /// the outcome label with the elapsed milliseconds once polling stops.
    pub async fn allocate_once(&self, bus: &EventBus) -> Result<TerminalOutcome> {
        let fleet = self.client.get(&self.fleet_path).await?;
        let ready_replicas = fleet
            .ready_replicas()
            .ok_or(LoadError::MissingField("status.readyReplicas"))?;

        let posted_at = self.clock.now();
        let response = self
            .client
            .post(&self.allocations_path, &self.allocation_body)
            .await?;

        bus.publish(&MeasuredEvent::new(
            READY_REPLICAS_LABEL,
            ready_replicas,
            0,
            self.clock.unix_timestamp(),
        ))
        .await;

        let measurement = self.poller.poll_until_terminal(response, posted_at).await?;
        debug!(
            "Allocation {} in {}ms with {} ready replicas",
            measurement.outcome, measurement.duration_ms, ready_replicas
        );

        bus.publish(&MeasuredEvent::new(
            measurement.outcome.label(),
            measurement.duration_ms,
            0,
            self.clock.unix_timestamp(),
        ))
        .await;

        Ok(measurement.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSink;
    use crate::testing::{ManualClock, Reply, ScriptedClient, allocation_in, fleet_with, pending};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Mutex<Vec<MeasuredEvent>>);

    #[async_trait]
    impl EventSink for Collect {
        fn name(&self) -> &str {
            "collect"
        }

        async fn on_event(&self, event: &MeasuredEvent) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct Fixture {
        config: Config,
        clock: Arc<ManualClock>,
        events: Arc<Collect>,
        bus: EventBus,
    }

    impl Fixture {
        async fn new() -> Self {
            let events = Arc::new(Collect::default());
            let bus = EventBus::new();
            bus.subscribe(events.clone()).await;
            Self {
                config: Config::with_defaults("http://localhost:8001".to_string()),
                clock: Arc::new(ManualClock::new(1_700_000_000)),
                events,
                bus,
            }
        }

        fn allocation_link(&self) -> String {
            format!("{}/gs-allocation-abc", self.config.allocations_path())
        }

        fn allocator(&self, client: ScriptedClient) -> Allocator {
            Allocator::new(&self.config, Arc::new(client), self.clock.clone())
        }

        fn recorded(&self) -> Vec<MeasuredEvent> {
            self.events.0.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_publishes_gauge_then_outcome() {
        let fx = Fixture::new().await;
        let link = fx.allocation_link();
        let client = ScriptedClient::new()
            .with_clock(fx.clock.clone(), Duration::from_millis(20))
            .script("GET", &fx.config.fleet_path(), vec![fleet_with("/f", 42)])
            .script("POST", &fx.config.allocations_path(), vec![pending(&link)])
            .script("GET", &link, vec![pending(&link), allocation_in(&link, "Allocated")]);

        let outcome = fx.allocator(client).allocate_once(&fx.bus).await.unwrap();

        assert_eq!(outcome, TerminalOutcome::Allocated);
        let events = fx.recorded();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].label, "ReadyReplicas");
        assert_eq!(events[0].duration_ms, 42);
        assert_eq!(events[1].label, "GameServerAllocated");
        // POST plus two polls, 20ms each, all after the POST was issued
        assert_eq!(events[1].duration_ms, 60);
        assert_eq!(events[1].size, 0);
    }

    #[tokio::test]
    async fn test_unallocated_outcome_is_published() {
        let fx = Fixture::new().await;
        let link = fx.allocation_link();
        let client = ScriptedClient::new()
            .script("GET", &fx.config.fleet_path(), vec![fleet_with("/f", 0)])
            .script(
                "POST",
                &fx.config.allocations_path(),
                vec![allocation_in(&link, "UnAllocated")],
            );

        let outcome = fx.allocator(client).allocate_once(&fx.bus).await.unwrap();

        assert_eq!(outcome, TerminalOutcome::UnAllocated);
        assert_eq!(fx.recorded()[1].label, "GameServerUnAllocated");
    }

    #[tokio::test]
    async fn test_rejected_post_publishes_nothing() {
        let fx = Fixture::new().await;
        let client = ScriptedClient::new()
            .script("GET", &fx.config.fleet_path(), vec![fleet_with("/f", 3)])
            .script("POST", &fx.config.allocations_path(), vec![Reply::Status(400)]);

        let err = fx.allocator(client).allocate_once(&fx.bus).await.unwrap_err();

        assert!(matches!(err, LoadError::Api { status: 400, .. }));
        assert!(fx.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_fleet_without_ready_count_fails_attempt() {
        let fx = Fixture::new().await;
        let client = ScriptedClient::new().script(
            "GET",
            &fx.config.fleet_path(),
            vec![pending(&fx.config.fleet_path())],
        );

        let err = fx.allocator(client).allocate_once(&fx.bus).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingField("status.readyReplicas")));
    }

    #[tokio::test]
    async fn test_timed_out_attempt_is_published() {
        let mut fx = Fixture::new().await;
        fx.config.polling.allocation_deadline = Some(Duration::from_millis(100));
        let link = fx.allocation_link();
        let client = ScriptedClient::new()
            .with_clock(fx.clock.clone(), Duration::from_millis(40))
            .script("GET", &fx.config.fleet_path(), vec![fleet_with("/f", 1)])
            .script("POST", &fx.config.allocations_path(), vec![pending(&link)])
            .script("GET", &link, vec![pending(&link)]);

        let outcome = fx.allocator(client).allocate_once(&fx.bus).await.unwrap();

        assert_eq!(outcome, TerminalOutcome::TimedOut);
        let events = fx.recorded();
        assert_eq!(events[1].label, "GameServerAllocationTimedOut");
        assert_eq!(events[1].duration_ms, 120);
    }
}
