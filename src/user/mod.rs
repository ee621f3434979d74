//! Virtual users
//!
//! - [`AllocationUser`] repeats measured allocation attempts with think time
//! - [`LoadTest`] sets up the fleet, runs users concurrently and reports

pub mod manager;

pub use manager::LoadTest;

use crate::common::{UserCore, UserId};
use crate::config::Config;
use crate::errors::Result;
use crate::events::{EventBus, SubscriptionId};
use crate::metrics::MetricsForwarder;
use crate::polling::{Allocator, TerminalOutcome};

use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Loop state for the allocation loop
#[derive(Debug)]
pub struct LoopState {
    pub iterations: u64,
    pub target_iterations: Option<u64>,
    pub start_time: Instant,
    pub test_duration: Option<Duration>,
}

impl LoopState {
    /// Create loop state for `user_id` from configuration
    pub fn new(config: &Config, user_id: UserId) -> Self {
        Self {
            iterations: 0,
            target_iterations: config.iterations_for_user(user_id),
            start_time: Instant::now(),
            test_duration: config.test_duration(),
        }
    }

    /// Check if termination conditions have been met
    pub fn check_termination_conditions(&self, user_id: UserId) -> bool {
        if let Some(target) = self.target_iterations
            && self.iterations >= target
        {
            info!("User {} reached iteration target: {}", user_id, target);
            return true;
        }

        if let Some(duration) = self.test_duration
            && self.start_time.elapsed() >= duration
        {
            info!("User {} reached time limit: {:?}", user_id, duration);
            return true;
        }

        false
    }
}

/// One simulated client running the allocate-and-poll workflow.
///
/// Each user owns its collector connection and its own bus, on which the
/// shared stats sink and the user's forwarder are registered.
pub struct AllocationUser {
    core: UserCore,
    allocator: Allocator,
    bus: EventBus,
    forwarder: Option<Arc<MetricsForwarder>>,
    forwarder_subscription: Option<SubscriptionId>,
}

impl AllocationUser {
    /// Open the user's collector connection and wire up its bus
    pub async fn connect(core: UserCore, allocator: Allocator) -> Result<Self> {
        let bus = EventBus::new();
        bus.subscribe(core.stats.clone()).await;

        let mut forwarder = None;
        let mut forwarder_subscription = None;
        if let Some(addr) = &core.config.metrics.collector {
            let connected = Arc::new(
                MetricsForwarder::connect(addr, core.config.metrics.namespace.clone()).await?,
            );
            forwarder_subscription = Some(bus.subscribe(connected.clone()).await);
            forwarder = Some(connected);
        }

        Ok(Self {
            core,
            allocator,
            bus,
            forwarder,
            forwarder_subscription,
        })
    }

    pub fn user_id(&self) -> UserId {
        self.core.user_id
    }

    /// Run until the iteration budget, the time limit or shutdown, then
    /// release the collector connection whatever the loop returned
    pub async fn run(&mut self) -> Result<()> {
        info!("User {} starting", self.core.user_id);

        let result = self.allocation_loop().await;
        self.teardown().await;

        match &result {
            Ok(()) => info!("User {} completed successfully", self.core.user_id),
            Err(e) => warn!("User {} stopped: {}", self.core.user_id, e),
        }
        result
    }

    async fn allocation_loop(&mut self) -> Result<()> {
        let mut loop_state = LoopState::new(&self.core.config, self.core.user_id);

        loop {
            if loop_state.check_termination_conditions(self.core.user_id) {
                break;
            }

            if self.core.shutdown_rx.try_recv().is_ok() {
                info!("User {} received shutdown signal", self.core.user_id);
                break;
            }

            let attempt = tokio::select! {
                result = self.allocator.allocate_once(&self.bus) => result,
                _ = self.core.shutdown_rx.recv() => {
                    info!("User {} interrupted while allocating", self.core.user_id);
                    break;
                }
            };
            loop_state.iterations += 1;

            match attempt {
                Ok(TerminalOutcome::TimedOut) => {
                    self.core.stats.record_iteration_failure();
                    warn!(
                        "User {} allocation attempt {} timed out",
                        self.core.user_id, loop_state.iterations
                    );
                }
                Ok(outcome) => {
                    self.core.stats.record_iteration_success();
                    debug!(
                        "User {} attempt {}: {}",
                        self.core.user_id, loop_state.iterations, outcome
                    );
                }
                Err(e) => {
                    self.core.stats.record_iteration_failure();
                    warn!(
                        "User {} allocation attempt failed: {}",
                        self.core.user_id, e
                    );
                }
            }

            if loop_state.check_termination_conditions(self.core.user_id) {
                break;
            }

            let think_time = self.think_time();
            tokio::select! {
                _ = sleep(think_time) => {}
                _ = self.core.shutdown_rx.recv() => {
                    info!("User {} received shutdown signal", self.core.user_id);
                    break;
                }
            }
        }

        info!(
            "User {} finished after {} attempts",
            self.core.user_id, loop_state.iterations
        );
        Ok(())
    }

    fn think_time(&self) -> Duration {
        let min = self.core.config.users.min_wait.as_millis() as u64;
        let max = self.core.config.users.max_wait.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    async fn teardown(&mut self) {
        if let Some(id) = self.forwarder_subscription.take() {
            self.bus.unsubscribe(id).await;
        }

        if let Some(forwarder) = self.forwarder.take()
            && let Err(e) = forwarder.close().await
        {
            warn!(
                "User {} could not close its metrics connection: {}",
                self.core.user_id, e
            );
        }
    }
}
