//! Load test orchestration: fleet setup, concurrent users, final report

use crate::clock::{Clock, SystemClock};
use crate::common::{UserCore, UserId};
use crate::config::Config;
use crate::constants::*;
use crate::control_plane::{HttpResourceClient, ResourceClient, manifests};
use crate::errors::{LoadError, Result};
use crate::metrics::StatsSink;
use crate::polling::{Allocator, PollSettings, ScaleWaitPoller};
use crate::user::AllocationUser;

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Spawns and coordinates the virtual users of one run
pub struct LoadTest {
    config: Config,
    client: Arc<dyn ResourceClient>,
    clock: Arc<dyn Clock>,
    allocator: Allocator,
    stats: Arc<StatsSink>,
    test_start_time: Option<Instant>,
    test_end_time: Option<Instant>,
}

impl LoadTest {
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(HttpResourceClient::new(&config)?);
        Ok(Self::with_client(config, client, Arc::new(SystemClock)))
    }

    /// Build against an arbitrary control plane and clock
    pub fn with_client(
        config: Config,
        client: Arc<dyn ResourceClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let allocator = Allocator::new(&config, Arc::clone(&client), Arc::clone(&clock));

        Self {
            config,
            client,
            clock,
            allocator,
            stats: Arc::new(StatsSink::new()),
            test_start_time: None,
            test_end_time: None,
        }
    }

    #[cfg(test)]
    pub fn stats(&self) -> &Arc<StatsSink> {
        &self.stats
    }

    /// Prepare the fleet, run every user to completion and report
    pub async fn run(&mut self) -> Result<()> {
        if self.config.fleet.setup {
            self.setup_fleet().await?;
        } else {
            info!(
                "Skipping fleet setup, using existing fleet {}",
                self.config.fleet.name
            );
        }

        info!("Starting load test with {} users", self.config.users.count);

        self.test_start_time = Some(Instant::now());
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        self.setup_signal_handler(shutdown_tx.clone());
        let mut user_handles = self.spawn_all_users(shutdown_tx.clone()).await;
        let waited = self
            .wait_for_users_completion(&mut user_handles, shutdown_tx)
            .await;

        self.test_end_time = Some(Instant::now());
        self.print_final_report().await;

        if self.config.fleet.delete_on_exit {
            self.delete_fleet().await?;
        }

        waited
    }

    /// Create the fleet and block until all of its replicas are ready
    async fn setup_fleet(&self) -> Result<()> {
        info!(
            "Creating fleet {} with {} replicas",
            self.config.fleet.name, self.config.fleet.size
        );

        let manifest = manifests::fleet(&self.config);
        let handle = match self.client.post(&self.config.fleets_path(), &manifest).await {
            // Newer control planes no longer populate selfLink
            Ok(created) => created
                .self_link()
                .map(str::to_string)
                .unwrap_or_else(|_| self.config.fleet_path()),
            Err(LoadError::Api { status: 409, .. }) => {
                warn!(
                    "Fleet {} already exists, waiting for it to scale",
                    self.config.fleet.name
                );
                self.config.fleet_path()
            }
            Err(e) => return Err(e),
        };

        let poller = ScaleWaitPoller::new(
            Arc::clone(&self.client),
            Arc::clone(&self.clock),
            PollSettings::new(
                self.config.polling.scale_deadline,
                self.config.polling.poll_interval,
            ),
        );
        poller
            .wait_for_ready(&handle, u64::from(self.config.fleet.size))
            .await?;

        info!("Fleet {} is ready", self.config.fleet.name);
        Ok(())
    }

    async fn delete_fleet(&self) -> Result<()> {
        self.client.delete(&self.config.fleet_path()).await?;
        info!("Deleted fleet {}", self.config.fleet.name);
        Ok(())
    }

    /// Set up signal handler for graceful shutdown
    fn setup_signal_handler(&self, shutdown_tx: broadcast::Sender<()>) {
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl+c: {}", e);
                return;
            }
            warn!("Received Ctrl+C, initiating graceful shutdown...");
            let _ = shutdown_tx.send(());
        });
    }

    /// Spawn all users and return their handles
    async fn spawn_all_users(&self, shutdown_tx: broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let mut user_handles = Vec::new();

        for user_id_raw in 0..self.config.users.count {
            let user_id = UserId::from(user_id_raw);
            let core = UserCore::new(
                user_id,
                self.config.clone(),
                Arc::clone(&self.stats),
                shutdown_tx.subscribe(),
            );
            let allocator = self.allocator.clone();
            let stats = Arc::clone(&self.stats);

            let handle = tokio::spawn(async move {
                let mut user = match AllocationUser::connect(core, allocator).await {
                    Ok(user) => user,
                    Err(e) => {
                        error!("User {} failed to start: {}", user_id, e);
                        stats.record_user_failure();
                        return;
                    }
                };

                if let Err(e) = user.run().await {
                    error!("User {} failed: {}", user.user_id(), e);
                    stats.record_user_failure();
                }
            });

            user_handles.push(handle);

            // Small delay between user starts to avoid thundering herd
            tokio::time::sleep(Duration::from_millis(USER_START_DELAY_MS)).await;
        }

        user_handles
    }

    /// Wait for all users to complete with progress indication.
    ///
    /// Only duration-bounded runs carry a global timeout. An iteration
    /// budget is waited out in full; each attempt is bounded by the
    /// allocation deadline instead. Cutting users short is an error.
    async fn wait_for_users_completion(
        &self,
        user_handles: &mut [JoinHandle<()>],
        shutdown_tx: broadcast::Sender<()>,
    ) -> Result<()> {
        info!("Waiting for all users to complete...");

        let global_timeout = self
            .config
            .test_duration()
            .map(|duration| duration + Duration::from_secs(EXTRA_CLEANUP_TIME_SECONDS));

        let completed = if self.config.output.verbose {
            Self::join_within(user_handles, global_timeout).await
        } else {
            Self::wait_with_progress_dots(user_handles, global_timeout).await
        };

        if completed {
            info!("All users completed");
            return Ok(());
        }

        warn!("Some users did not complete within timeout");
        Self::stop_remaining_users(user_handles, shutdown_tx).await;
        Err(LoadError::timeout(
            "virtual users to finish",
            global_timeout.unwrap_or_default(),
        ))
    }

    /// Join every user, giving up after `limit` if one is set
    async fn join_within(user_handles: &mut [JoinHandle<()>], limit: Option<Duration>) -> bool {
        let users_future = futures_util::future::join_all(user_handles.iter_mut());
        match limit {
            Some(limit) => timeout(limit, users_future).await.is_ok(),
            None => {
                users_future.await;
                true
            }
        }
    }

    /// Wait for users with progress dots in non-verbose mode
    async fn wait_with_progress_dots(
        user_handles: &mut [JoinHandle<()>],
        global_timeout: Option<Duration>,
    ) -> bool {
        print!("Progress: ");
        let _ = std::io::stdout().flush();

        let mut dot_interval =
            tokio::time::interval(Duration::from_millis(PROGRESS_DOT_INTERVAL_MS));

        tokio::select! {
            completed = Self::join_within(user_handles, global_timeout) => {
                println!();
                completed
            }
            _ = async {
                loop {
                    dot_interval.tick().await;
                    print!(".");
                    let _ = std::io::stdout().flush();
                }
            } => false
        }
    }

    /// Signal shutdown and give users a bounded window to tear down their
    /// connections before aborting them
    async fn stop_remaining_users(
        user_handles: &mut [JoinHandle<()>],
        shutdown_tx: broadcast::Sender<()>,
    ) {
        let _ = shutdown_tx.send(());

        // Handles already polled to completion must not be polled again
        let running: Vec<_> = user_handles
            .iter_mut()
            .filter(|handle| !handle.is_finished())
            .collect();
        let cleanup = Duration::from_secs(EXTRA_CLEANUP_TIME_SECONDS);
        if timeout(cleanup, futures_util::future::join_all(running))
            .await
            .is_err()
        {
            warn!("Users still running after shutdown, aborting them");
            for handle in user_handles.iter() {
                handle.abort();
            }
        }
    }

    /// Print the final test report
    async fn print_final_report(&self) {
        let test_duration = match (self.test_start_time, self.test_end_time) {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        };

        let config_summary = format!(
            "   Control Plane:    {}\n   Fleet:            {}/{} ({} replicas)\n   Users:            {}\n",
            self.config.target.url,
            self.config.fleet.namespace,
            self.config.fleet.name,
            self.config.fleet.size,
            self.config.users.count
        ) + &match (
            self.config.test.duration.map(|d| d.as_secs()),
            self.config.test.total_iterations,
        ) {
            (Some(duration), None) => format!("   Duration:         {}s\n", duration),
            (None, Some(total)) => {
                let per_user = self.config.per_user_iterations().unwrap_or_default();
                format!(
                    "   Iterations:       {}\n   Per User:         {} allocations\n",
                    total, per_user
                )
            }
            _ => String::new(),
        } + &format!(
            "   Think Time:       {}ms - {}ms\n",
            self.config.users.min_wait.as_millis(),
            self.config.users.max_wait.as_millis()
        );

        self.stats.print_report(&config_summary, test_duration).await;
    }
}
