//! Waiting for a fleet to finish scaling

use super::{Deadline, PollSettings};
use crate::clock::Clock;
use crate::constants::SCALE_PROGRESS_LOG_INTERVAL;
use crate::control_plane::ResourceClient;
use crate::errors::{LoadError, Result};

use std::sync::Arc;
use tracing::{debug, info};

/// Blocks until a fleet reports the target number of ready replicas
#[derive(Debug, Clone)]
pub struct ScaleWaitPoller {
    client: Arc<dyn ResourceClient>,
    clock: Arc<dyn Clock>,
    settings: PollSettings,
}

impl ScaleWaitPoller {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        clock: Arc<dyn Clock>,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            clock,
            settings,
        }
    }

    /// Poll `handle` until `status.readyReplicas == target`.
    ///
    /// Snapshots without a status, or whose status has no ready count yet,
    /// leave the last known count untouched. Fails with
    /// [`LoadError::Timeout`] if a deadline is configured and passes first.
    pub async fn wait_for_ready(&self, handle: &str, target: u64) -> Result<()> {
        let deadline = Deadline::new(self.clock.now(), self.settings.deadline);
        let mut last_ready: Option<u64> = None;
        let mut polls = 0u64;

        loop {
            if deadline.expired(self.clock.as_ref()) {
                return Err(LoadError::timeout(
                    format!(
                        "fleet to reach {} ready replicas (last seen {})",
                        target,
                        last_ready.map_or_else(|| "none".to_string(), |r| r.to_string())
                    ),
                    deadline.elapsed(self.clock.as_ref()),
                ));
            }

            if polls > 0 {
                self.settings.pace().await;
            }
            let snapshot = self.client.get(handle).await?;
            polls += 1;

            if let Some(ready) = snapshot.ready_replicas() {
                last_ready = Some(ready);
            }

            if last_ready == Some(target) {
                info!("Fleet is scaled to: {}", target);
                return Ok(());
            }

            if polls % SCALE_PROGRESS_LOG_INTERVAL == 0 {
                debug!(
                    "Waiting for fleet: {:?}/{} ready after {} polls",
                    last_ready, target, polls
                );
            }
        }
    }
}
